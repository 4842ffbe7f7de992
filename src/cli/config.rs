//! `evopath config` - print configuration

use crate::app::{load_config, DEFAULT_CONFIG};
use anyhow::{Context, Result};

pub fn run(defaults: bool) -> Result<()> {
    if defaults {
        print!("{DEFAULT_CONFIG}");
        return Ok(());
    }

    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    print!("{rendered}");
    Ok(())
}
