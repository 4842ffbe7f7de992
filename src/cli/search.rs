//! `evopath search` - run a Pareto path search for one query

use crate::app::{build_services, load_config};
use anyhow::Result;
use clap::Args;
use evopath_core::{format_error_for_cli, PathSearch, SearchConfig, SearchRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// The question to answer
    pub query: String,

    /// Maximum generations
    #[arg(long)]
    pub generations: Option<u32>,

    /// Candidates per generation
    #[arg(long)]
    pub candidates: Option<usize>,

    /// Weighted score that ends the search early
    #[arg(long)]
    pub target: Option<f64>,

    /// Disable crossover of the top two parents
    #[arg(long)]
    pub no_crossover: bool,

    /// Offer candidates a `final_answer` tool
    #[arg(long)]
    pub final_answer_tool: bool,
}

impl SearchArgs {
    fn apply(&self, mut config: SearchConfig) -> SearchConfig {
        if let Some(generations) = self.generations {
            config.generation_count = generations;
        }
        if let Some(candidates) = self.candidates {
            config.candidates_per_generation = candidates;
        }
        if let Some(target) = self.target {
            config.target_score = target;
        }
        if self.no_crossover {
            config.enable_crossover = false;
        }
        if self.final_answer_tool {
            config.final_answer_tool = true;
        }
        config
    }
}

pub async fn run(args: SearchArgs) -> Result<()> {
    let app = load_config()?;
    let config = args.apply(app.search.clone());
    let services = build_services(&app)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling search");
            on_signal.cancel();
        }
    });

    let request = SearchRequest::new(&args.query).with_tools(services.runner.registry().to_llm_tools());
    let search = PathSearch::new(services.llm)
        .with_tool_executor(services.runner)
        .with_cancellation(cancel);

    match search.search(request, &config).await {
        Ok(outcome) => {
            info!(
                candidate = %outcome.candidate_id,
                weighted_score = outcome.weighted_score,
                generations = outcome.generations_run,
                archive_size = outcome.archive_size,
                "Search finished"
            );
            println!("{}", outcome.answer);
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Search failed");
            eprint!("{}", format_error_for_cli(&e));
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = SearchArgs {
            query: "q".into(),
            generations: Some(1),
            candidates: None,
            target: Some(3.0),
            no_crossover: true,
            final_answer_tool: true,
        };

        let config = args.apply(SearchConfig::default());
        assert_eq!(config.generation_count, 1);
        assert_eq!(config.candidates_per_generation, 3);
        assert_eq!(config.target_score, 3.0);
        assert!(!config.enable_crossover);
        assert!(config.final_answer_tool);
    }
}
