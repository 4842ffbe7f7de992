//! Search - seed, run and evolve candidate strategies until one is good enough

mod config;
mod driver;
mod seeds;

#[cfg(test)]
mod tests;

pub use config::SearchConfig;
pub use driver::{search, PathSearch, SearchOutcome, SearchRequest};
pub use seeds::{seed_candidates, SeedStrategy, SEED_STRATEGIES};
