//! Evopath Core - Pareto Path Search
//!
//! This crate answers a query by evolving a small population of strategy
//! texts, including:
//! - Engine: running one strategy through a bounded tool-calling loop
//! - Evaluator: six-dimension scoring with LLM judges and heuristics
//! - Archive: a bounded Pareto front with crowding-distance pruning
//! - Mutator: strategy mutation and crossover with deterministic fallbacks
//! - Search: the generation loop tying them together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod candidate;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod mutator;
pub mod scores;
pub mod search;

pub use archive::{AddOutcome, ParetoArchive, DEFAULT_ARCHIVE_CAPACITY};
pub use candidate::{merge_lessons, Candidate, ExecutionTrace, ToolCallRecord};
pub use engine::{EngineSettings, ExecutionContext, ExecutionEngine, FINAL_ANSWER_TOOL};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError, GENERIC_FAILURE_MESSAGE};
pub use evaluator::{Evaluation, Evaluator};
pub use mutator::Mutator;
pub use scores::{Dimension, ScoreWeights, Scores};
pub use search::{search, PathSearch, SearchConfig, SearchOutcome, SearchRequest};
