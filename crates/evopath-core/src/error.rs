//! Error types for evopath-core
//!
//! This module provides the search error taxonomy and user-facing formatting.

use thiserror::Error;

/// Message shown to end users when a search fails for good
pub const GENERIC_FAILURE_MESSAGE: &str = "I wasn't able to generate a response. Please try again.";

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// One candidate could not be executed; drops that candidate only
    #[error("candidate execution error: {0}")]
    CandidateExecution(String),

    /// A judged dimension could not be scored; drops that candidate only
    #[error("evaluation error ({dimension}): {message}")]
    Evaluation {
        /// Dimension name
        dimension: String,
        /// Detailed message
        message: String,
    },

    /// No candidate made it into the archive during a generation
    #[error("all candidates failed in generation {generation}")]
    ArchiveExhaustion {
        /// Generation number
        generation: u32,
    },

    /// The best candidate's answer is blank
    #[error("best candidate {candidate_id} has an empty final answer")]
    EmptyFinalAnswer {
        /// Candidate id
        candidate_id: String,
    },

    /// The search was cancelled
    #[error("search cancelled")]
    Cancelled,

    /// The end-to-end deadline expired
    #[error("search deadline of {0}s exceeded")]
    DeadlineExceeded(u64),

    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Scores were assigned to a candidate twice
    #[error("scores already assigned")]
    ScoresAlreadyAssigned,

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] evopath_llm::Error),

    /// Tool execution error
    #[error("tool error: {0}")]
    Tool(#[from] evopath_tools::Error),
}

impl Error {
    /// Whether this error aborts the whole search rather than one candidate
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::CandidateExecution(_) | Error::Evaluation { .. } | Error::Llm(_) | Error::Tool(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::InvalidConfig { field, message } => {
                format!("Configuration error in '{}': {}", field, message)
            }
            Error::Cancelled => "The request was cancelled.".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::InvalidConfig { field, .. } => Some(format!(
                "Check the 'search.{}' setting in config/default.toml or the EVOPATH_SEARCH__{} variable.",
                field,
                field.to_uppercase()
            )),
            Error::DeadlineExceeded(_) => Some(
                "Raise search.deadline_secs or lower the generation/candidate counts.".to_string(),
            ),
            Error::ArchiveExhaustion { .. } | Error::Llm(_) => {
                Some("Check that the model server is reachable and the model is pulled.".to_string())
            }
            Error::EmptyFinalAnswer { .. } => Some("Try rephrasing the question.".to_string()),
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}
