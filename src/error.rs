//! Error types and handling for the itinerary planner
//!
//! Three layers of errors live here:
//! - [`SourceError`]: a single adapter call failed (recorded per city, never fatal)
//! - [`OrchestrationError`]: the whole planning run failed
//! - [`PlannerError`]: application-level errors (config, input files, I/O)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::sources::Source;

/// Failure category of a single adapter call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// No matching place, location or forecast
    NotFound,
    /// Upstream quota exceeded
    RateLimited,
    /// Credentials rejected
    Unauthorized,
    /// The call did not finish within the per-call timeout
    Timeout,
    /// Transport failure, 5xx or a response we could not decode
    UpstreamUnavailable,
    /// The query itself was malformed (empty city, reversed dates)
    InvalidQuery,
}

impl SourceErrorKind {
    /// Whether the orchestrator may try this call again
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFound => "not found",
            Self::RateLimited => "rate limited",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timed out",
            Self::UpstreamUnavailable => "upstream unavailable",
            Self::InvalidQuery => "invalid query",
        };
        f.write_str(text)
    }
}

/// Error returned by a single adapter call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
    /// API that raised the error, when it differs from the adapter being called
    pub api: Option<Source>,
}

impl SourceError {
    pub fn new<S: Into<String>>(kind: SourceErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            api: None,
        }
    }

    /// Attribute the error to the API that produced it
    #[must_use]
    pub fn raised_by(mut self, api: Source) -> Self {
        self.api = Some(api);
        self
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn rate_limited<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::Unauthorized, message)
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::UpstreamUnavailable, message)
    }

    pub fn invalid_query<S: Into<String>>(message: S) -> Self {
        Self::new(SourceErrorKind::InvalidQuery, message)
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::unavailable(format!("Undecodable response: {err}"))
        } else {
            Self::unavailable(err.to_string())
        }
    }
}

/// Pipeline-level failure: the caller gets no itinerary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    /// The request failed validation before any call was made
    #[error("Invalid itinerary request: {0}")]
    InvalidRequest(String),

    /// A source rejected our credentials; every further call would fail too
    #[error("{api} rejected the configured credentials: {message}")]
    Unauthorized { api: Source, message: String },

    /// Strict mode only: not a single call succeeded
    #[error("Every data source failed for every city")]
    AllSourcesFailed,

    /// The caller cancelled the run
    #[error("Itinerary planning was cancelled")]
    Cancelled,

    /// Internal bug: orchestrator output does not line up with the request
    #[error("Assembly invariant violated: {0}")]
    AssemblyInvariantViolation(String),
}

/// Main error type for the application layer
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Planning pipeline errors
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PlannerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and API keys.")
            }
            PlannerError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            PlannerError::Orchestration(OrchestrationError::Unauthorized { api, .. }) => {
                format!("The {api} API rejected your API key. Please check your credentials.")
            }
            PlannerError::Orchestration(OrchestrationError::Cancelled) => {
                "Planning cancelled.".to_string()
            }
            PlannerError::Orchestration(err) => err.to_string(),
            PlannerError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
