//! Client side of the knowledge-tree REST service.
//!
//! - [`TreeApi`] is the async seam the tree model talks to
//! - [`HttpClient`] implements it over reqwest, plus the quiz, history and ask endpoints
//! - [`MemoryApi`] implements it in-process for demo mode and tests
//!
//! # Example
//!
//! ```ignore
//! use knowtree::api::{HttpClient, TreeApi};
//!
//! let api = HttpClient::new("http://localhost:8080", &config)?;
//! let roots = api.roots().await?;
//! ```

mod client;
mod memory;
mod types;

pub use client::{HttpClient, TreeApi};
pub use memory::MemoryApi;
pub use types::{
    NewNode, Node, NodeFields, NodeId, NodeUpdate, ParentRef, Quiz, QuizEvaluation, QuizQuestion,
    QuizResult, QuizSubmission,
};

use thiserror::Error;

/// Errors returned by any [`TreeApi`] implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,
    /// Network-level error (DNS, connection, TLS, redirect policy).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response; `message` is the server's error text when it sent one.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
    /// Body exceeded the size cap.
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body was not the JSON shape we expected.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    /// The in-process backend is switched offline.
    #[error("Service unavailable")]
    Unavailable,
}

impl ApiError {
    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::HttpStatus { status: 404, .. })
    }

    /// Short form for the status bar.
    pub fn summary(&self) -> String {
        match self {
            ApiError::Timeout => "timed out".to_string(),
            ApiError::Network(_) => "network error".to_string(),
            ApiError::HttpStatus { status, message } if message.is_empty() => {
                format!("HTTP {}", status)
            }
            ApiError::HttpStatus { status, message } => format!("HTTP {}: {}", status, message),
            ApiError::ResponseTooLarge(_) => "response too large".to_string(),
            ApiError::Decode(_) => "malformed response".to_string(),
            ApiError::InvalidBaseUrl(_) => "invalid API URL".to_string(),
            ApiError::Unavailable => "service unavailable".to_string(),
        }
    }
}
