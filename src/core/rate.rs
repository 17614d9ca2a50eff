//! Rate extraction abstractions and core types

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Raw numeric token located in the remote document, before any
/// normalization or plausibility check. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedToken {
    pub raw: String,
}

impl ExtractedToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The retrieval mechanism itself could not start.
    #[error("retrieval could not start: {0}")]
    Launch(String),

    /// Retrieval exceeded the overall fetch bound.
    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    /// The document was retrieved but the label/value pattern is absent.
    #[error("rate pattern not found in document")]
    NotFound,
}

/// Retrieves the remote rate document and locates the labeled numeric
/// token within it. Implementations own the retrieval strategy (plain
/// HTTP fetch, headless render, ...) but share this failure taxonomy.
#[async_trait]
pub trait RateExtractor: Send + Sync {
    async fn fetch(&self) -> Result<ExtractedToken, ExtractError>;
}
