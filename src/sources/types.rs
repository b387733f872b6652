// src/sources/types.rs
use thiserror::Error;

use crate::posting::{Source, WorkArrangement};

/// Per-source failure taxonomy. Never fatal to a cycle: a failing source is
/// logged, counted and skipped while the other sources proceed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("board returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("fetch timed out after {0}s")]
    Timeout(u64),
}

/// One board record before normalization. Field availability differs per
/// board; the normalizer decides what is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawJob {
    pub source: Source,
    /// Board-native identifier; the dedup id falls back to `url` without it.
    pub external_id: Option<String>,
    pub title: String,
    pub url: String,
    pub location: String,
    pub company: String,
    pub description: Option<String>,
    /// Free-text compensation, parsed into a bucket downstream.
    pub salary_text: Option<String>,
    /// Numeric annual lower bound where the board exposes one (Lever).
    pub salary_floor: Option<u64>,
    /// Arrangement directly stated by the board (Lever `workplaceType`).
    pub arrangement_hint: Option<WorkArrangement>,
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawJob>, FetchError>;
    fn source(&self) -> Source;
}
