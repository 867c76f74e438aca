//! Tile sources
//!
//! A [`TileSource`] turns one [`TileJob`] into the raw bytes of its tile
//! image. The engine only talks to this trait, so tests swap the HTTP
//! implementation for in-process doubles.

mod http;
mod template;

pub use http::HttpTileSource;
pub use template::{PLACEHOLDERS, UrlTemplate};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::jobs::TileJob;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Source of encoded tile images.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch the encoded image for a single job.
    async fn fetch(&self, job: &TileJob) -> Result<Bytes>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "tile-source"
    }
}
