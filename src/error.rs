//! Errors surfaced by a stitching run

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::coord::{RangeError, TileIndex};
use crate::source::FetchError;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("invalid tile range: {0}")]
    Range(#[from] RangeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up tile client: {0}")]
    Client(#[from] FetchError),

    #[error("failed to fetch tile {index} from {url}: {source}")]
    Network {
        index: TileIndex,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("tile {index} is not a usable image: {reason}")]
    Decode { index: TileIndex, reason: String },

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write a map image to {}: {reason}", path.display())]
    UnsupportedOutput { path: PathBuf, reason: String },

    #[error("failed to write map image {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("fetch worker crashed: {0}")]
    WorkerCrashed(String),

    #[error("interrupted before the map was written")]
    Interrupted,
}

impl StitchError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StitchError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether the run was rejected before any tile was requested.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StitchError::Range(_) | StitchError::Config(_) | StitchError::UnsupportedOutput { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            StitchError::Range(_)
            | StitchError::Config(_)
            | StitchError::UnsupportedOutput { .. } => "CONFIGURATION",
            StitchError::Client(_) | StitchError::Network { .. } => "NETWORK",
            StitchError::Decode { .. } => "DECODE",
            StitchError::Storage { .. } | StitchError::Persist { .. } => "STORAGE",
            StitchError::WorkerCrashed(_) => "INTERNAL",
            StitchError::Interrupted => "INTERRUPTED",
        }
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
