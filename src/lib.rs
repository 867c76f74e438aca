pub mod config;
pub mod coord;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod observability;
pub mod source;

pub use engine::{StitchReport, TileStitcher};
pub use error::StitchError;
