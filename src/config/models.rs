use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::coord::{DEFAULT_TILE_SIZE, DEFAULT_ZOOM};
use crate::source::UrlTemplate;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Tile server settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url_template: UrlTemplate,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: UrlTemplate::default(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("tilestitch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// How tile downloads are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// One tile at a time, in enumeration order
    Sequential,
    /// Worker pool pulling from a shared queue
    #[default]
    Concurrent,
}

/// Fetch scheduling settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    /// Worker pool size; unset means one worker per available CPU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Refuse ranges with more tiles than this
    #[serde(default = "default_max_tiles")]
    pub max_tiles: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            workers: None,
            queue_capacity: default_queue_capacity(),
            max_tiles: default_max_tiles(),
        }
    }
}

impl FetchConfig {
    /// Effective worker count for the concurrent mode.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_tiles() -> u64 {
    65_536
}

/// Tile grid defaults, overridable per run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapConfig {
    #[serde(default = "default_zoom")]
    pub zoom: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            tile_size: default_tile_size(),
        }
    }
}

fn default_zoom() -> u32 {
    DEFAULT_ZOOM
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

/// Where per-run tile directories are created
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}
