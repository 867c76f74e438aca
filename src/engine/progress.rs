//! Progress events emitted during a run
//!
//! The engine never prints. It hands [`ProgressEvent`]s to a
//! [`ProgressReporter`], which can be a closure, an event channel, the
//! `tracing`-backed default, or nothing at all.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::FetchMode;
use crate::coord::{TileIndex, TileRange};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Corners mapped to a tile rectangle
    RangeResolved { range: TileRange, tiles: u64 },
    /// Downloads are about to start
    FetchStarted {
        mode: FetchMode,
        workers: usize,
        tiles: u64,
    },
    /// One tile was downloaded and stored
    TileFetched {
        seq: u64,
        total: u64,
        done: u64,
        index: TileIndex,
        url: String,
        bytes: usize,
    },
    /// One tile could not be fetched or stored; the run is aborting
    TileFailed {
        seq: u64,
        index: TileIndex,
        url: String,
    },
    /// All tiles are on disk, the raster is being assembled
    ComposeStarted { width: u32, height: u32 },
    /// The raster was written
    Saved { path: PathBuf },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events to an unbounded channel; a closed channel drops them.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub mpsc::UnboundedSender<ProgressEvent>);

impl ChannelProgress {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Default reporter: one log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RangeResolved { range, tiles } => {
                let (start, end) = (range.start(), range.end());
                info!(
                    %start,
                    %end,
                    zoom = range.zoom(),
                    tiles,
                    "Resolved tile range"
                );
            }
            ProgressEvent::FetchStarted {
                mode,
                workers,
                tiles,
            } => {
                debug!(?mode, workers, tiles, "Fetching tiles");
            }
            ProgressEvent::TileFetched {
                seq,
                total,
                done,
                url,
                bytes,
                ..
            } => {
                info!(done, bytes, "Fetching #{} of {}: {}", seq, total, url);
            }
            ProgressEvent::TileFailed { seq, index, url } => {
                warn!(seq, %index, url, "Tile fetch failed");
            }
            ProgressEvent::ComposeStarted { width, height } => {
                debug!(width, height, "Composing map image");
            }
            ProgressEvent::Saved { path } => {
                info!(path = %path.display(), "Map image saved");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}
