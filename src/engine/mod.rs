//! Tile fetch & compose engine
//!
//! [`TileStitcher::write_into`] runs the whole pipeline for one bounding box:
//!
//! 1. map both corners to a [`TileRange`] (rejecting inverted or oversized ranges)
//!    and resolve the output format from the output extension
//! 2. create a transient [`Workspace`] and enumerate one [`TileJob`] per tile
//! 3. fetch every job, sequentially or with a worker pool
//! 4. after all fetches finished, decode and paste the tiles into one raster
//! 5. encode the raster beside the output path and rename it into place
//! 6. remove the workspace, on success and on failure
//!
//! Any failure aborts the run before anything is written at the output path.
//! A run that is cancelled through
//! [`write_into_cancellable`](TileStitcher::write_into_cancellable), or whose
//! future is dropped, never renames its staged image into place.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilestitch::coord::BoundingBox;
//! use tilestitch::engine::TileStitcher;
//! use tilestitch::source::HttpTileSource;
//!
//! # async fn run() -> tilestitch::error::Result<()> {
//! let source = HttpTileSource::new(&Default::default())?;
//! let stitcher = TileStitcher::builder().source(Arc::new(source)).build();
//!
//! let bbox = BoundingBox::new(-6.256524, 107.170208, -6.292112, 107.242934).with_zoom(17);
//! stitcher.write_into(&bbox, "map.png").await?;
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod fetch;
pub mod progress;
pub mod workspace;

pub use fetch::Fetcher;
pub use progress::{ChannelProgress, NoopProgress, ProgressEvent, ProgressReporter, TracingProgress};
pub use workspace::Workspace;

use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, FetchMode, default_workers};
use crate::coord::{BoundingBox, TileRange};
use crate::error::{Result, StitchError};
use crate::jobs::{self, TileJob};
use crate::observability::{FetchMetrics, MetricsSnapshot};
use crate::source::{HttpTileSource, TileSource, UrlTemplate};

fn tracing_progress() -> Arc<dyn ProgressReporter> {
    Arc::new(TracingProgress)
}

/// Downloads the tiles of a bounding box and stitches them into one image.
///
/// Each call to [`write_into`](Self::write_into) owns its own queue,
/// workspace and counters, so one stitcher can serve concurrent runs.
#[derive(bon::Builder)]
pub struct TileStitcher {
    source: Arc<dyn TileSource>,
    #[builder(default)]
    template: UrlTemplate,
    #[builder(default)]
    mode: FetchMode,
    #[builder(default = default_workers())]
    workers: usize,
    #[builder(default = 256)]
    queue_capacity: usize,
    #[builder(default = 65_536)]
    max_tiles: u64,
    #[builder(into, default = PathBuf::from("."))]
    workspace_root: PathBuf,
    #[builder(default = tracing_progress())]
    progress: Arc<dyn ProgressReporter>,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct StitchReport {
    pub range: TileRange,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
}

impl TileStitcher {
    /// Stitcher fetching over HTTP with every setting taken from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpTileSource::new(&config.source)?;

        Ok(Self::builder()
            .source(Arc::new(source))
            .template(config.source.url_template.clone())
            .mode(config.fetch.mode)
            .workers(config.fetch.worker_count())
            .queue_capacity(config.fetch.queue_capacity)
            .max_tiles(config.fetch.max_tiles)
            .workspace_root(config.workspace.root.clone())
            .build())
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// Derive and bound-check the tile range without fetching anything.
    pub fn plan(&self, bbox: &BoundingBox) -> Result<TileRange> {
        let range = bbox.tile_range()?;
        range.ensure_within(self.max_tiles)?;
        Ok(range)
    }

    /// Jobs a run over `bbox` would execute, with destinations under `dir`.
    pub fn jobs(&self, bbox: &BoundingBox, dir: &Path) -> Result<Vec<TileJob>> {
        let range = self.plan(bbox)?;
        Ok(jobs::enumerate(&range, &self.template, dir))
    }

    /// Fetch, compose and save the map covering `bbox` to `output`.
    pub async fn write_into(
        &self,
        bbox: &BoundingBox,
        output: impl AsRef<Path>,
    ) -> Result<StitchReport> {
        self.write_into_cancellable(bbox, output, CancellationToken::new())
            .await
    }

    /// Like [`write_into`](Self::write_into), stopping with
    /// [`StitchError::Interrupted`] once `cancel` fires.
    ///
    /// The call returns only after in-flight work has wound down and the
    /// workspace is removed; the output path is left untouched.
    pub async fn write_into_cancellable(
        &self,
        bbox: &BoundingBox,
        output: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<StitchReport> {
        let started = Instant::now();
        let output = output.as_ref().to_path_buf();

        let range = self.plan(bbox)?;
        let format = compose::output_format(&output)?;

        // Fires when this future is dropped, so an abandoned blocking
        // encode stops at its next checkpoint.
        let run_cancel = cancel.child_token();
        let _abandoned = run_cancel.clone().drop_guard();

        self.progress.report(ProgressEvent::RangeResolved {
            range,
            tiles: range.len(),
        });

        let workspace = Workspace::create(&self.workspace_root).await?;
        let metrics = Arc::new(FetchMetrics::new());

        let outcome = self
            .run(
                range,
                &workspace,
                &output,
                format,
                Arc::clone(&metrics),
                run_cancel,
            )
            .await;

        if let Err(e) = workspace.cleanup().await {
            warn!(error = %e, "Failed to remove tile workspace");
        }
        outcome?;

        let report = StitchReport {
            range,
            output,
            width: range.width_px(),
            height: range.height_px(),
            metrics: metrics.snapshot(),
            elapsed: started.elapsed(),
        };

        info!(
            source = self.source.name(),
            output = %report.output.display(),
            width = report.width,
            height = report.height,
            tiles = report.metrics.tiles_fetched,
            bytes = report.metrics.bytes_fetched,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Map stitched"
        );

        Ok(report)
    }

    async fn run(
        &self,
        range: TileRange,
        workspace: &Workspace,
        output: &Path,
        format: ImageFormat,
        metrics: Arc<FetchMetrics>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let jobs = jobs::enumerate(&range, &self.template, workspace.dir());
        let total = jobs.len() as u64;
        let fetcher = Fetcher::new(
            Arc::clone(&self.source),
            metrics,
            Arc::clone(&self.progress),
            total,
        )
        .with_cancellation(cancel.clone());

        match self.mode {
            FetchMode::Sequential => {
                self.progress.report(ProgressEvent::FetchStarted {
                    mode: self.mode,
                    workers: 1,
                    tiles: total,
                });
                fetch::fetch_sequential(jobs, &fetcher).await?;
            }
            FetchMode::Concurrent => {
                self.progress.report(ProgressEvent::FetchStarted {
                    mode: self.mode,
                    workers: self.workers.clamp(1, jobs.len().max(1)),
                    tiles: total,
                });
                fetch::fetch_concurrent(jobs, &fetcher, self.workers, self.queue_capacity).await?;
            }
        }

        self.progress.report(ProgressEvent::ComposeStarted {
            width: range.width_px(),
            height: range.height_px(),
        });

        let dir = workspace.dir().to_path_buf();
        let destination = output.to_path_buf();
        let encode_cancel = cancel.clone();
        let staged = tokio::task::spawn_blocking(move || {
            if encode_cancel.is_cancelled() {
                return Ok(None);
            }
            let raster = compose::compose(&range, &dir)?;
            if encode_cancel.is_cancelled() {
                return Ok(None);
            }
            compose::stage(&raster, &destination, format).map(Some)
        })
        .await
        .map_err(|e| StitchError::WorkerCrashed(e.to_string()))??;

        // Dropping an uncommitted stage removes its file.
        let staged = match staged {
            Some(staged) if !cancel.is_cancelled() => staged,
            _ => return Err(StitchError::Interrupted),
        };
        staged.commit()?;

        self.progress.report(ProgressEvent::Saved {
            path: output.to_path_buf(),
        });

        Ok(())
    }
}
