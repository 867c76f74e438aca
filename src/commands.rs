use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tilestitch::config::Config;
use tilestitch::coord::{TileIndex, TileRange, tile_to_lat_lng};
use tilestitch::error::Result;
use tilestitch::jobs::tile_file_name;
use tilestitch::{StitchReport, TileStitcher};

use crate::cli::{FetchArgs, PlanArgs};

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Load configuration, layer the flags over it and run the full pipeline.
///
/// Ctrl+C or SIGTERM cancels the run, which then winds down and removes its
/// workspace before this returns; nothing is written at the output path.
pub async fn fetch(config_path: Option<PathBuf>, args: &FetchArgs) -> Result<StitchReport> {
    let mut config = Config::load_with(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let stitcher = TileStitcher::from_config(&config)?;
    let bbox = args.bbox.bounding_box(&config.map);

    info!(
        mode = ?stitcher.mode(),
        workers = stitcher.workers(),
        output = %args.output.display(),
        "Starting map download"
    );

    let cancel = CancellationToken::new();
    let run = stitcher.write_into_cancellable(&bbox, &args.output, cancel.clone());
    tokio::pin!(run);

    tokio::select! {
        report = &mut run => report,
        _ = shutdown_signal() => {
            warn!("Interrupted, discarding downloaded tiles");
            cancel.cancel();
            run.await
        }
    }
}

/// What a fetch over the same box would do, without doing it.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub start: TileIndex,
    pub end: TileIndex,
    pub zoom: u32,
    pub tile_size: u32,
    pub columns: u64,
    pub rows: u64,
    pub tiles: u64,
    pub width: u32,
    pub height: u32,
    pub northwest: [f64; 2],
    pub southeast: [f64; 2],
    pub first_url: String,
    pub first_file: String,
}

impl PlanReport {
    fn new(range: &TileRange, config: &Config) -> Self {
        let start = range.start();
        let end = range.end();
        let (nw_lat, nw_lng) = tile_to_lat_lng(start, range.zoom());
        let (se_lat, se_lng) = tile_to_lat_lng(TileIndex::new(end.x + 1, end.y + 1), range.zoom());

        Self {
            start,
            end,
            zoom: range.zoom(),
            tile_size: range.tile_size(),
            columns: range.x_count(),
            rows: range.y_count(),
            tiles: range.len(),
            width: range.width_px(),
            height: range.height_px(),
            northwest: [nw_lat, nw_lng],
            southeast: [se_lat, se_lng],
            first_url: config.source.url_template.render(start, range.zoom()),
            first_file: tile_file_name(start, range.zoom()),
        }
    }

    fn to_text(&self) -> String {
        format!(
            "Tiles:     {start} .. {end} at zoom {zoom}\n\
             Grid:      {columns} x {rows} ({tiles} tiles)\n\
             Raster:    {width} x {height} px ({tile_size} px tiles)\n\
             Coverage:  ({nw_lat:.6}, {nw_lng:.6}) .. ({se_lat:.6}, {se_lng:.6})\n\
             First URL: {first_url}\n",
            start = self.start,
            end = self.end,
            zoom = self.zoom,
            columns = self.columns,
            rows = self.rows,
            tiles = self.tiles,
            width = self.width,
            height = self.height,
            tile_size = self.tile_size,
            nw_lat = self.northwest[0],
            nw_lng = self.northwest[1],
            se_lat = self.southeast[0],
            se_lng = self.southeast[1],
            first_url = self.first_url,
        )
    }
}

pub fn plan(config_path: Option<PathBuf>, args: &PlanArgs) -> std::result::Result<String, AnyError> {
    let mut config = Config::load_with(config_path)?;
    args.bbox.apply(&mut config.map);
    config.validate()?;

    render_plan(&config, args)
}

fn render_plan(config: &Config, args: &PlanArgs) -> std::result::Result<String, AnyError> {
    let range = args.bbox.bounding_box(&config.map).tile_range()?;
    range.ensure_within(config.fetch.max_tiles)?;

    let report = PlanReport::new(&range, config);
    if args.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(report.to_text())
    }
}

pub fn show_config(config_path: Option<PathBuf>) -> std::result::Result<String, AnyError> {
    let config = Config::load_with(config_path)?;
    Ok(config.to_toml()?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
