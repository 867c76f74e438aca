//! End-to-end tests against an embedded tile server
//!
//! An axum server on a random local port serves 8x8 PNG tiles whose colour
//! encodes the tile's (x, y). Every test drives the real reqwest-backed
//! pipeline through `TileStitcher::from_config`.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tilestitch::config::{Config, FetchMode};
use tilestitch::coord::BoundingBox;
use tilestitch::error::StitchError;
use tilestitch::source::{FetchError, UrlTemplate};
use tilestitch::TileStitcher;

const TILE: u32 = 8;

/// Zoom 3, columns 1..=4, rows 2..=3
fn bbox() -> BoundingBox {
    BoundingBox::new(60.0, -100.0, 10.0, 20.0)
        .with_zoom(3)
        .with_tile_size(TILE)
}

fn tile_color(x: i64, y: i64) -> Rgb<u8> {
    Rgb([(x * 40) as u8, (y * 60) as u8, 200])
}

fn png_tile(color: Rgb<u8>) -> Vec<u8> {
    let img = RgbImage::from_pixel(TILE, TILE, color);
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[derive(Clone, Copy)]
enum Fault {
    None,
    NotFound(i64, i64),
    Html(i64, i64),
}

struct MockTiles {
    fault: Fault,
    hits: Mutex<HashMap<(u32, i64, i64), usize>>,
}

async fn serve_tile(
    State(state): State<Arc<MockTiles>>,
    Path((z, x, y)): Path<(u32, i64, i64)>,
) -> Response {
    *state.hits.lock().unwrap().entry((z, x, y)).or_default() += 1;

    match state.fault {
        Fault::NotFound(fx, fy) if (fx, fy) == (x, y) => StatusCode::NOT_FOUND.into_response(),
        Fault::Html(fx, fy) if (fx, fy) == (x, y) => (
            [(header::CONTENT_TYPE, "text/html")],
            "<html>quota exceeded</html>",
        )
            .into_response(),
        _ => (
            [(header::CONTENT_TYPE, "image/png")],
            png_tile(tile_color(x, y)),
        )
            .into_response(),
    }
}

/// Start the tile server; returns its URL template and shared state.
async fn start_mock_server(fault: Fault) -> (UrlTemplate, Arc<MockTiles>) {
    let state = Arc::new(MockTiles {
        fault,
        hits: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/tiles/{z}/{x}/{y}", get(serve_tile))
        .with_state(Arc::clone(&state));

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let template = UrlTemplate::new(format!("http://{bound_addr}/tiles/{{z}}/{{x}}/{{y}}"));
    (template, state)
}

struct Dirs {
    work: TempDir,
    out: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            work: TempDir::new().unwrap(),
            out: TempDir::new().unwrap(),
        }
    }

    fn work_entries(&self) -> usize {
        std::fs::read_dir(self.work.path()).unwrap().count()
    }
}

fn config(template: UrlTemplate, mode: FetchMode, dirs: &Dirs) -> Config {
    let mut config = Config::default();
    config.source.url_template = template;
    config.fetch.mode = mode;
    config.fetch.workers = Some(3);
    config.workspace.root = dirs.work.path().to_path_buf();
    config.validate().unwrap();
    config
}

fn assert_stitched(path: &std::path::Path) {
    let map = image::open(path).unwrap().to_rgb8();
    assert_eq!(map.dimensions(), (4 * TILE, 2 * TILE));

    for x in 1..=4i64 {
        for y in 2..=3i64 {
            let px = (x - 1) as u32 * TILE;
            let py = (y - 2) as u32 * TILE;
            for (ox, oy) in [(0, 0), (TILE - 1, 0), (0, TILE - 1), (TILE - 1, TILE - 1)] {
                assert_eq!(
                    map.get_pixel(px + ox, py + oy),
                    &tile_color(x, y),
                    "tile ({x}, {y}) at offset ({ox}, {oy})"
                );
            }
        }
    }
}

#[tokio::test]
async fn test_concurrent_download_stitches_map() {
    let (template, server) = start_mock_server(Fault::None).await;
    let dirs = Dirs::new();
    let stitcher = TileStitcher::from_config(&config(template, FetchMode::Concurrent, &dirs)).unwrap();

    let output = dirs.out.path().join("map.png");
    let report = stitcher.write_into(&bbox(), &output).await.unwrap();

    assert_eq!((report.width, report.height), (32, 16));
    assert_eq!(report.metrics.tiles_fetched, 8);
    assert_eq!(report.metrics.tiles_failed, 0);
    assert_stitched(&output);

    let hits = server.hits.lock().unwrap();
    assert_eq!(hits.len(), 8);
    assert!(hits.values().all(|&count| count == 1));
    assert!(hits.keys().all(|&(z, _, _)| z == 3));

    assert_eq!(dirs.work_entries(), 0, "workspace should be removed");
}

#[tokio::test]
async fn test_sequential_download_matches_concurrent() {
    let (template, server) = start_mock_server(Fault::None).await;
    let dirs = Dirs::new();
    let stitcher = TileStitcher::from_config(&config(template, FetchMode::Sequential, &dirs)).unwrap();

    let output = dirs.out.path().join("map.png");
    stitcher.write_into(&bbox(), &output).await.unwrap();

    assert_stitched(&output);
    assert_eq!(server.hits.lock().unwrap().len(), 8);
    assert_eq!(dirs.work_entries(), 0);
}

#[tokio::test]
async fn test_http_error_aborts_without_output() {
    let (template, _server) = start_mock_server(Fault::NotFound(3, 2)).await;
    let dirs = Dirs::new();
    let stitcher = TileStitcher::from_config(&config(template, FetchMode::Concurrent, &dirs)).unwrap();

    let output = dirs.out.path().join("map.png");
    let err = stitcher.write_into(&bbox(), &output).await.unwrap_err();

    match err {
        StitchError::Network { index, url, source } => {
            assert_eq!((index.x, index.y), (3, 2));
            assert!(url.ends_with("/tiles/3/3/2"));
            assert!(matches!(source, FetchError::Status { status: 404, .. }));
        }
        other => panic!("expected network error, got {other:?}"),
    }

    assert!(!output.exists());
    assert_eq!(dirs.work_entries(), 0);
}

#[tokio::test]
async fn test_non_image_body_is_a_decode_error() {
    let (template, _server) = start_mock_server(Fault::Html(2, 3)).await;
    let dirs = Dirs::new();
    let stitcher = TileStitcher::from_config(&config(template, FetchMode::Sequential, &dirs)).unwrap();

    let output = dirs.out.path().join("map.png");
    let err = stitcher.write_into(&bbox(), &output).await.unwrap_err();

    assert!(matches!(err, StitchError::Decode { index, .. } if (index.x, index.y) == (2, 3)));
    assert_eq!(err.code(), "DECODE");
    assert!(!output.exists());
    assert_eq!(dirs.work_entries(), 0);
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let dirs = Dirs::new();
    let template = UrlTemplate::new("http://127.0.0.1:1/{z}/{x}/{y}");
    let stitcher = TileStitcher::from_config(&config(template, FetchMode::Concurrent, &dirs)).unwrap();

    let output = dirs.out.path().join("map.png");
    let err = stitcher.write_into(&bbox(), &output).await.unwrap_err();

    assert!(matches!(err, StitchError::Network { .. }));
    assert!(!output.exists());
    assert_eq!(dirs.work_entries(), 0);
}
