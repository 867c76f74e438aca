//! Tile grid types

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Highest zoom level accepted for range derivation.
///
/// Keeps `2^zoom` and pixel offsets well inside `i64`/`u32` arithmetic.
pub const MAX_ZOOM: u32 = 30;

pub const DEFAULT_ZOOM: u32 = 12;
pub const DEFAULT_TILE_SIZE: u32 = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("zoom level {zoom} is out of range (0..={max})")]
    InvalidZoom { zoom: u32, max: u32 },

    #[error("tile size must be a positive number of pixels")]
    InvalidTileSize,

    #[error("coordinate ({lat}, {lng}) is not a finite number")]
    NonFiniteCoordinate { lat: f64, lng: f64 },

    #[error("{axis} range is inverted: start tile {start} lies after end tile {end}")]
    Inverted {
        axis: &'static str,
        start: i64,
        end: i64,
    },

    #[error("range covers {count} tiles, above the limit of {limit}")]
    TooManyTiles { count: u64, limit: u64 },

    #[error("output raster of {width}x{height} pixels exceeds the supported image size")]
    RasterTooLarge { width: u64, height: u64 },
}

/// Position of one tile in the global grid of a zoom level.
///
/// `x` grows eastwards, `y` grows southwards; `(0, 0)` is the northwest tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileIndex {
    pub x: i64,
    pub y: i64,
}

impl TileIndex {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Two geographic corners plus the grid parameters of a run.
///
/// The start corner is expected to be the northwest one: its tile index must
/// not lie east or south of the end corner's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_start: f64,
    pub lng_start: f64,
    pub lat_end: f64,
    pub lng_end: f64,
    pub zoom: u32,
    pub tile_size: u32,
}

impl BoundingBox {
    pub fn new(lat_start: f64, lng_start: f64, lat_end: f64, lng_end: f64) -> Self {
        Self {
            lat_start,
            lng_start,
            lat_end,
            lng_end,
            zoom: DEFAULT_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    pub fn with_zoom(mut self, zoom: u32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Derive the inclusive tile rectangle spanned by the two corners.
    pub fn tile_range(&self) -> Result<TileRange, RangeError> {
        if self.zoom > MAX_ZOOM {
            return Err(RangeError::InvalidZoom {
                zoom: self.zoom,
                max: MAX_ZOOM,
            });
        }
        if self.tile_size == 0 {
            return Err(RangeError::InvalidTileSize);
        }
        for (lat, lng) in [
            (self.lat_start, self.lng_start),
            (self.lat_end, self.lng_end),
        ] {
            if !lat.is_finite() || !lng.is_finite() {
                return Err(RangeError::NonFiniteCoordinate { lat, lng });
            }
        }

        let start = super::to_tile_index(self.lat_start, self.lng_start, self.zoom, self.tile_size);
        let end = super::to_tile_index(self.lat_end, self.lng_end, self.zoom, self.tile_size);

        TileRange::new(start, end, self.zoom, self.tile_size)
    }
}

/// Inclusive rectangle of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRange {
    start: TileIndex,
    end: TileIndex,
    zoom: u32,
    tile_size: u32,
}

impl TileRange {
    /// Build a range from its corner indices.
    ///
    /// Fails when either axis is inverted or when the composed raster would
    /// not fit in `u32` pixel dimensions.
    pub fn new(
        start: TileIndex,
        end: TileIndex,
        zoom: u32,
        tile_size: u32,
    ) -> Result<Self, RangeError> {
        if tile_size == 0 {
            return Err(RangeError::InvalidTileSize);
        }
        if end.x < start.x {
            return Err(RangeError::Inverted {
                axis: "x",
                start: start.x,
                end: end.x,
            });
        }
        if end.y < start.y {
            return Err(RangeError::Inverted {
                axis: "y",
                start: start.y,
                end: end.y,
            });
        }

        let range = Self {
            start,
            end,
            zoom,
            tile_size,
        };

        let width = range.x_count().saturating_mul(tile_size as u64);
        let height = range.y_count().saturating_mul(tile_size as u64);
        if width > u32::MAX as u64 || height > u32::MAX as u64 {
            return Err(RangeError::RasterTooLarge { width, height });
        }

        Ok(range)
    }

    pub fn start(&self) -> TileIndex {
        self.start
    }

    pub fn end(&self) -> TileIndex {
        self.end
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn x_count(&self) -> u64 {
        self.end.x.abs_diff(self.start.x).saturating_add(1)
    }

    pub fn y_count(&self) -> u64 {
        self.end.y.abs_diff(self.start.y).saturating_add(1)
    }

    /// Total number of tiles in the rectangle.
    pub fn len(&self) -> u64 {
        self.x_count().saturating_mul(self.y_count())
    }

    /// Always false: a constructed range holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn width_px(&self) -> u32 {
        (self.x_count() * self.tile_size as u64) as u32
    }

    pub fn height_px(&self) -> u32 {
        (self.y_count() * self.tile_size as u64) as u32
    }

    /// Reject ranges holding more than `limit` tiles.
    pub fn ensure_within(&self, limit: u64) -> Result<(), RangeError> {
        let count = self.len();
        if count > limit {
            return Err(RangeError::TooManyTiles { count, limit });
        }
        Ok(())
    }

    /// Grid offsets paired with their absolute index.
    ///
    /// Column-major: `dx` is the outer loop and `dy` the inner one.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, TileIndex)> + '_ {
        let (x_count, y_count) = (self.x_count() as u32, self.y_count() as u32);
        (0..x_count).flat_map(move |dx| {
            (0..y_count).map(move |dy| {
                (
                    dx,
                    dy,
                    TileIndex::new(self.start.x + dx as i64, self.start.y + dy as i64),
                )
            })
        })
    }
}
