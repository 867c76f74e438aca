//! Coordinate conversion module
//!
//! Maps geographic coordinates (latitude/longitude in degrees) onto the
//! spherical Mercator tile grid used by web map tile servers.

mod types;

pub use types::{
    BoundingBox, DEFAULT_TILE_SIZE, DEFAULT_ZOOM, MAX_ZOOM, RangeError, TileIndex, TileRange,
};

use std::f64::consts::PI;

/// Converts a geographic point to the index of the tile containing it.
///
/// Both axes are rounded with `floor`, so points west of the antimeridian
/// or north of the grid map to negative indices rather than collapsing onto
/// tile 0. The formula has no error conditions: at latitude ±90 the
/// Mercator term diverges and the result saturates at the `i64` bounds.
///
/// `tile_size` cancels out mathematically; it is kept so the computation
/// runs in pixel space exactly like the tile server's own projection.
#[inline]
pub fn to_tile_index(lat: f64, lng: f64, zoom: u32, tile_size: u32) -> TileIndex {
    let tiles_per_axis = 2.0_f64.powi(zoom as i32);
    let size = tile_size as f64;

    let point_x = (size / 2.0 + lng * size / 360.0) * tiles_per_axis / size;

    let sin_lat = (lat * (PI / 180.0)).sin();
    let mercator = 0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln();
    let point_y = (size / 2.0 + mercator * -(size / (2.0 * PI))) * tiles_per_axis / size;

    TileIndex::new(point_x.floor() as i64, point_y.floor() as i64)
}

/// Returns the latitude/longitude of a tile's northwest corner.
#[inline]
pub fn tile_to_lat_lng(index: TileIndex, zoom: u32) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let lng = index.x as f64 / n * 360.0 - 180.0;

    let y = index.y as f64 / n;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();

    (lat, lng)
}
