//! Raster assembly
//!
//! Runs only after every tile is on disk. Decoding, pasting and encoding
//! are CPU-bound, so the engine calls these from a blocking task.

use image::{ImageFormat, RgbImage, imageops};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::coord::TileRange;
use crate::error::{Result, StitchError};
use crate::jobs::tile_file_name;

/// Decode every tile of `range` from `dir` and paste it into one raster.
///
/// Tile `(dx, dy)` lands at pixel offset `(dx * tile_size, dy * tile_size)`.
pub fn compose(range: &TileRange, dir: &Path) -> Result<RgbImage> {
    let tile_size = range.tile_size();
    let mut raster = RgbImage::new(range.width_px(), range.height_px());

    for (dx, dy, index) in range.cells() {
        let path = dir.join(tile_file_name(index, range.zoom()));
        let bytes = std::fs::read(&path).map_err(|e| StitchError::storage(&path, e))?;

        let tile = image::load_from_memory(&bytes).map_err(|e| StitchError::Decode {
            index,
            reason: e.to_string(),
        })?;

        if tile.width() != tile_size || tile.height() != tile_size {
            return Err(StitchError::Decode {
                index,
                reason: format!(
                    "expected {}x{} pixels, got {}x{}",
                    tile_size,
                    tile_size,
                    tile.width(),
                    tile.height()
                ),
            });
        }

        let x = dx as i64 * tile_size as i64;
        let y = dy as i64 * tile_size as i64;
        imageops::replace(&mut raster, &tile.to_rgb8(), x, y);
    }

    debug!(
        width = raster.width(),
        height = raster.height(),
        tiles = range.len(),
        "Composed raster"
    );

    Ok(raster)
}

/// Image format for `path`, taken from its extension.
///
/// Checked before any tile is fetched so a bad output path costs nothing.
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    let unsupported = |reason: String| StitchError::UnsupportedOutput {
        path: path.to_path_buf(),
        reason,
    };

    if path.file_name().is_none() {
        return Err(unsupported("path does not name a file".to_string()));
    }

    let format = ImageFormat::from_path(path).map_err(|e| unsupported(e.to_string()))?;
    if !format.writing_enabled() {
        return Err(unsupported(format!("{format:?} encoding is not available")));
    }

    Ok(format)
}

/// An encoded map waiting next to its final path.
///
/// [`commit`](Self::commit) renames it into place. Dropping it uncommitted
/// removes the staged file, so the output path only ever holds a complete
/// image or whatever was there before the run.
#[derive(Debug)]
pub struct StagedOutput {
    staged: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    /// Move the staged image over the target path.
    pub fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.staged, &self.target)
            .map_err(|e| StitchError::storage(&self.target, e))?;
        self.committed = true;

        debug!(path = %self.target.display(), "Map image committed");
        Ok(())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        if let Err(e) = std::fs::remove_file(&self.staged) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.staged.display(), error = %e, "Failed to remove staged output");
            }
        }
    }
}

/// Staging file in the target's directory, so the final rename stays on one filesystem.
fn staging_path(target: &Path) -> PathBuf {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();

    dir.join(format!(".{name}.{}.partial", &suffix[..8]))
}

/// Encode the raster into a staging file beside `path`.
pub fn stage(raster: &RgbImage, path: &Path, format: ImageFormat) -> Result<StagedOutput> {
    let staged = StagedOutput {
        staged: staging_path(path),
        target: path.to_path_buf(),
        committed: false,
    };

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(&staged.staged)
        .map_err(|e| StitchError::storage(&staged.staged, e))?;
    let mut writer = BufWriter::new(file);

    raster
        .write_to(&mut writer, format)
        .map_err(|source| StitchError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
    writer
        .into_inner()
        .map_err(|e| StitchError::storage(&staged.staged, e.into_error()))?;

    Ok(staged)
}

/// Encode the raster to `path`; the format follows the file extension.
///
/// The image is staged and renamed into place, so a failure never touches
/// an existing file at `path`.
pub fn persist(raster: &RgbImage, path: &Path) -> Result<()> {
    let format = output_format(path)?;
    stage(raster, path, format)?.commit()
}
