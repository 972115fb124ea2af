//! Watermark preprocessing
//!
//! Re-encodes the watermark as straight-alpha RGBA composited over a fully
//! transparent canvas, so low-opacity drawing sees an explicit alpha channel
//! whatever pixel format the source file used.

use std::fs;
use std::path::{Path, PathBuf};
use image::{imageops, ImageFormat, RgbaImage};
use crate::error::Result;

/// Watermark image ready to be drawn
///
/// Holds either a normalized copy in the scratch directory or, when
/// normalization failed, the original path.
#[derive(Debug)]
pub struct NormalizedWatermark {
    path: PathBuf,
    temporary: bool,
    scratch_dir: PathBuf,
}

impl NormalizedWatermark {
    /// Path of the image to draw
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` is a scratch file owned by this value
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Delete the normalized copy and the scratch directory if nothing else is in it
    ///
    /// Failures are logged and otherwise ignored.
    pub fn cleanup(self) {
        if !self.temporary {
            return;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary watermark {}", self.path.display()),
            Err(e) => log::warn!("Could not remove temporary watermark {}: {}", self.path.display(), e),
        }

        remove_dir_if_empty(&self.scratch_dir);
    }
}

/// Normalize the watermark at `source` into an RGBA PNG inside `scratch_dir`
///
/// The scratch directory is created on demand. If the image cannot be decoded,
/// converted or saved, the failure is logged and the original path is returned
/// so the stamping run can continue.
pub fn normalize_watermark(source: &Path, scratch_dir: &Path) -> NormalizedWatermark {
    match write_normalized(source, scratch_dir) {
        Ok(path) => {
            log::debug!("Normalized watermark {} -> {}", source.display(), path.display());
            NormalizedWatermark {
                path,
                temporary: true,
                scratch_dir: scratch_dir.to_path_buf(),
            }
        }
        Err(e) => {
            log::warn!(
                "Could not normalize watermark {}: {}; using the original image",
                source.display(),
                e
            );
            NormalizedWatermark {
                path: source.to_path_buf(),
                temporary: false,
                scratch_dir: scratch_dir.to_path_buf(),
            }
        }
    }
}

fn write_normalized(source: &Path, scratch_dir: &Path) -> Result<PathBuf> {
    // Formats without alpha come back fully opaque
    let rgba = image::open(source)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut canvas = RgbaImage::new(width, height);
    imageops::overlay(&mut canvas, &rgba, 0, 0);

    fs::create_dir_all(scratch_dir)?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("watermark");
    let path = scratch_dir.join(format!("{}_rgba.png", stem));
    canvas.save_with_format(&path, ImageFormat::Png)?;

    Ok(path)
}

fn remove_dir_if_empty(dir: &Path) {
    let is_empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            log::warn!("Could not read scratch directory {}: {}", dir.display(), e);
            return;
        }
    };

    if !is_empty {
        log::debug!("Keeping scratch directory {}: not empty", dir.display());
        return;
    }

    if let Err(e) = fs::remove_dir(dir) {
        log::warn!("Could not remove scratch directory {}: {}", dir.display(), e);
    }
}
