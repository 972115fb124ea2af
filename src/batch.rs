//! Batch driver: stamp every PDF of the input directory into the output directory

use std::fs;
use std::path::{Path, PathBuf};
use glob::glob;
use crate::error::{Error, Resource, Result};
use crate::pdf::stamp::{stamp_pdf, OverlayAssets, OverlayImages, StampReport};
use crate::pdf::watermark::normalize_watermark;

/// Fixed directory layout of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    /// Scanned for `*.pdf` files
    pub input_dir: PathBuf,
    /// Receives stamped copies under the same file names
    pub output_dir: PathBuf,
    /// Holds the normalized watermark while the batch runs
    pub scratch_dir: PathBuf,
    pub assets: OverlayAssets,
}

impl Default for BatchLayout {
    fn default() -> Self {
        Self::rooted_at(Path::new(""))
    }
}

impl BatchLayout {
    /// The standard layout below `root`
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            input_dir: root.join("input_pdfs"),
            output_dir: root.join("output_pdfs"),
            scratch_dir: root.join("temp_files"),
            assets: OverlayAssets::in_dir(&root.join("images")),
        }
    }
}

/// One input file and where its stamped copy goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub stamped: Vec<StampReport>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchSummary {
    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of files attempted
    pub fn total(&self) -> usize {
        self.stamped.len() + self.failed.len()
    }
}

/// List the `.pdf` files directly inside `input_dir`, sorted by name
///
/// Each input is paired with a file of the same name in `output_dir`.
pub fn discover_inputs(input_dir: &Path, output_dir: &Path) -> Result<Vec<FileJob>> {
    if !input_dir.is_dir() {
        return Err(Error::missing(Resource::InputDirectory, input_dir));
    }

    let dir = input_dir
        .to_str()
        .ok_or_else(|| Error::InvalidGlob(format!("Non UTF-8 directory: {}", input_dir.display())))?;
    let pattern = Path::new(&glob::Pattern::escape(dir)).join("*.pdf");
    let pattern = pattern.to_string_lossy();

    let mut paths = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unreadable entry: {}", e),
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|input| {
            let name = input.file_name()?.to_owned();
            Some(FileJob {
                output: output_dir.join(name),
                input,
            })
        })
        .collect())
}

/// Stamp every PDF in the layout's input directory
///
/// The watermark is normalized once for the whole batch. A file that fails is
/// logged and recorded in the summary, and the remaining files are still
/// processed. Returns an error only if the batch cannot start.
pub fn run_batch(layout: &BatchLayout) -> Result<BatchSummary> {
    let jobs = discover_inputs(&layout.input_dir, &layout.output_dir)?;
    fs::create_dir_all(&layout.output_dir)?;

    let mut summary = BatchSummary::default();
    if jobs.is_empty() {
        log::info!("No PDF files found in {}", layout.input_dir.display());
        return Ok(summary);
    }

    log::info!("Found {} PDF files in {}", jobs.len(), layout.input_dir.display());

    // A missing watermark is reported per file by stamp_pdf
    let watermark = layout
        .assets
        .watermark
        .exists()
        .then(|| normalize_watermark(&layout.assets.watermark, &layout.scratch_dir));
    let watermark_path = watermark
        .as_ref()
        .map_or(layout.assets.watermark.as_path(), |w| w.path());
    let images = OverlayImages::with_watermark(&layout.assets, watermark_path);

    for job in &jobs {
        match stamp_pdf(&job.input, &job.output, &images) {
            Ok(report) => summary.stamped.push(report),
            Err(e) => summary.failed.push((job.input.clone(), e)),
        }
    }

    if let Some(watermark) = watermark {
        watermark.cleanup();
    }

    if summary.is_success() {
        log::info!("Stamped {} PDF files into {}", summary.stamped.len(), layout.output_dir.display());
    } else {
        log::error!("{} of {} PDF files failed", summary.failed.len(), summary.total());
    }

    Ok(summary)
}
