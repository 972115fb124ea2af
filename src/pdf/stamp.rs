//! Stamping header, watermark and footer images onto every page of a PDF
//!
//! Each page gets a freshly rendered one-page overlay (see [`OverlayCanvas`])
//! which is merged on top of the original content (see [`OverlayMerger`]).

use std::path::{Path, PathBuf};
use lopdf::{Document, ObjectId};
use crate::error::{Error, Resource, Result};
use crate::layout::{OverlayLayout, PageBox, WATERMARK_OPACITY};
use crate::pdf::canvas::OverlayCanvas;
use crate::pdf::merge::OverlayMerger;
use crate::pdf::metadata::page_box;
use crate::pdf::watermark::normalize_watermark;
use crate::pdf::xobject::ImageXObject;

/// Resource names used for the stamped images
const HEADER_NAME: &str = "StampHeader";
const WATERMARK_NAME: &str = "StampWatermark";
const FOOTER_NAME: &str = "StampFooter";

/// The three image files stamped onto every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayAssets {
    pub header: PathBuf,
    pub watermark: PathBuf,
    pub footer: PathBuf,
}

impl Default for OverlayAssets {
    fn default() -> Self {
        Self::in_dir(Path::new("images"))
    }
}

impl OverlayAssets {
    /// `header.jpg`, `watermark.png` and `footer.jpg` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            header: dir.join("header.jpg"),
            watermark: dir.join("watermark.png"),
            footer: dir.join("footer.jpg"),
        }
    }

    /// Check that all three images exist
    pub fn validate(&self) -> Result<()> {
        require(&self.header, Resource::HeaderImage)?;
        require(&self.watermark, Resource::WatermarkImage)?;
        require(&self.footer, Resource::FooterImage)
    }
}

/// Images for one stamping run
///
/// The header is always drawn; the watermark and footer only when present.
#[derive(Debug, Clone, Copy)]
pub struct OverlayImages<'a> {
    pub header: &'a Path,
    pub watermark: Option<&'a Path>,
    pub footer: Option<&'a Path>,
}

impl<'a> OverlayImages<'a> {
    /// Use all three images of `assets`, with `watermark` replacing the asset's watermark path
    pub fn with_watermark(assets: &'a OverlayAssets, watermark: &'a Path) -> Self {
        Self {
            header: &assets.header,
            watermark: Some(watermark),
            footer: Some(&assets.footer),
        }
    }

    fn validate(&self) -> Result<()> {
        require(self.header, Resource::HeaderImage)?;
        if let Some(watermark) = self.watermark {
            require(watermark, Resource::WatermarkImage)?;
        }
        if let Some(footer) = self.footer {
            require(footer, Resource::FooterImage)?;
        }
        Ok(())
    }
}

/// Outcome of stamping one file
#[derive(Debug, Clone, PartialEq)]
pub struct StampReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Pages in the output (always equal to the input)
    pub page_count: usize,
    /// False when the watermark could not be decoded and was left out
    pub watermark_applied: bool,
}

/// Stamp a single PDF, including watermark preprocessing and cleanup
///
/// The watermark is normalized into `scratch_dir` first; the normalized copy is
/// removed again once the output has been written (or the run failed).
///
/// # Example
///
/// ```no_run
/// use pdf_stamper::pdf::{add_images_to_pdf, OverlayAssets};
/// use std::path::Path;
///
/// add_images_to_pdf(
///     Path::new("input_pdfs/report.pdf"),
///     Path::new("output_pdfs/report.pdf"),
///     &OverlayAssets::default(),
///     Path::new("temp_files"),
/// ).expect("Failed to stamp PDF");
/// ```
pub fn add_images_to_pdf(
    input_path: &Path,
    output_path: &Path,
    assets: &OverlayAssets,
    scratch_dir: &Path,
) -> Result<StampReport> {
    if let Err(e) = require(input_path, Resource::InputPdf).and_then(|_| assets.validate()) {
        log::error!("{}", e);
        return Err(e);
    }

    let watermark = normalize_watermark(&assets.watermark, scratch_dir);
    let result = stamp_pdf(
        input_path,
        output_path,
        &OverlayImages::with_watermark(assets, watermark.path()),
    );
    watermark.cleanup();

    result
}

/// Stamp every page of `input_path` and write the result to `output_path`
///
/// Fails without writing anything if the input or one of the images is missing.
/// A watermark that cannot be decoded is left out with a warning instead.
pub fn stamp_pdf(input_path: &Path, output_path: &Path, images: &OverlayImages<'_>) -> Result<StampReport> {
    let result = require(input_path, Resource::InputPdf)
        .and_then(|_| images.validate())
        .and_then(|_| stamp_document(input_path, output_path, images));

    if let Err(ref e) = result {
        log::error!("Failed to stamp {}: {}", input_path.display(), e);
    }
    result
}

fn stamp_document(input_path: &Path, output_path: &Path, images: &OverlayImages<'_>) -> Result<StampReport> {
    log::info!("Processing: {}", input_path.display());
    log::debug!("Header image: {}", images.header.display());
    if let Some(path) = images.watermark {
        log::debug!("Watermark image: {}", path.display());
    }
    if let Some(path) = images.footer {
        log::debug!("Footer image: {}", path.display());
    }

    let header = ImageXObject::load(images.header)?;
    let watermark = images.watermark.and_then(|path| match ImageXObject::load(path) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("Watermark {} could not be decoded ({}); stamping without it", path.display(), e);
            None
        }
    });
    let footer = images.footer.map(ImageXObject::load).transpose()?;

    let mut doc = Document::load(input_path)?;

    // Collect page IDs first (to avoid borrow issues)
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let first_page = match pages.first() {
        Some(&id) => page_box(&doc, id)?,
        None => return Err(Error::EmptyPdf(input_path.to_path_buf())),
    };

    log::info!(
        "Page size: {:.1} x {:.1} points",
        first_page.width.pt(),
        first_page.height.pt()
    );
    let first_layout = OverlayLayout::for_page(&first_page);
    log::debug!("Header position: X={:.1}, Y={:.1}", first_layout.header.x, first_layout.header.y);

    let mut merger = OverlayMerger::new();
    for (i, page_id) in pages.iter().enumerate() {
        let page_number = i + 1;
        log::debug!("Processing page {}...", page_number);

        let page = page_box(&doc, *page_id)?;
        if !page.same_size(&first_page) {
            log::debug!(
                "Page {} is {:.1} x {:.1} points; placing overlay for that size",
                page_number,
                page.width.pt(),
                page.height.pt()
            );
        }

        let overlay = render_overlay(&page, &header, watermark.as_ref(), footer.as_ref())?;
        merger.merge_page(&mut doc, *page_id, &overlay)?;
    }

    // Save the stamped PDF in one write
    doc.compress();
    doc.save(output_path)?;

    log::info!("Saved: {} ({} pages)", output_path.display(), pages.len());

    Ok(StampReport {
        input: input_path.to_path_buf(),
        output: output_path.to_path_buf(),
        page_count: pages.len(),
        watermark_applied: watermark.is_some(),
    })
}

/// Render the one-page overlay for a page of the given size
pub fn render_overlay(
    page: &PageBox,
    header: &ImageXObject,
    watermark: Option<&ImageXObject>,
    footer: Option<&ImageXObject>,
) -> Result<Document> {
    let layout = OverlayLayout::for_page(page);
    let mut canvas = OverlayCanvas::new(*page);

    canvas.draw_image(HEADER_NAME, header, layout.header);

    if let Some(watermark) = watermark {
        canvas.with_opacity(WATERMARK_OPACITY, |canvas| {
            canvas.draw_image(WATERMARK_NAME, watermark, layout.watermark);
        });
    }

    if let Some(footer) = footer {
        canvas.draw_image(FOOTER_NAME, footer, layout.footer);
    }

    canvas.finish()
}

fn require(path: &Path, resource: Resource) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::missing(resource, path))
    }
}
