//! Error types for the PDF stamper library

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The file a stamping run depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Directory scanned for PDFs in a batch run
    InputDirectory,
    /// The PDF being stamped
    InputPdf,
    /// Image drawn in the top-right corner
    HeaderImage,
    /// Image drawn translucent in the middle of the page
    WatermarkImage,
    /// Image drawn along the bottom edge
    FooterImage,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::InputDirectory => "input directory",
            Resource::InputPdf => "input PDF",
            Resource::HeaderImage => "header image",
            Resource::WatermarkImage => "watermark image",
            Resource::FooterImage => "footer image",
        };
        f.write_str(name)
    }
}

/// Main error type for the PDF stamper library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// One of the files a run depends on does not exist
    #[error("{resource} not found: {}", .path.display())]
    MissingResource {
        resource: Resource,
        path: PathBuf,
    },

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Page has no usable MediaBox
    #[error("Invalid page box: {0}")]
    InvalidPageBox(String),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Build a missing-resource error for `path`
    pub fn missing(resource: Resource, path: impl Into<PathBuf>) -> Self {
        Error::MissingResource {
            resource,
            path: path.into(),
        }
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::InvalidGlob(err.to_string())
    }
}
