//! PDF Stamper Library
//!
//! Stamps three fixed images onto every page of PDF files:
//! - a header in the top-right corner
//! - a translucent watermark in the middle of the page
//! - a footer along the bottom edge
//!
//! Each page gets a one-page overlay rendered for its size, which is merged on
//! top of the original content. The original content is never removed.
//!
//! # Example
//!
//! ```no_run
//! use pdf_stamper::batch::{run_batch, BatchLayout};
//!
//! let summary = run_batch(&BatchLayout::default()).expect("Failed to start batch");
//! println!("{} files stamped", summary.stamped.len());
//! ```

pub mod batch;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Resource, Result};
