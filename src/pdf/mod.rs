//! PDF manipulation module

pub mod canvas;
pub mod merge;
pub mod metadata;
pub mod stamp;
pub mod watermark;
pub mod xobject;

// Re-export commonly used items
pub use canvas::OverlayCanvas;
pub use merge::OverlayMerger;
pub use metadata::{count_pages, page_box};
pub use stamp::{add_images_to_pdf, render_overlay, stamp_pdf, OverlayAssets, OverlayImages, StampReport};
pub use watermark::{normalize_watermark, NormalizedWatermark};
pub use xobject::ImageXObject;
