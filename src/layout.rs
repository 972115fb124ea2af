//! Page layout calculations
//!
//! All values are PDF points (1/72 inch). The coordinate system has its origin
//! at the bottom-left of the page with y growing upwards.

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Header size and margins, in inches
pub const HEADER_WIDTH_IN: f32 = 3.46;
pub const HEADER_HEIGHT_IN: f32 = 0.781;
pub const HEADER_RIGHT_MARGIN_IN: f32 = 0.082;
pub const HEADER_TOP_MARGIN_IN: f32 = 0.20;

/// Watermark size as a fraction of the page
pub const WATERMARK_WIDTH_RATIO: f32 = 0.7;
pub const WATERMARK_HEIGHT_RATIO: f32 = 0.5;

/// Fill alpha used when drawing the watermark
pub const WATERMARK_OPACITY: f32 = 0.15;

/// Footer margin (left, right and bottom) and height, in inches
pub const FOOTER_MARGIN_IN: f32 = 0.1;
pub const FOOTER_HEIGHT_IN: f32 = 1.0;

/// Simple length type in points
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(pub f32);

impl Length {
    /// Create a length from points
    pub fn from_pt(pt: f32) -> Self {
        Length(pt)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f32) -> Self {
        Length(inches * POINTS_PER_INCH)
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f32 {
        self.0
    }

    /// Get the value in inches
    pub fn inches(&self) -> f32 {
        self.0 / POINTS_PER_INCH
    }
}

/// Axis-aligned rectangle anchored at its bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// X coordinate of the right edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Y coordinate of the top edge
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Visible page area taken from a page's MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left corner of the box
    pub left: f32,
    pub bottom: f32,
    pub width: Length,
    pub height: Length,
}

impl PageBox {
    /// Page box with its origin at (0, 0)
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            bottom: 0.0,
            width: Length::from_pt(width),
            height: Length::from_pt(height),
        }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(595.276, 841.89)
    }

    /// Build a page box from the four MediaBox numbers `[llx lly urx ury]`
    ///
    /// The corners may be given in any order. Returns `None` for a box without area.
    pub fn from_corners(corners: [f32; 4]) -> Option<Self> {
        let [x0, y0, x1, y1] = corners;
        let width = (x1 - x0).abs();
        let height = (y1 - y0).abs();
        if !(width > 0.0 && height > 0.0) {
            return None;
        }

        Some(Self {
            left: x0.min(x1),
            bottom: y0.min(y1),
            width: Length::from_pt(width),
            height: Length::from_pt(height),
        })
    }

    /// Same size, ignoring the origin
    pub fn same_size(&self, other: &PageBox) -> bool {
        (self.width.pt() - other.width.pt()).abs() < 0.01
            && (self.height.pt() - other.height.pt()).abs() < 0.01
    }
}

/// Header rectangle: fixed physical size, anchored to the top-right corner
pub fn header_rect(page: &PageBox) -> Rect {
    let width = Length::from_inches(HEADER_WIDTH_IN).pt();
    let height = Length::from_inches(HEADER_HEIGHT_IN).pt();
    let x = page.width.pt() - width - Length::from_inches(HEADER_RIGHT_MARGIN_IN).pt();
    let y = page.height.pt() - height - Length::from_inches(HEADER_TOP_MARGIN_IN).pt();

    Rect::new(x, y, width, height).offset(page.left, page.bottom)
}

/// Watermark rectangle: a fixed fraction of the page, centered on both axes
pub fn watermark_rect(page: &PageBox) -> Rect {
    let width = page.width.pt() * WATERMARK_WIDTH_RATIO;
    let height = page.height.pt() * WATERMARK_HEIGHT_RATIO;
    let x = (page.width.pt() - width) / 2.0;
    let y = (page.height.pt() - height) / 2.0;

    Rect::new(x, y, width, height).offset(page.left, page.bottom)
}

/// Footer rectangle: full width minus a uniform margin, fixed height, bottom-left anchored
pub fn footer_rect(page: &PageBox) -> Rect {
    let margin = Length::from_inches(FOOTER_MARGIN_IN).pt();
    let width = (page.width.pt() - 2.0 * margin).max(0.0);
    let height = Length::from_inches(FOOTER_HEIGHT_IN).pt();

    Rect::new(margin, margin, width, height).offset(page.left, page.bottom)
}

/// Placement of every stamped element on one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub header: Rect,
    pub watermark: Rect,
    pub footer: Rect,
}

impl OverlayLayout {
    /// Calculate where each element goes on a page of the given size
    pub fn for_page(page: &PageBox) -> Self {
        Self {
            header: header_rect(page),
            watermark: watermark_rect(page),
            footer: footer_rect(page),
        }
    }
}
