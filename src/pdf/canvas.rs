//! Single-page overlay canvas
//!
//! The canvas records drawing operations for one page and finishes into a
//! standalone one-page document that can be merged onto a source page.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use crate::error::Result;
use crate::layout::{PageBox, Rect};
use crate::pdf::xobject::ImageXObject;

/// Drawing surface the size of one page
pub struct OverlayCanvas {
    page: PageBox,
    doc: Document,
    operations: Vec<Operation>,
    xobjects: Dictionary,
    ext_gstates: Dictionary,
}

impl OverlayCanvas {
    /// Create an empty canvas covering `page`
    pub fn new(page: PageBox) -> Self {
        Self {
            page,
            doc: Document::with_version("1.5"),
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            ext_gstates: Dictionary::new(),
        }
    }

    /// Draw `image` scaled to fill `rect`
    ///
    /// The image is registered under `name` the first time it is drawn; later
    /// draws with the same name reuse that XObject.
    pub fn draw_image(&mut self, name: &str, image: &ImageXObject, rect: Rect) {
        if !self.xobjects.has(name.as_bytes()) {
            let image_id = image.add_to(&mut self.doc);
            self.xobjects.set(name, Object::Reference(image_id));
        }

        // Images occupy the unit square, so the matrix scales it to the rectangle
        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new("cm", vec![
            Object::Real(rect.width),
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(rect.height),
            Object::Real(rect.x),
            Object::Real(rect.y),
        ]));
        self.operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
        self.operations.push(Operation::new("Q", vec![]));
    }

    /// Run `draw` with fill and stroke alpha set to `alpha`
    ///
    /// The graphics state is saved before and restored after, so the opacity
    /// never applies to anything drawn outside the closure.
    pub fn with_opacity<R>(&mut self, alpha: f32, draw: impl FnOnce(&mut Self) -> R) -> R {
        let alpha = alpha.clamp(0.0, 1.0);
        let name = format!("Alpha{:03}", (alpha * 1000.0).round() as u32);

        if !self.ext_gstates.has(name.as_bytes()) {
            let mut gs = Dictionary::new();
            gs.set("Type", Object::Name(b"ExtGState".to_vec()));
            gs.set("ca", Object::Real(alpha));
            gs.set("CA", Object::Real(alpha));
            let gs_id = self.doc.add_object(Object::Dictionary(gs));
            self.ext_gstates.set(name.as_str(), Object::Reference(gs_id));
        }

        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new("gs", vec![Object::Name(name.into_bytes())]));
        let result = draw(self);
        self.operations.push(Operation::new("Q", vec![]));

        result
    }

    /// Finish the canvas into a one-page document
    pub fn finish(self) -> Result<Document> {
        let Self { page, mut doc, operations, xobjects, ext_gstates } = self;

        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), content));

        let mut resources = Dictionary::new();
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        if !ext_gstates.is_empty() {
            resources.set("ExtGState", Object::Dictionary(ext_gstates));
        }

        let pages_id = doc.new_object_id();

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("MediaBox", Object::Array(vec![
            Object::Real(page.left),
            Object::Real(page.bottom),
            Object::Real(page.left + page.width.pt()),
            Object::Real(page.bottom + page.height.pt()),
        ]));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Reference(content_id));
        let page_id = doc.add_object(Object::Dictionary(page_dict));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(doc)
    }
}
