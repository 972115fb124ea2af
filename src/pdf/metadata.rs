//! PDF page metadata: page counts and page boxes

use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Resource, Result};
use crate::layout::PageBox;

/// Page tree depth after which inheritance lookups give up (guards against cycles)
const MAX_TREE_DEPTH: usize = 64;

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::missing(Resource::InputPdf, path));
    }

    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len();

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

/// Read the MediaBox of a page, following inheritance through the page tree
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
        .ok_or_else(|| Error::InvalidPageBox(format!("page {:?} has no MediaBox", page_id)))?;

    let numbers = resolve(doc, media_box)
        .as_array()
        .map_err(|_| Error::InvalidPageBox(format!("MediaBox of page {:?} is not an array", page_id)))?
        .iter()
        .map(|n| resolve(doc, n).as_float())
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|_| Error::InvalidPageBox(format!("MediaBox of page {:?} is not numeric", page_id)))?;

    let corners: [f32; 4] = numbers
        .try_into()
        .map_err(|_| Error::InvalidPageBox(format!("MediaBox of page {:?} needs 4 numbers", page_id)))?;

    PageBox::from_corners(corners)
        .ok_or_else(|| Error::InvalidPageBox(format!("MediaBox of page {:?} has no area", page_id)))
}

/// Look up a page attribute, walking up the Parent chain when the page does not set it
///
/// MediaBox and Resources are inheritable, so a page may carry neither itself.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut node: &Dictionary = doc.get_dictionary(page_id)?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node = doc.get_dictionary(*parent_id)?,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Follow a reference to its target object; other objects are returned as-is
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}
