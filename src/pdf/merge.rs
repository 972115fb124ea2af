//! Overlay merging functionality using lopdf
//!
//! An overlay is a one-page document. Merging copies its content and the objects
//! that content needs into the target document, then appends the content to the
//! target page so it is drawn on top of the original.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::pdf::metadata::{inherited_attribute, resolve};

/// Operators whose first operand names a page resource, with the resource category
const RESOURCE_OPERATORS: &[(&str, &[u8])] = &[
    ("Do", b"XObject"),
    ("gs", b"ExtGState"),
    ("Tf", b"Font"),
    ("cs", b"ColorSpace"),
    ("CS", b"ColorSpace"),
    ("sh", b"Shading"),
];

/// Depth limit for fingerprinting nested objects
const MAX_FINGERPRINT_DEPTH: usize = 32;

/// Merges overlay pages onto pages of a target document
///
/// Resources imported for one page are remembered, so merging the same image
/// onto every page stores it in the target document only once.
#[derive(Debug, Default)]
pub struct OverlayMerger {
    imported: HashMap<(Vec<u8>, u64), ObjectId>,
}

impl OverlayMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct resources imported so far
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    /// Merge the first page of `overlay` onto `page_id` of `target`
    ///
    /// The original content is wrapped in `q`/`Q` so any transformation it leaves
    /// behind cannot move the overlay, and the overlay content is appended after it.
    pub fn merge_page(&mut self, target: &mut Document, page_id: ObjectId, overlay: &Document) -> Result<()> {
        let overlay_page_id = overlay
            .get_pages()
            .into_values()
            .next()
            .ok_or_else(|| Error::General("Overlay document has no pages".to_string()))?;

        let overlay_resources = match inherited_attribute(overlay, overlay_page_id, b"Resources")? {
            Some(res) => resolve(overlay, res).as_dict().cloned().unwrap_or_else(|_| Dictionary::new()),
            None => Dictionary::new(),
        };
        let mut operations = Content::decode(&overlay.get_page_content(overlay_page_id)?)?;

        let mut resources = effective_resources(target, page_id)?;
        let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut renames: HashMap<(Vec<u8>, Vec<u8>), Vec<u8>> = HashMap::new();

        // Merge each resource type (XObject, ExtGState, Font, etc.)
        for (category, entries) in overlay_resources.iter() {
            let entries = match resolve(overlay, entries) {
                Object::Dictionary(dict) => dict,
                // ProcSet and other non-dictionary entries are only kept if missing
                other => {
                    if !resources.has(category) {
                        resources.set(category.clone(), import_object(overlay, target, other, &mut id_map));
                    }
                    continue;
                }
            };

            let mut merged = match resources.get(category) {
                Ok(existing) => resolve(target, existing).as_dict().cloned().unwrap_or_else(|_| Dictionary::new()),
                Err(_) => Dictionary::new(),
            };

            for (name, value) in entries.iter() {
                let object = self.import_resource(overlay, target, category, value, &mut id_map);
                let final_name = unique_name(&merged, name, &object);
                if &final_name != name {
                    renames.insert((category.clone(), name.clone()), final_name.clone());
                }
                merged.set(final_name, object);
            }

            resources.set(category.clone(), Object::Dictionary(merged));
        }

        if !renames.is_empty() {
            rename_operands(&mut operations, &renames);
        }

        let save_id = target.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore_id = target.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
        let overlay_id = target.add_object(Stream::new(Dictionary::new(), operations.encode()?));

        wrap_page_contents(target, page_id, save_id, restore_id, overlay_id)?;

        // Set the Resources directly on the page so it owns the merged copy
        target
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));

        Ok(())
    }

    /// Import one named resource, reusing an identical resource from an earlier page
    fn import_resource(
        &mut self,
        overlay: &Document,
        target: &mut Document,
        category: &[u8],
        value: &Object,
        id_map: &mut HashMap<ObjectId, ObjectId>,
    ) -> Object {
        let Object::Reference(_) = value else {
            return import_object(overlay, target, value, id_map);
        };

        let key = (category.to_vec(), fingerprint(overlay, value));
        if let Some(id) = self.imported.get(&key) {
            return Object::Reference(*id);
        }

        let object = import_object(overlay, target, value, id_map);
        if let Object::Reference(id) = object {
            self.imported.insert(key, id);
        }
        object
    }
}

/// The resources a page currently uses, as an owned dictionary
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    Ok(match inherited_attribute(doc, page_id, b"Resources")? {
        Some(res) => resolve(doc, res).as_dict().cloned().unwrap_or_else(|_| Dictionary::new()),
        None => Dictionary::new(),
    })
}

/// Pick a resource name that does not clash with a different object already in `dict`
fn unique_name(dict: &Dictionary, name: &[u8], object: &Object) -> Vec<u8> {
    let mut candidate = name.to_vec();
    let mut suffix = 1;

    while let Ok(existing) = dict.get(&candidate) {
        if existing == object {
            break;
        }
        candidate = [name, format!("_{}", suffix).as_bytes()].concat();
        suffix += 1;
    }

    candidate
}

/// Point resource operands at their renamed resources
///
/// `renames` is keyed by (category, old name), so only operators that use the
/// renamed category are touched.
fn rename_operands(content: &mut Content, renames: &HashMap<(Vec<u8>, Vec<u8>), Vec<u8>>) {
    for operation in content.operations.iter_mut() {
        let category = match RESOURCE_OPERATORS.iter().find(|(op, _)| *op == operation.operator) {
            Some((_, category)) => *category,
            None => continue,
        };
        if let Some(Object::Name(name)) = operation.operands.first_mut() {
            if let Some(new_name) = renames.get(&(category.to_vec(), name.clone())) {
                *name = new_name.clone();
            }
        }
    }
}

/// Copy `object` and every object it references from `source` into `target`
///
/// `id_map` records objects already copied from `source`, so shared objects are
/// copied once per source document.
fn import_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    id_map: &mut HashMap<ObjectId, ObjectId>,
) -> Object {
    let mut pending = Vec::new();
    collect_references(object, &mut pending);

    let mut copied = Vec::new();
    while let Some(old_id) = pending.pop() {
        if id_map.contains_key(&old_id) {
            continue;
        }
        id_map.insert(old_id, target.new_object_id());
        copied.push(old_id);
        if let Ok(referenced) = source.get_object(old_id) {
            collect_references(referenced, &mut pending);
        }
    }

    for old_id in copied {
        let new_object = match source.get_object(old_id) {
            Ok(referenced) => remapped(referenced, id_map),
            Err(_) => Object::Null,
        };
        target.objects.insert(id_map[&old_id], new_object);
    }

    remapped(object, id_map)
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(arr) => arr.iter().for_each(|obj| collect_references(obj, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, obj)| collect_references(obj, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, obj)| collect_references(obj, out)),
        _ => {}
    }
}

/// Clone `object` with every reference pointing at its copy in the target document
///
/// References missing from `id_map` are left as they are.
fn remapped(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    let mut object = object.clone();
    remap_in_place(&mut object, id_map);
    object
}

fn remap_in_place(object: &mut Object, id_map: &HashMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(&new_id) = id_map.get(id) {
                *id = new_id;
            }
        }
        Object::Array(items) => items.iter_mut().for_each(|item| remap_in_place(item, id_map)),
        Object::Dictionary(dict) => dict.iter_mut().for_each(|(_, value)| remap_in_place(value, id_map)),
        Object::Stream(stream) => stream.dict.iter_mut().for_each(|(_, value)| remap_in_place(value, id_map)),
        _ => {}
    }
}

/// Hash an object together with everything it references
fn fingerprint(doc: &Document, object: &Object) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_object(doc, object, &mut hasher, 0);
    hasher.finish()
}

fn hash_object(doc: &Document, object: &Object, hasher: &mut DefaultHasher, depth: usize) {
    if depth > MAX_FINGERPRINT_DEPTH {
        return;
    }

    match object {
        Object::Null => hasher.write_u8(0),
        Object::Boolean(b) => {
            hasher.write_u8(1);
            hasher.write_u8(*b as u8);
        }
        Object::Integer(i) => {
            hasher.write_u8(2);
            hasher.write_i64(*i);
        }
        Object::Real(r) => {
            hasher.write_u8(3);
            hasher.write_u32(r.to_bits());
        }
        Object::Name(name) => {
            hasher.write_u8(4);
            hasher.write(name);
        }
        Object::String(bytes, _) => {
            hasher.write_u8(5);
            hasher.write(bytes);
        }
        Object::Array(arr) => {
            hasher.write_u8(6);
            for item in arr {
                hash_object(doc, item, hasher, depth + 1);
            }
        }
        Object::Dictionary(dict) => {
            hasher.write_u8(7);
            hash_dictionary(doc, dict, hasher, depth);
        }
        Object::Stream(stream) => {
            hasher.write_u8(8);
            hash_dictionary(doc, &stream.dict, hasher, depth);
            hasher.write(&stream.content);
        }
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(referenced) => hash_object(doc, referenced, hasher, depth + 1),
            Err(_) => hasher.write_u8(9),
        },
    }
}

fn hash_dictionary(doc: &Document, dict: &Dictionary, hasher: &mut DefaultHasher, depth: usize) {
    for (key, value) in dict.iter() {
        // Length is derived from the content and may differ between equal streams
        if key.as_slice() == b"Length" {
            continue;
        }
        hasher.write(key);
        hash_object(doc, value, hasher, depth + 1);
    }
}

/// Rewrite a page's Contents as `[save, original streams..., restore, overlay]`
///
/// An indirect Contents array is flattened into the new direct array, since a
/// Contents array may only hold stream references.
fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    save_id: ObjectId,
    restore_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<()> {
    let original = original_content_streams(doc, page_id)?;

    let mut contents = Vec::with_capacity(original.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(original);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// The stream entries of a page's Contents, whichever form it takes
fn original_content_streams(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let contents = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    Ok(match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Stream(_)) => vec![contents.clone()],
            Ok(other) => {
                log::warn!("Ignoring Contents of page {:?}: unexpected {}", page_id, other.enum_variant());
                Vec::new()
            }
            Err(e) => {
                log::warn!("Ignoring unresolvable Contents of page {:?}: {}", page_id, e);
                Vec::new()
            }
        },
        other => {
            log::warn!("Ignoring Contents of page {:?}: unexpected {}", page_id, other.enum_variant());
            Vec::new()
        }
    })
}
