//! Page import from source PDFs into the output document.
//!
//! This module handles page-level operations including:
//! - Resolving attributes pages inherit from their page tree
//! - Moving source object ids above the target's
//! - Re-parenting pages under the output page tree
//! - Copying every object a page references

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{PdfBinderError, Result};

/// Page attributes that may be inherited from an ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Load a PDF from memory, decrypting it with an empty password if needed.
///
/// A failed decryption is logged and ignored; page import decides whether
/// the document is usable.
pub fn load_source(bytes: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(bytes)?;

    if doc.is_encrypted() {
        match doc.decrypt("") {
            Ok(()) => debug!("Decrypted source with empty password"),
            Err(e) => debug!(error = %e, "Source stays encrypted"),
        }
    }

    Ok(doc)
}

/// Copy every page of `source`, in order, under the `Pages` node `parent_id`
/// of `target`.
///
/// Returns the new page ids in source order. Nothing is added to the parent's
/// `Kids`; that is left to the caller.
///
/// # Errors
///
/// Returns an error if the source has no pages or its page tree is broken.
pub fn import_pages(
    target: &mut Document,
    parent_id: ObjectId,
    mut source: Document,
) -> Result<Vec<ObjectId>> {
    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    if source_pages.is_empty() {
        return Err(PdfBinderError::other("PDF has no pages"));
    }

    for &page_id in &source_pages {
        resolve_inherited(&mut source, page_id)?;
    }

    // Ids must not collide with anything already in the target.
    source.renumber_objects_with(target.max_id + 1);
    target.max_id = target.max_id.max(source.max_id);

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    for &page_id in &page_ids {
        let mut page = source.get_dictionary(page_id)?.clone();
        page.set("Parent", parent_id);
        target.objects.insert(page_id, Object::Dictionary(page));
    }

    for &page_id in &page_ids {
        let page = source.get_dictionary(page_id)?;
        for (key, value) in page.iter() {
            if key.as_slice() != b"Parent" {
                copy_references(target, &source, value);
            }
        }
    }

    Ok(page_ids)
}

/// Copy attributes a page inherits from its ancestors onto the page itself.
///
/// Once re-parented, the page no longer sees its original tree, so anything
/// it relied on has to live on the page dictionary.
pub fn resolve_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE
        .into_iter()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = parent_of(page);

    let mut inherited = Vec::new();
    let mut visited = HashSet::new();

    while let Some(node_id) = parent {
        if missing.is_empty() || !visited.insert(node_id) {
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };

        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = parent_of(node);
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

fn parent_of(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(|p| p.as_reference()).ok()
}

/// Copy object references from one PDF document to another.
///
/// If `obj` is a reference, this walks the structure recursively and inserts
/// missing referenced objects into the `target` document. The `Parent` link
/// of page tree nodes is not followed, so a source's own page tree never
/// leaks into the output.
pub fn copy_references(target: &mut Document, source: &Document, obj: &Object) {
    match obj {
        Object::Reference(ref_id) => {
            if !target.objects.contains_key(ref_id)
                && let Ok(referenced_obj) = source.get_object(*ref_id)
            {
                target.objects.insert(*ref_id, referenced_obj.clone());
                copy_references(target, source, referenced_obj);
            }
        }
        Object::Dictionary(dict) => copy_dictionary_references(target, source, dict),
        Object::Array(arr) => {
            for item in arr {
                copy_references(target, source, item);
            }
        }
        Object::Stream(stream) => copy_dictionary_references(target, source, &stream.dict),
        _ => {}
    }
}

fn copy_dictionary_references(target: &mut Document, source: &Document, dict: &Dictionary) {
    let is_tree_node = matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
    );

    for (key, value) in dict.iter() {
        if is_tree_node && key.as_slice() == b"Parent" {
            continue;
        }
        copy_references(target, source, value);
    }
}
