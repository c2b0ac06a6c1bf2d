//! PDF active-content sanitisation.
//!
//! Uploaded PDFs are parsed into an in-memory object graph, stripped of
//! embedded files and open-action scripts, and rewritten. Removal is
//! fail-closed: a script action that cannot be inspected rejects the whole
//! document. Each pass records a marker in the document information
//! dictionary so a cleaned file is distinguishable from an untouched one.

use lopdf::{Dictionary, Document, Object, ObjectId};

const SANITISED_KEY: &str = "Sanitised";
const MAX_REFERENCE_HOPS: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum PdfSanitiseError {
    #[error("PDF is damaged or could not be parsed: {0}")]
    Malformed(String),

    #[error("PDF contains javascript which cannot be removed")]
    UnremovableScript,

    #[error("PDF has no fields")]
    NoFormFields,

    #[error("sanitised PDF could not be rewritten: {0}")]
    Rewrite(String),
}

/// Per-category sanitisation profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfProfile {
    /// Reject documents without at least one fillable form field.
    pub require_form_fields: bool,
}

/// Run the full sanitisation pass over a PDF byte stream.
///
/// Returns the rewritten bytes, or the original bytes when no active
/// content was found. The parsed document never outlives the call.
pub fn sanitise_pdf(bytes: &[u8], profile: &PdfProfile) -> Result<Vec<u8>, PdfSanitiseError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| PdfSanitiseError::Malformed(e.to_string()))?;

    if profile.require_form_fields {
        check_has_form_fields(&doc)?;
    }

    let removed_structures = clean_embedded_files(&mut doc)?;
    let removed_script = clean_javascript(&mut doc)?;

    if removed_structures == 0 && !removed_script {
        return Ok(bytes.to_vec());
    }

    tracing::debug!(
        removed_structures = removed_structures,
        removed_script = removed_script,
        "stripped active content from PDF"
    );

    mark_sanitised(&mut doc);
    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)
        .map_err(|e| PdfSanitiseError::Rewrite(e.to_string()))?;
    Ok(out)
}

/// Remove the document-level embedded-file name tree and every
/// file-attachment annotation. Returns the number of structures removed.
pub fn clean_embedded_files(doc: &mut Document) -> Result<usize, PdfSanitiseError> {
    let mut removed = 0;
    let root_id = catalog_id(doc)?;

    enum NamesHolder {
        Inline,
        Indirect(ObjectId),
    }

    let holder = {
        let catalog = catalog_dict(doc, root_id)?;
        match catalog.get(b"Names") {
            Ok(Object::Reference(id)) => Some(NamesHolder::Indirect(*id)),
            Ok(Object::Dictionary(_)) => Some(NamesHolder::Inline),
            _ => None,
        }
    };

    match holder {
        Some(NamesHolder::Inline) => {
            let catalog = catalog_dict_mut(doc, root_id)?;
            if let Some(Object::Dictionary(mut names)) = catalog.remove(b"Names") {
                if names.remove(b"EmbeddedFiles").is_some() {
                    removed += 1;
                }
                if names.len() > 0 {
                    catalog.set("Names", names);
                }
            }
        }
        Some(NamesHolder::Indirect(id)) => {
            if let Ok(obj) = doc.get_object_mut(id) {
                if let Ok(names) = obj.as_dict_mut() {
                    if names.remove(b"EmbeddedFiles").is_some() {
                        removed += 1;
                    }
                }
            }
        }
        None => {}
    }

    removed += clean_attachment_annotations(doc);
    Ok(removed)
}

/// Drop every `FileAttachment` annotation from every page.
fn clean_attachment_annotations(doc: &mut Document) -> usize {
    enum AnnotsHolder {
        Page,
        Indirect(ObjectId),
    }

    let mut removed = 0;
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for page_id in pages {
        let filtered = {
            let page = match doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) {
                Some(dict) => dict,
                None => continue,
            };
            let (holder, annots) = match page.get(b"Annots") {
                Ok(Object::Reference(id)) => {
                    match doc.get_object(*id).ok().and_then(|o| o.as_array().ok()) {
                        Some(array) => (AnnotsHolder::Indirect(*id), array.clone()),
                        None => continue,
                    }
                }
                Ok(Object::Array(array)) => (AnnotsHolder::Page, array.clone()),
                _ => continue,
            };
            let kept: Vec<Object> = annots
                .iter()
                .filter(|entry| !is_file_attachment(doc, entry))
                .cloned()
                .collect();
            if kept.len() == annots.len() {
                continue;
            }
            removed += annots.len() - kept.len();
            (holder, kept)
        };

        match filtered {
            (AnnotsHolder::Page, kept) => {
                if let Ok(obj) = doc.get_object_mut(page_id) {
                    if let Ok(page) = obj.as_dict_mut() {
                        page.set("Annots", kept);
                    }
                }
            }
            (AnnotsHolder::Indirect(id), kept) => {
                if let Ok(obj) = doc.get_object_mut(id) {
                    if let Ok(array) = obj.as_array_mut() {
                        *array = kept;
                    }
                }
            }
        }
    }

    removed
}

fn is_file_attachment(doc: &Document, entry: &Object) -> bool {
    let annot = match resolve(doc, entry) {
        Ok(Object::Dictionary(dict)) => dict,
        _ => return false,
    };
    match annot.get(b"Subtype").ok().and_then(|o| resolve(doc, o).ok()) {
        Some(Object::Name(name)) => String::from_utf8_lossy(name) == "FileAttachment",
        _ => false,
    }
}

/// Remove a script registered as the document's open action.
///
/// Non-script open actions (destinations, `GoTo` and friends) are left in
/// place. An action that cannot be inspected is treated as an unremovable
/// script and rejects the document.
pub fn clean_javascript(doc: &mut Document) -> Result<bool, PdfSanitiseError> {
    let root_id = catalog_id(doc)?;

    let action = {
        let catalog = catalog_dict(doc, root_id)?;
        match catalog.get(b"OpenAction") {
            Ok(obj) => Some(obj.clone()),
            Err(_) => None,
        }
    };
    let action = match action {
        Some(action) => action,
        None => return Ok(false),
    };

    let is_script = match &action {
        // An array open action is a plain destination, never a script.
        Object::Array(_) => false,
        other => {
            let resolved =
                resolve(doc, other).map_err(|_| PdfSanitiseError::UnremovableScript)?;
            match resolved {
                Object::Dictionary(dict) => action_is_javascript(doc, dict)?,
                Object::Array(_) => false,
                _ => return Err(PdfSanitiseError::UnremovableScript),
            }
        }
    };

    if !is_script {
        return Ok(false);
    }

    let catalog = catalog_dict_mut(doc, root_id)?;
    catalog.remove(b"OpenAction");
    Ok(true)
}

fn action_is_javascript(doc: &Document, action: &Dictionary) -> Result<bool, PdfSanitiseError> {
    let action_type = match action.get(b"S") {
        Ok(obj) => obj,
        Err(_) => return Ok(false),
    };
    match resolve(doc, action_type) {
        Ok(Object::Name(name)) => {
            let name = String::from_utf8_lossy(name);
            Ok(name == "JavaScript" || name == "JS")
        }
        Ok(_) => Ok(false),
        Err(_) => Err(PdfSanitiseError::UnremovableScript),
    }
}

/// Require at least one entry in the interactive form's field array.
pub fn check_has_form_fields(doc: &Document) -> Result<(), PdfSanitiseError> {
    let root_id = catalog_id(doc)?;
    let catalog = catalog_dict(doc, root_id)?;

    let form = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_dict().ok());
    let fields = match form {
        Some(form) => form
            .get(b"Fields")
            .ok()
            .and_then(|obj| resolve(doc, obj).ok())
            .and_then(|obj| obj.as_array().ok()),
        None => None,
    };

    match fields {
        Some(fields) if !fields.is_empty() => Ok(()),
        _ => Err(PdfSanitiseError::NoFormFields),
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId, PdfSanitiseError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| PdfSanitiseError::Malformed(e.to_string()))
}

fn catalog_dict(doc: &Document, root_id: ObjectId) -> Result<&Dictionary, PdfSanitiseError> {
    doc.get_object(root_id)
        .and_then(Object::as_dict)
        .map_err(|e| PdfSanitiseError::Malformed(e.to_string()))
}

fn catalog_dict_mut(
    doc: &mut Document,
    root_id: ObjectId,
) -> Result<&mut Dictionary, PdfSanitiseError> {
    doc.get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfSanitiseError::Malformed(e.to_string()))
}

/// Follow indirect references to the underlying object, with a hop bound
/// so cyclic documents terminate.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, PdfSanitiseError> {
    let mut current = obj;
    let mut hops = 0;
    while let Object::Reference(id) = current {
        current = doc
            .get_object(*id)
            .map_err(|e| PdfSanitiseError::Malformed(e.to_string()))?;
        hops += 1;
        if hops > MAX_REFERENCE_HOPS {
            return Err(PdfSanitiseError::Malformed(
                "reference chain too deep".to_string(),
            ));
        }
    }
    Ok(current)
}

/// Record the sanitisation marker in the document information dictionary.
fn mark_sanitised(doc: &mut Document) {
    let info_ref = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(id) = info_ref {
        if let Ok(obj) = doc.get_object_mut(id) {
            if let Ok(info) = obj.as_dict_mut() {
                info.set(SANITISED_KEY, Object::string_literal("true"));
                return;
            }
        }
    }
    // Info is normally an indirect reference; tolerate an inline dictionary.
    if let Some(Object::Dictionary(mut info)) = doc.trailer.remove(b"Info") {
        info.set(SANITISED_KEY, Object::string_literal("true"));
        doc.trailer.set("Info", info);
        return;
    }
    let mut info = Dictionary::new();
    info.set(SANITISED_KEY, Object::string_literal("true"));
    let id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(id));
}
