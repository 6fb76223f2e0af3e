// SPDX-License-Identifier: MIT
//
// PDF lock/unlock: rebuild the container page-by-page with `lopdf`, then
// apply or strip standard-security-handler encryption.
//
// Lock always rebuilds a fresh document: every page of the source is
// deep-cloned, in order, into a new page tree before the encryption
// dictionary is attached. Unlock decrypts in place (wrong password is an
// authorization-class error) and re-serialises through the same rebuild,
// so the output is a clean container either way.

use std::collections::HashMap;

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use vellum_core::error::{Result, VellumError};

/// Key length for the standard security handler (RC4, revision 3).
const KEY_LENGTH_BITS: usize = 128;

/// Encrypt a PDF with the given password used as both user and owner
/// password, at 128-bit key strength.
#[instrument(skip_all, fields(input_len = bytes.len()))]
pub fn lock(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let source = load(bytes)?;
    let mut rebuilt = rebuild(&source)?;

    let permissions = Permissions::all();
    let version = EncryptionVersion::V2 {
        document: &rebuilt,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH_BITS,
        permissions,
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| VellumError::Internal(format!("failed to build encryption state: {err}")))?;
    rebuilt
        .encrypt(&state)
        .map_err(|err| VellumError::Internal(format!("failed to encrypt PDF: {err}")))?;

    let output = save(rebuilt)?;
    info!(output_len = output.len(), "PDF locked");
    Ok(output)
}

/// Decrypt a PDF with the given password and re-serialise the plaintext
/// content.
///
/// A wrong password fails with [`VellumError::InvalidPassword`]. An input
/// that was never encrypted is a no-op page-copy re-serialisation: the
/// pages come back unchanged, just in a fresh container.
#[instrument(skip_all, fields(input_len = bytes.len()))]
pub fn unlock(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut source = load(bytes)?;

    if source.is_encrypted() {
        source.decrypt(password).map_err(|err| {
            debug!(%err, "PDF decryption rejected");
            VellumError::InvalidPassword
        })?;
        // The encryption dictionary must not survive into the plaintext
        // serialisation.
        source.trailer.remove(b"Encrypt");
        debug!("PDF decrypted");
    } else {
        debug!("PDF not encrypted, unlock is a re-serialisation");
    }

    let rebuilt = rebuild(&source)?;
    let output = save(rebuilt)?;
    info!(output_len = output.len(), "PDF unlocked");
    Ok(output)
}

// -- Container rebuild --------------------------------------------------------

fn load(bytes: &[u8]) -> Result<Document> {
    let document = Document::load_mem(bytes)
        .map_err(|err| VellumError::Internal(format!("failed to load PDF: {err}")))?;
    debug!(pages = document.get_pages().len(), "PDF loaded");
    Ok(document)
}

fn save(mut document: Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| VellumError::Internal(format!("failed to serialise PDF: {err}")))?;
    Ok(output)
}

/// Copy every page of `source`, in page order, into a brand-new document
/// with its own page tree, catalog, and file ID. No page is skipped,
/// duplicated, or reordered.
fn rebuild(source: &Document) -> Result<Document> {
    let mut target = Document::with_version("1.5");
    let pages_id = target.new_object_id();

    let source_pages = source.get_pages();
    let mut page_numbers: Vec<u32> = source_pages.keys().copied().collect();
    page_numbers.sort_unstable();

    let mut visited: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut kids: Vec<Object> = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        let page_id = source_pages[&page_number];
        let page_object = source.get_object(page_id).map_err(|err| {
            VellumError::Internal(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        // Register the page before descending so back-references to it
        // (annotation /P entries) resolve to the new ID instead of
        // re-entering the clone.
        let new_id = target.new_object_id();
        visited.insert(page_id, new_id);
        let cloned = deep_clone_object(source, &mut target, &mut visited, page_object);
        target.objects.insert(new_id, cloned);
        if let Ok(Object::Dictionary(page_dict)) = target.get_object_mut(new_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }
        kids.push(Object::Reference(new_id));
    }

    let count = kids.len() as i64;
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(count),
        }),
    );

    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    target.trailer.set("Root", Object::Reference(catalog_id));

    // The standard security handler keys off the first half of /ID, so the
    // fresh container needs one before encryption.
    let file_id = Uuid::new_v4().as_bytes().to_vec();
    target.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.clone(), lopdf::StringFormat::Hexadecimal),
            Object::String(file_id, lopdf::StringFormat::Hexadecimal),
        ]),
    );

    Ok(target)
}

/// Deep-clone a single lopdf object, recursively resolving references.
///
/// `visited` maps source object IDs to their target IDs, so every source
/// object is cloned exactly once: a reference to an object already seen
/// resolves to the existing target ID. Annotated pages carry /P entries
/// pointing back at their page, so the object graph of real uploads is
/// cyclic; the map is what keeps the clone finite. It also means shared
/// resources (fonts, XObjects) stay shared instead of being duplicated
/// per referencing page. /Parent is deliberately skipped: the caller
/// patches it to point at the new page tree.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    visited: &mut HashMap<ObjectId, ObjectId>,
    object: &Object,
) -> Object {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, visited, value);
                new_dict.set(key.clone(), cloned_value);
            }
            Object::Dictionary(new_dict)
        }
        Object::Array(arr) => Object::Array(
            arr.iter()
                .map(|item| deep_clone_object(source, target, visited, item))
                .collect(),
        ),
        Object::Reference(ref_id) => {
            if let Some(mapped) = visited.get(ref_id) {
                return Object::Reference(*mapped);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    visited.insert(*ref_id, new_id);
                    let cloned = deep_clone_object(source, target, visited, referenced);
                    target.objects.insert(new_id, cloned);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "cannot resolve reference, using Null");
                    Object::Null
                }
            }
        }
        Object::Stream(stream) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, visited, value);
                new_dict.set(key.clone(), cloned_value);
            }
            Object::Stream(lopdf::Stream::new(new_dict, stream.content.clone()))
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small n-page PDF with distinct content per page.
    fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });

        let mut kids: Vec<Object> = Vec::new();
        for index in 0..pages {
            let content = format!("BT /F1 24 Tf 72 700 Td (Page {}) Tj ET", index + 1);
            let content_id = doc.add_object(lopdf::Stream::new(
                lopdf::Dictionary::new(),
                content.into_bytes(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
                "Contents" => Object::Reference(content_id),
                "Resources" => Object::Reference(resources_id),
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(kids),
                "Count" => Object::Integer(pages as i64),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("sample PDF must serialise");
        out
    }

    fn page_content(doc: &Document, page_number: u32) -> String {
        let pages = doc.get_pages();
        let page_id = pages[&page_number];
        let content = doc.get_page_content(page_id).expect("page content");
        String::from_utf8_lossy(&content).to_string()
    }

    /// One-page PDF whose page carries a link annotation pointing back at
    /// the page through /P, the standard layout of annotated documents.
    fn annotated_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let content_id = doc.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            b"BT /F1 12 Tf 72 700 Td (Annotated) Tj ET".to_vec(),
        ));
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => Object::Array(vec![
                Object::Integer(72),
                Object::Integer(690),
                Object::Integer(144),
                Object::Integer(710),
            ]),
            "P" => Object::Reference(page_id),
        });
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "Annots" => Object::Array(vec![Object::Reference(annot_id)]),
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(vec![Object::Reference(page_id)]),
                "Count" => Object::Integer(1),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("annotated PDF must serialise");
        out
    }

    #[test]
    fn lock_produces_encrypted_container() {
        let original = sample_pdf(2);
        let locked = lock(&original, "hunter2").expect("lock failed");

        assert_ne!(locked, original);
        let doc = Document::load_mem(&locked).expect("locked output must parse");
        assert!(doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn unlock_round_trips_pages_in_order() {
        let original = sample_pdf(3);
        let locked = lock(&original, "s3cret").expect("lock failed");
        let unlocked = unlock(&locked, "s3cret").expect("unlock failed");

        let doc = Document::load_mem(&unlocked).expect("unlocked output must parse");
        assert!(!doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 3);
        for page in 1..=3u32 {
            assert!(
                page_content(&doc, page).contains(&format!("Page {page}")),
                "page {page} content out of order"
            );
        }
    }

    #[test]
    fn wrong_password_is_invalid_password() {
        let locked = lock(&sample_pdf(1), "correct").expect("lock failed");
        let err = unlock(&locked, "incorrect").unwrap_err();
        assert!(
            matches!(err, VellumError::InvalidPassword),
            "expected InvalidPassword, got {err:?}"
        );
    }

    #[test]
    fn unlock_of_plain_pdf_is_noop_reserialisation() {
        let original = sample_pdf(2);
        let unlocked = unlock(&original, "whatever").expect("unlock failed");

        let doc = Document::load_mem(&unlocked).expect("output must parse");
        assert!(!doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 2);
        assert!(page_content(&doc, 1).contains("Page 1"));
    }

    #[test]
    fn annotation_back_reference_round_trips() {
        let original = annotated_pdf();
        let locked = lock(&original, "hunter2").expect("lock of annotated PDF failed");
        let unlocked = unlock(&locked, "hunter2").expect("unlock of annotated PDF failed");

        let doc = Document::load_mem(&unlocked).expect("output must parse");
        assert_eq!(doc.get_pages().len(), 1);

        // The /P back-reference must resolve to the rebuilt page itself.
        let page_id = doc.get_pages()[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let annot_id = annots[0].as_reference().unwrap();
        let annot = doc.get_object(annot_id).unwrap().as_dict().unwrap();
        assert_eq!(annot.get(b"P").unwrap().as_reference().unwrap(), page_id);
    }

    #[test]
    fn shared_resources_are_cloned_once() {
        // All pages of the fixture reference one Resources dictionary;
        // the rebuild must keep it shared rather than duplicating it per
        // page.
        let unlocked = unlock(&sample_pdf(3), "whatever").expect("unlock failed");
        let doc = Document::load_mem(&unlocked).expect("output must parse");

        let font_dicts = doc
            .objects
            .values()
            .filter(|object| {
                matches!(object, Object::Dictionary(dict) if dict.get(b"BaseFont").is_ok())
            })
            .count();
        assert_eq!(font_dicts, 1);
    }

    #[test]
    fn garbage_input_is_internal_error() {
        let err = lock(b"not a pdf at all", "password").unwrap_err();
        assert!(matches!(err, VellumError::Internal(_)));
    }
}
