//! Component C: the protobuf decoder.
//!
//! A canonical (post-decompression) buffer is tried as three alternative
//! messages, in order, and the first success wins. Unknown fields are
//! skipped automatically by `prost`'s generated code; we never need to do
//! that ourselves.

use prost::Message;

use crate::error::DecodeError;
use crate::proto;

pub use proto::{AttributeRun, Checklist, Document, Note, ParagraphStyle};

/// Try, in order: outer container (`NoteStoreProto.document`), bare
/// `Document`, bare `Note`. Returns the first attempt that both parses
/// *and* yields a present `note` — a `Document`/`Note` message that parses
/// but is functionally empty is not treated as a success, since a
/// successfully decoded note always has its `note` field present.
pub fn decode_document(bytes: &[u8]) -> Result<Document, DecodeError> {
    let container_err = match proto::NoteStoreProto::decode(bytes) {
        Ok(store) => match store.document {
            Some(doc) if doc.note.is_some() => return Ok(doc),
            _ => prost::DecodeError::new("NoteStoreProto decoded without document.note"),
        },
        Err(e) => e,
    };

    let document_err = match Document::decode(bytes) {
        Ok(doc) if doc.note.is_some() => return Ok(doc),
        Ok(_) => prost::DecodeError::new("Document decoded without note"),
        Err(e) => e,
    };

    let note_err = match Note::decode(bytes) {
        Ok(note) => {
            return Ok(Document {
                version: None,
                note: Some(note),
            })
        }
        Err(e) => e,
    };

    Err(DecodeError {
        container: container_err,
        document: document_err,
        note: note_err,
    })
}
