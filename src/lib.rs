//! Read-only decoder for a proprietary notes application's on-disk store.
//!
//! Three stages, leaves-first: [`store`] opens the SQLite database and
//! yields [`RawNote`] rows; [`blob`] and [`decode`] turn a row's opaque
//! body blob into a [`Document`]; [`checklist`] and [`markdown`] turn that
//! `Document` into checklist items and a Markdown string, respectively.
//! Everything past the storage reader is a pure function of its inputs.

pub mod blob;
pub mod checklist;
pub mod decode;
pub mod error;
pub mod markdown;
mod proto;
pub mod store;
mod timestamp;

pub use checklist::{extract_checklists, ChecklistItem};
pub use decode::{decode_document, AttributeRun, Checklist, Document, Note, ParagraphStyle};
pub use error::{DecodeError, StoreError};
pub use markdown::{join_notes, to_markdown};
pub use store::{list_notes, open_store, ListConfig, NoteSummary, RawNote, StoreHandle};

use tracing::warn;

/// Preview text substituted for a note whose body could not be decoded by
/// any of the three protobuf attempts — typically a password-protected
/// note this crate makes no attempt to decrypt.
pub const UNDECODABLE_MARKER: &str = "[Encrypted Note - Cannot decrypt without password]";

/// Component B + C combined: decompress a note's body blob (if needed) and
/// decode it as a [`Document`]. A hard [`DecodeError`] here means all
/// three protobuf attempts failed — the caller decides whether to degrade
/// gracefully (see [`render_note`]) or propagate the failure.
pub fn decode_note(raw: &RawNote) -> Result<Document, DecodeError> {
    let blob = raw.body_blob.as_deref().unwrap_or(&[]);
    let canonical = blob::sniff_and_decompress(blob);
    decode::decode_document(&canonical)
}

/// Render one note to Markdown, degrading gracefully if the body can't be
/// decoded: the note still appears in the output with its snippet (or
/// [`UNDECODABLE_MARKER`] if the snippet is also empty) standing in for
/// content. Never fails.
pub fn render_note(raw: &RawNote) -> String {
    match decode_note(raw) {
        Ok(document) => {
            let note = document.note.unwrap_or_default();
            markdown::to_markdown(&note, &raw.title)
        }
        Err(e) => {
            warn!(note_id = raw.note_id, error = %e, "note undecodable, falling back to snippet");
            let content = if !raw.snippet.is_empty() {
                raw.snippet.clone()
            } else {
                UNDECODABLE_MARKER.to_string()
            };
            format!("# {}\n\n{}", raw.title, content)
        }
    }
}

/// Render a sequence of notes into one Markdown document, separated by the
/// multi-note separator.
pub fn render_notes<'a, I: IntoIterator<Item = &'a RawNote>>(raws: I) -> String {
    markdown::join_notes(raws.into_iter().map(render_note))
}
