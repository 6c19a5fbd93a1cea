//! Error taxonomy for the storage reader and protobuf decoder.
//!
//! The Markdown reconstructor and checklist extractor are pure and never
//! fail; only opening the store and decoding a blob can produce a hard
//! error.

use thiserror::Error;

/// Failures from component A, the storage reader.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file does not exist at the given path.
    #[error("notes store not found at {0}")]
    NotFound(String),

    /// The file exists but the open call was denied (permissions, or an
    /// exclusive lock held by another process).
    #[error("cannot open notes store: {0}")]
    PermissionDenied(String),

    /// A required column is missing from both the primary and fallback
    /// query. Fatal: there is no further degradation path.
    #[error("notes store schema is missing expected column(s): {0}")]
    SchemaMismatch(String),

    /// The primary query, and then the fallback query, both failed.
    #[error("notes store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Failure from component C, the protobuf decoder.
///
/// This is the only error the decoder can return; it is recoverable at the
/// pipeline level (the caller degrades to a snippet-only note, see
/// [`crate::render_note`]), so it carries diagnostics rather than being a
/// hard failure mode for the whole pipeline.
#[derive(Debug, Error)]
#[error("could not decode note body as NoteStoreProto, Document, or Note: {container}, {document}, {note}")]
pub struct DecodeError {
    pub(crate) container: prost::DecodeError,
    pub(crate) document: prost::DecodeError,
    pub(crate) note: prost::DecodeError,
}
