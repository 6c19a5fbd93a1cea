//! Component A: the storage reader.
//!
//! Opens the source store read-only and runs one fixed join query, falling
//! back to a simpler one on failure. No row is ever written back; the
//! connection is read-only at the SQLite level (`SQLITE_OPEN_READ_ONLY`)
//! and further pinned with `PRAGMA query_only`.

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::timestamp::core_data_to_unix;

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// The donor app's default macOS store location, used when no override is
/// given. Lives here rather than in the CLI binary so any embedder gets the
/// same fallback without re-deriving it.
fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Library/Group Containers/group.com.apple.notes/NoteStore.sqlite")
}

/// Configuration for a single list-and-render pass: which store to read and
/// how many rows to pull. Deliberately small — the library's real entry
/// points (`open_store`/`list_notes`) still take plain arguments; this just
/// gives callers like the CLI one place to assemble overrides with a
/// sensible default.
#[derive(Debug, Clone)]
pub struct ListConfig {
    pub store_path: PathBuf,
    pub limit: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        ListConfig {
            store_path: default_store_path(),
            limit: 50,
        }
    }
}

impl ListConfig {
    pub fn new(store_path: Option<PathBuf>, limit: u32) -> Self {
        ListConfig {
            store_path: store_path.unwrap_or_else(default_store_path),
            limit,
        }
    }
}

/// One row out of the source store. Immutable, self-contained, and cheap to
/// move: downstream stages take ownership and never reach back into the
/// connection.
#[derive(Debug, Clone)]
pub struct RawNote {
    pub note_id: i64,
    pub title: String,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub folder_name: Option<String>,
    /// Read off the same self-join as `folder_name`, at no extra query
    /// cost.
    pub account_name: Option<String>,
    pub body_blob: Option<Vec<u8>>,
    pub crypto_iv: Option<Vec<u8>>,
    pub crypto_tag: Option<Vec<u8>>,
}

/// A serializable, display-safe projection of [`RawNote`] for callers that
/// want structured output (the CLI's `--json` flag) instead of Markdown.
/// Deliberately excludes `body_blob`/`crypto_iv`/`crypto_tag`: raw note
/// bytes have no business leaving the process as JSON.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NoteSummary {
    pub note_id: i64,
    pub title: String,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub folder_name: Option<String>,
    pub account_name: Option<String>,
    pub has_body: bool,
}

impl From<&RawNote> for NoteSummary {
    fn from(raw: &RawNote) -> Self {
        NoteSummary {
            note_id: raw.note_id,
            title: raw.title.clone(),
            snippet: raw.snippet.clone(),
            created_at: raw.created_at,
            modified_at: raw.modified_at,
            folder_name: raw.folder_name.clone(),
            account_name: raw.account_name.clone(),
            has_body: raw.body_blob.is_some(),
        }
    }
}

/// A handle to an open, read-only store connection.
pub struct StoreHandle {
    conn: Connection,
    account_column: &'static str,
    modification_column: &'static str,
}

/// Candidate `ZACCOUNT*` columns, newest macOS schema revision first. Apple
/// has renamed this foreign key across releases:
/// 10.13-10.14 -> ZACCOUNT2, 10.15-11 -> ZACCOUNT3, 12 -> ZACCOUNT4, 13+ -> ZACCOUNT7.
const ACCOUNT_COLUMN_CANDIDATES: &[&str] = &["ZACCOUNT7", "ZACCOUNT4", "ZACCOUNT3", "ZACCOUNT2"];

/// Candidate modification-date columns. Some schema snapshots expose
/// `ZMODIFICATIONDATE1`, others only the un-suffixed `ZMODIFICATIONDATE`;
/// detected at open time rather than hardcoded, since the column name
/// drifts across schema versions.
const MODIFICATION_COLUMN_CANDIDATES: &[&str] = &["ZMODIFICATIONDATE1", "ZMODIFICATIONDATE"];

const NOTES_TABLE: &str = "ZICCLOUDSYNCINGOBJECT";

fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
    conn.prepare(&format!("PRAGMA table_info({table})"))
        .and_then(|mut stmt| {
            stmt.query_map([], |row| row.get::<_, String>(1))
                .map(|rows| rows.filter_map(Result::ok).collect())
        })
        .unwrap_or_default()
}

fn detect_column(columns: &[String], candidates: &[&'static str], default: &'static str) -> &'static str {
    for candidate in candidates {
        if columns.iter().any(|c| c == candidate) {
            return candidate;
        }
    }
    default
}

/// Open the store file read-only.
///
/// Fails with [`StoreError::NotFound`] if the path does not exist, or
/// [`StoreError::PermissionDenied`] if the open call is denied (locked by
/// another process, or a permission error such as macOS's Full Disk Access
/// gate).
pub fn open_store(path: impl AsRef<std::path::Path>) -> Result<StoreHandle, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::NotFound(path.display().to_string()));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("unable to open") || msg.contains("permission") || msg.contains("denied") {
            StoreError::PermissionDenied(msg)
        } else {
            StoreError::Sqlite(e)
        }
    })?;

    conn.execute_batch("PRAGMA query_only = ON;")?;
    conn.busy_timeout(std::time::Duration::from_millis(2000))?;

    let columns = table_columns(&conn, NOTES_TABLE);
    if columns.is_empty() {
        return Err(StoreError::SchemaMismatch(NOTES_TABLE.to_string()));
    }

    let account_column = detect_column(&columns, ACCOUNT_COLUMN_CANDIDATES, "ZACCOUNT2");
    let modification_column =
        detect_column(&columns, MODIFICATION_COLUMN_CANDIDATES, "ZMODIFICATIONDATE1");

    Ok(StoreHandle {
        conn,
        account_column,
        modification_column,
    })
}

/// Run the primary join query (falling back to a simpler one on failure)
/// and return up to `limit` rows, most recently modified first.
pub fn list_notes(handle: &StoreHandle, limit: u32) -> Result<Vec<RawNote>, StoreError> {
    match list_notes_primary(handle, limit) {
        Ok(notes) => Ok(notes),
        Err(e) => {
            warn!(error = %e, "primary notes query failed, falling back to simple query");
            list_notes_fallback(handle, limit).map_err(classify_query_error)
        }
    }
}

/// A query error surfaced after the fallback has also failed is either a
/// genuine schema mismatch (an expected column is missing entirely from
/// this store's schema version) or some other SQLite failure. There is no
/// further degradation path past the fallback query, so this distinction
/// is what the caller sees.
fn classify_query_error(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("no such column") || message.contains("no such table") {
        StoreError::SchemaMismatch(message)
    } else {
        StoreError::Sqlite(err)
    }
}

fn list_notes_primary(handle: &StoreHandle, limit: u32) -> Result<Vec<RawNote>, rusqlite::Error> {
    let query = format!(
        "SELECT
            n.Z_PK,
            n.ZTITLE1,
            n.ZSNIPPET,
            n.ZCREATIONDATE,
            n.{modification},
            f.ZTITLE2,
            a.ZNAME,
            nd.ZDATA,
            nd.ZCRYPTOINITIALIZATIONVECTOR,
            nd.ZCRYPTOTAG
        FROM {notes} n
        LEFT JOIN {notes} f ON n.ZFOLDER = f.Z_PK
        LEFT JOIN {notes} a ON n.{account} = a.Z_PK
        LEFT JOIN ZICNOTEDATA nd ON n.ZNOTEDATA = nd.Z_PK
        WHERE n.ZTITLE1 IS NOT NULL AND n.ZTITLE1 != ''
          AND (n.ZMARKEDFORDELETION IS NULL OR n.ZMARKEDFORDELETION = 0)
        ORDER BY n.{modification} DESC
        LIMIT ?1",
        notes = NOTES_TABLE,
        modification = handle.modification_column,
        account = handle.account_column,
    );

    let mut stmt = handle.conn.prepare(&query)?;
    let rows = stmt.query_map([limit], |row| {
        let note_id: i64 = row.get(0)?;
        let title: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
        let snippet: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
        let created_raw: f64 = row.get::<_, Option<f64>>(3)?.unwrap_or(0.0);
        let modified_raw: f64 = row.get::<_, Option<f64>>(4)?.unwrap_or(0.0);
        let folder_name: Option<String> = row.get(5)?;
        let account_name: Option<String> = row.get(6)?;
        let body_blob: Option<Vec<u8>> = row.get(7)?;
        let crypto_iv: Option<Vec<u8>> = row.get(8)?;
        let crypto_tag: Option<Vec<u8>> = row.get(9)?;

        Ok(RawNote {
            note_id,
            title,
            snippet,
            created_at: core_data_to_unix(created_raw),
            modified_at: core_data_to_unix(modified_raw),
            folder_name,
            account_name,
            body_blob: body_blob.filter(|b| !b.is_empty()),
            crypto_iv,
            crypto_tag,
        })
    })?;

    let mut notes = Vec::new();
    for row in rows {
        match row {
            Ok(note) => {
                debug!(note_id = note.note_id, "read note row");
                notes.push(note)
            }
            Err(e) => warn!(error = %e, "skipping unreadable note row"),
        }
    }
    Ok(notes)
}

/// Simpler fallback query: title/snippet only, empty bodies, wall-clock
/// timestamps. Used when the primary join fails (e.g. an unexpected schema
/// shape) so the caller still gets *something* rather than nothing.
fn list_notes_fallback(handle: &StoreHandle, limit: u32) -> Result<Vec<RawNote>, rusqlite::Error> {
    let query = format!(
        "SELECT Z_PK, ZTITLE1, ZSNIPPET
         FROM {notes}
         WHERE ZTITLE1 IS NOT NULL AND ZTITLE1 != ''
           AND (ZMARKEDFORDELETION IS NULL OR ZMARKEDFORDELETION = 0)
         ORDER BY {modification} DESC
         LIMIT ?1",
        notes = NOTES_TABLE,
        modification = handle.modification_column,
    );

    let mut stmt = handle.conn.prepare(&query)?;
    let now = Utc::now();
    let rows = stmt.query_map([limit], |row| {
        let note_id: i64 = row.get(0)?;
        let title: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
        let snippet: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
        Ok(RawNote {
            note_id,
            title,
            snippet,
            created_at: now,
            modified_at: now,
            folder_name: None,
            account_name: None,
            body_blob: None,
            crypto_iv: None,
            crypto_tag: None,
        })
    })?;

    let mut notes = Vec::new();
    for row in rows {
        match row {
            Ok(note) => notes.push(note),
            Err(e) => warn!(error = %e, "skipping unreadable note row in fallback query"),
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn seed_schema(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE ZICCLOUDSYNCINGOBJECT (
                Z_PK INTEGER PRIMARY KEY,
                ZTITLE1 TEXT,
                ZSNIPPET TEXT,
                ZCREATIONDATE REAL,
                ZMODIFICATIONDATE1 REAL,
                ZFOLDER INTEGER,
                ZACCOUNT2 INTEGER,
                ZNOTEDATA INTEGER,
                ZTITLE2 TEXT,
                ZNAME TEXT,
                ZMARKEDFORDELETION INTEGER
            );
            CREATE TABLE ZICNOTEDATA (
                Z_PK INTEGER PRIMARY KEY,
                ZDATA BLOB,
                ZCRYPTOINITIALIZATIONVECTOR BLOB,
                ZCRYPTOTAG BLOB
            );",
        )
        .unwrap();
    }

    #[test]
    fn rejects_missing_file() {
        let err = open_store("/nonexistent/path/NoteStore.sqlite").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn lists_notes_honoring_filters_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NoteStore.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            seed_schema(&conn);
            conn.execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT
                    (Z_PK, ZTITLE1, ZSNIPPET, ZCREATIONDATE, ZMODIFICATIONDATE1, ZMARKEDFORDELETION)
                 VALUES (1, 'First', 'hello', 0, 10, 0), (2, 'Second', 'world', 0, 20, 0),
                        (3, '', 'no title', 0, 30, 0), (4, 'Deleted', 'gone', 0, 40, 1)",
                [],
            )
            .unwrap();
        }

        let handle = open_store(&path).unwrap();
        let notes = list_notes(&handle, 50).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].title, "Second");
        assert_eq!(notes[1].title, "First");
    }

    #[test]
    fn missing_column_in_both_queries_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NoteStore.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            // ZSNIPPET is absent entirely: both the primary and fallback
            // queries reference it, so both fail the same way.
            conn.execute_batch(
                "CREATE TABLE ZICCLOUDSYNCINGOBJECT (
                    Z_PK INTEGER PRIMARY KEY,
                    ZTITLE1 TEXT,
                    ZCREATIONDATE REAL,
                    ZMODIFICATIONDATE1 REAL,
                    ZFOLDER INTEGER,
                    ZACCOUNT2 INTEGER,
                    ZNOTEDATA INTEGER,
                    ZTITLE2 TEXT,
                    ZNAME TEXT,
                    ZMARKEDFORDELETION INTEGER
                );
                CREATE TABLE ZICNOTEDATA (
                    Z_PK INTEGER PRIMARY KEY,
                    ZDATA BLOB,
                    ZCRYPTOINITIALIZATIONVECTOR BLOB,
                    ZCRYPTOTAG BLOB
                );",
            )
            .unwrap();
        }

        let handle = open_store(&path).unwrap();
        let err = list_notes(&handle, 50).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch(_)), "got {err:?}");
    }

    #[test]
    fn null_blob_becomes_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NoteStore.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            seed_schema(&conn);
            conn.execute(
                "INSERT INTO ZICCLOUDSYNCINGOBJECT
                    (Z_PK, ZTITLE1, ZSNIPPET, ZMODIFICATIONDATE1, ZMARKEDFORDELETION)
                 VALUES (1, 'No body', '', 0, 0)",
                [],
            )
            .unwrap();
        }
        let handle = open_store(&path).unwrap();
        let notes = list_notes(&handle, 50).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].body_blob.is_none());
    }
}
