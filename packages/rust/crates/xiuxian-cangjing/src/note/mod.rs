//! Note model, parsing, scanning and the indexed store.

pub mod models;
pub mod parser;
pub mod resolve;
pub mod scan;
pub mod snapshot;
mod store;

pub use models::{FieldRef, IndexOutcome, LoadReport, MatchKind, NoteDocument, Resolution};
pub use parser::parse_note;
pub use resolve::{LookupTables, clean_reference};
pub use scan::{ScanPolicy, ScannedFile, filter_paths, scan_notes};
pub use snapshot::{INDEX_SNAPSHOT_SCHEMA_VERSION, IndexSnapshot, SnapshotDocument};
pub use store::{NoteStore, ReindexSinceReport};
