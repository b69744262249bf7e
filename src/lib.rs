//! Tag Updater: locate and update release tags in YAML documents
//!
//! Documents are parsed into an arena-backed tree that remembers positions
//! and comments, tag-like fields are found by a pluggable heuristic, and the
//! edited tree is re-emitted with a configured indentation.
//!
//! # Architecture
//!
//! - [`yaml`] parses, locates, edits and emits documents. It never touches
//!   the filesystem.
//! - [`store`] owns every disk access: validated reads, atomic writes,
//!   timestamped backups, rollback and backup retention.
//! - [`updater`] ties the two together behind [`Updater`].
//!
//! # Safety
//!
//! - Every path goes through [`PathValidator`] before any I/O
//! - Writes go through a sibling temp file, `fsync` and a rename
//! - Backups are write-once and never overwrite an existing file
//! - Rollback validates the backup before touching the live file
//! - Updated documents are re-parsed before they are written
//!
//! # Example
//!
//! ```no_run
//! use tag_updater::{TagPath, UpdateRequest, Updater};
//!
//! let updater = Updater::new();
//! let request = UpdateRequest::new("/tmp/deploy/values.yaml", "v1.4.0")
//!     .tag_path(TagPath::parse("image.tag").unwrap());
//!
//! match updater.update_tag_in_file(&request) {
//!     Ok(result) => println!("changed: {}", result.changes_detected),
//!     Err(e) => eprintln!("update failed: {}", e),
//! }
//! ```

pub mod config;
pub mod error;
pub mod safety;
pub mod store;
pub mod updater;
pub mod yaml;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, ParserConfig, UpdaterConfig};
pub use error::ErrorKind;
pub use safety::{PathValidator, SecurityError};
pub use store::{FileStore, FileSystem, StdFileSystem, StoreError};
pub use updater::{detect_tag_path, Stage, UpdateError, UpdateRequest, UpdateResult, Updater};
pub use yaml::{
    validate_tag_value, DefaultTagHeuristic, Document, NodeRef, ParseResult, ScalarStyle,
    TagEditor, TagHeuristic, TagLocation, TagPath, YamlError, MAX_TAG_VALUE_LENGTH,
};
