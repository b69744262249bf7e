pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    ParserConfig, UpdaterConfig, ValidationError, ValidationIssue, DEFAULT_INDENTATION,
    DEFAULT_MAX_BACKUPS, MAX_DOCUMENT_BYTES,
};
