use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Default number of spaces per nesting level when re-emitting documents.
pub const DEFAULT_INDENTATION: usize = 2;
/// Largest document accepted by the parser and by validated reads.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
/// Number of backups kept per original file.
pub const DEFAULT_MAX_BACKUPS: usize = 5;

const MAX_INDENTATION: usize = 8;

/// Top-level settings for [`crate::Updater`].
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    /// Directory that receives backups. When unset, backups are written next
    /// to the original file.
    pub backup_dir: Option<PathBuf>,
    /// Master switch for backups; requests asking for a backup are honoured
    /// only when this is true.
    pub keep_backups: bool,
    /// Write through a sibling temp file and a rename.
    pub atomic_write: bool,
    /// Retention limit enforced by backup cleanup.
    pub max_backups: usize,
    /// Extra absolute directories accepted by the path validator, in
    /// addition to the platform temp directories.
    pub allowed_prefixes: Vec<String>,
    pub parser: ParserConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            keep_backups: true,
            atomic_write: true,
            max_backups: DEFAULT_MAX_BACKUPS,
            allowed_prefixes: Vec::new(),
            parser: ParserConfig::default(),
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.max_backups == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "max_backups",
                message: "must keep at least one backup".to_string(),
            });
        }

        for prefix in &self.allowed_prefixes {
            if prefix.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "allowed_prefixes",
                });
            }
        }

        if let Some(dir) = &self.backup_dir {
            if dir.as_os_str().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "backup_dir",
                });
            }
        }

        if let Err(issue) = self.parser.check() {
            issues.push(issue);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Settings for parsing and re-emitting documents.
///
/// Passed by reference to every parse and emit call; nothing in the YAML
/// layer keeps hidden formatting state.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Spaces per nesting level in emitted output.
    pub indent: usize,
    /// Attach comments and blank lines to nodes so they survive re-emission.
    pub preserve_comments: bool,
    /// Upper bound on document size, checked before parsing.
    pub max_document_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENTATION,
            preserve_comments: true,
            max_document_bytes: MAX_DOCUMENT_BYTES,
        }
    }
}

impl ParserConfig {
    /// Config with a custom indentation width; zero falls back to the default.
    pub fn with_indent(indent: usize) -> Self {
        let indent = if indent == 0 {
            DEFAULT_INDENTATION
        } else {
            indent
        };
        Self {
            indent,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), ValidationIssue> {
        if self.indent == 0 || self.indent > MAX_INDENTATION {
            return Err(ValidationIssue::OutOfRange {
                field: "parser.indent",
                message: format!("must be between 1 and {MAX_INDENTATION}"),
            });
        }
        if self.max_document_bytes == 0 {
            return Err(ValidationIssue::OutOfRange {
                field: "parser.max_document_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    OutOfRange {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "config field '{field}' must not be empty")
            }
            ValidationIssue::OutOfRange { field, message } => {
                write!(f, "config field '{field}' is out of range: {message}")
            }
        }
    }
}
