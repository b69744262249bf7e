use std::fmt;

/// Coarse failure category shared by every error type in the crate.
///
/// Each module keeps its own error enum with the details; callers that only
/// care about the category match on [`ErrorKind`] via the `kind()` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing input: empty content, empty or oversized tag value,
    /// no tag field found, malformed request.
    Validation,
    /// The document failed to parse.
    Syntax,
    /// A path was rejected by the path validator.
    Security,
    /// Read, write or rename failure.
    FileSystem,
    /// An explicit tag path or backup file is absent.
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Security => "security",
            ErrorKind::FileSystem => "filesystem",
            ErrorKind::NotFound => "not found",
        };
        f.write_str(name)
    }
}
