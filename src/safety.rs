use crate::error::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Absolute directories that are always writable: the usual temp roots on
/// Unix and Windows hosts. Compared case-insensitively with `/` separators.
const DEFAULT_ALLOWED_PREFIXES: &[&str] = &[
    "/tmp/",
    "/var/tmp/",
    "c:/temp/",
    "c:/tmp/",
    "d:/temp/",
    "d:/tmp/",
];

/// First segments of relative paths that name system directories. A relative
/// path can be joined onto `/` or `C:\` later, so these are refused as well.
const SENSITIVE_SEGMENTS: &[&str] = &[
    "etc",
    "usr",
    "bin",
    "sbin",
    "boot",
    "dev",
    "proc",
    "sys",
    "root",
    "lib",
    "lib64",
    "windows",
    "system32",
    "program files",
    "program files (x86)",
    "programdata",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("file path cannot be empty")]
    EmptyPath,

    #[error("file path contains parent-directory traversal: {path}")]
    Traversal { path: String },

    #[error("absolute file path is outside safe directories: {path}")]
    OutsideAllowedDirectories { path: String },

    #[error("file path points at sensitive system location '{segment}': {path}")]
    SensitiveLocation { path: String, segment: String },
}

impl SecurityError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Security
    }
}

/// Lexical path checks performed before any file is touched.
///
/// The validator never consults the filesystem: it normalizes the path,
/// refuses traversal, confines absolute paths to an allow-list of temp
/// directories and refuses relative paths rooted at well-known system
/// directory names.
#[derive(Debug, Clone)]
pub struct PathValidator {
    /// Lower-cased, `/`-separated prefixes, each ending in `/`
    allowed_prefixes: Vec<String>,
}

impl Default for PathValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathValidator {
    /// Validator with the default allow-list plus the process temp directory.
    pub fn new() -> Self {
        let mut allowed_prefixes: Vec<String> = DEFAULT_ALLOWED_PREFIXES
            .iter()
            .map(|prefix| prefix.to_string())
            .collect();

        // TMPDIR may live elsewhere (macOS uses /var/folders/...)
        let temp_dir = std::env::temp_dir();
        if let Some(prefix) = allow_prefix(&temp_dir.to_string_lossy()) {
            allowed_prefixes.push(prefix);
        }

        allowed_prefixes.sort();
        allowed_prefixes.dedup();
        Self { allowed_prefixes }
    }

    /// Validator that also accepts absolute paths under `extra`.
    pub fn with_allowed_prefixes<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validator = Self::new();
        for prefix in extra {
            if let Some(prefix) = allow_prefix(prefix.as_ref()) {
                validator.allowed_prefixes.push(prefix);
            }
        }
        validator.allowed_prefixes.sort();
        validator.allowed_prefixes.dedup();
        validator
    }

    /// Check a path and return its normalized form.
    ///
    /// Checks run in order and stop at the first violation: empty input,
    /// traversal left after normalization, absolute paths outside the
    /// allow-list, relative paths naming a system directory.
    pub fn validate(&self, raw: impl AsRef<Path>) -> Result<PathBuf, SecurityError> {
        let raw = raw.as_ref().to_string_lossy();
        if raw.trim().is_empty() {
            return Err(SecurityError::EmptyPath);
        }

        let normalized = lexical_normalize(&raw);

        if normalized.split('/').any(|segment| segment == "..") {
            return Err(SecurityError::Traversal { path: normalized });
        }

        if is_absolute(&normalized) {
            let lowered = normalized.to_lowercase();
            let allowed = self
                .allowed_prefixes
                .iter()
                .any(|prefix| lowered.starts_with(prefix.as_str()));
            if !allowed {
                return Err(SecurityError::OutsideAllowedDirectories { path: normalized });
            }
            return Ok(PathBuf::from(normalized));
        }

        // `C:etc` is relative to the current directory of drive C
        let (_, rest) = split_root(&normalized);
        if let Some(first) = rest.split('/').next() {
            let first = first.to_lowercase();
            if SENSITIVE_SEGMENTS.contains(&first.as_str()) {
                return Err(SecurityError::SensitiveLocation {
                    path: normalized,
                    segment: first,
                });
            }
        }

        Ok(PathBuf::from(normalized))
    }

    /// Boolean form of [`PathValidator::validate`].
    pub fn is_safe(&self, raw: impl AsRef<Path>) -> bool {
        self.validate(raw).is_ok()
    }

    pub fn allowed_prefixes(&self) -> &[String] {
        &self.allowed_prefixes
    }
}

/// Normalize an allow-list entry: unified separators, lower case, trailing `/`.
/// Relative or empty entries are ignored.
fn allow_prefix(raw: &str) -> Option<String> {
    let normalized = lexical_normalize(raw);
    if !is_absolute(&normalized) {
        return None;
    }
    // A bare root would allow everything
    let (root, rest) = split_root(&normalized);
    if rest.is_empty() || root == normalized {
        return None;
    }
    let mut prefix = normalized.to_lowercase();
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    Some(prefix)
}

/// Resolve `.` and `..` segments and collapse separators without touching the
/// filesystem. Both `/` and `\` count as separators; the result uses `/`.
///
/// `..` at the root of an absolute path is dropped. Leading `..` segments of a
/// relative path are kept so the caller can reject them.
pub fn lexical_normalize(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let (root, rest) = split_root(&unified);

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if !root.is_empty() => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (root.is_empty(), body.is_empty()) {
        (true, true) => ".".to_string(),
        (true, false) => body,
        (false, _) => format!("{root}{body}"),
    }
}

/// Split a `/`-separated path into its root (`/`, `C:/`, `C:`) and the rest.
fn split_root(path: &str) -> (&str, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() >= 3 && bytes[2] == b'/' {
            return (&path[..3], &path[3..]);
        }
        return (&path[..2], &path[2..]);
    }
    if path.starts_with('/') {
        return ("/", path.trim_start_matches('/'));
    }
    ("", path)
}

/// Platform absoluteness, extended so that rooted and drive-letter paths
/// count as absolute on every host.
fn is_absolute(normalized: &str) -> bool {
    if Path::new(normalized).is_absolute() {
        return true;
    }
    let bytes = normalized.as_bytes();
    let drive_rooted = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && bytes[2] == b'/';
    drive_rooted || normalized.starts_with('/')
}
