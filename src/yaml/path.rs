use crate::yaml::errors::YamlError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Location of a field inside a document: mapping keys verbatim, sequence
/// positions as `[i]`.
///
/// Equality is segment-wise, order- and length-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TagPath {
    segments: Vec<String>,
}

impl TagPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dotted path such as `image.tag` or `spec.containers[0].image`.
    ///
    /// Segments may be quoted to include dots: `labels."app.kubernetes.io/version"`.
    /// A bracketed index may follow a key directly or stand alone as a
    /// segment (`containers.[0]`).
    pub fn parse(input: &str) -> Result<Self, YamlError> {
        let segments = parse_dotted_path(input)?;
        if segments.is_empty() {
            return Err(invalid_path(input, "empty tag path"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(index_segment(index));
    }

    pub fn as_string(&self) -> String {
        self.segments
            .iter()
            .map(|segment| {
                if segment.contains('.') && !is_index_segment(segment) {
                    format!("\"{segment}\"")
                } else {
                    segment.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl Serialize for TagPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl std::str::FromStr for TagPath {
    type Err = YamlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn index_segment(index: usize) -> String {
    format!("[{index}]")
}

pub fn is_index_segment(segment: &str) -> bool {
    segment
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn invalid_path(input: &str, message: &str) -> YamlError {
    YamlError::validation(format!("invalid tag path '{input}': {message}"))
}

fn parse_dotted_path(input: &str) -> Result<Vec<String>, YamlError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    let mut in_quotes = false;
    let mut quote_char = '\0';
    let mut quoted = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == quote_char {
                in_quotes = false;
                continue;
            }

            if quote_char == '"' && ch == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                    continue;
                }
            }

            current.push(ch);
            continue;
        }

        match ch {
            '.' => {
                if current.is_empty() && !quoted {
                    // `a[0].b` already flushed the key before the index
                    if parts.last().is_some_and(|last: &String| is_index_segment(last)) {
                        continue;
                    }
                    return Err(invalid_path(input, "empty path segment"));
                }
                parts.push(std::mem::take(&mut current));
                quoted = false;
            }
            '"' | '\'' => {
                if !current.is_empty() {
                    return Err(invalid_path(input, "unexpected quote inside key"));
                }
                in_quotes = true;
                quoted = true;
                quote_char = ch;
            }
            '[' if !quoted => {
                let mut digits = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(next);
                }
                if !closed {
                    return Err(invalid_path(input, "unterminated index"));
                }
                let index: usize = digits
                    .trim()
                    .parse()
                    .map_err(|_| invalid_path(input, "index must be a non-negative integer"))?;
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                parts.push(index_segment(index));
                if chars.peek().is_some_and(|next| *next != '.' && *next != '[') {
                    return Err(invalid_path(input, "expected '.' after index"));
                }
            }
            other => current.push(other),
        }
    }

    if in_quotes {
        return Err(invalid_path(input, "unterminated quoted key"));
    }

    if !current.is_empty() || quoted {
        parts.push(current);
    } else if input.ends_with('.') {
        return Err(invalid_path(input, "empty path segment"));
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted_path_basic() {
        let path = TagPath::parse("image.tag").unwrap();
        assert_eq!(path.segments(), &["image", "tag"]);
    }

    #[test]
    fn parse_index_forms_agree() {
        let inline = TagPath::parse("spec.containers[0].image").unwrap();
        let separate = TagPath::parse("spec.containers.[0].image").unwrap();
        assert_eq!(inline, separate);
        assert_eq!(inline.segments(), &["spec", "containers", "[0]", "image"]);
    }

    #[test]
    fn parse_quoted_segment() {
        let path = TagPath::parse("metadata.labels.\"app.kubernetes.io/version\"").unwrap();
        assert_eq!(
            path.segments(),
            &["metadata", "labels", "app.kubernetes.io/version"]
        );
        assert_eq!(
            path.to_string(),
            "metadata.labels.\"app.kubernetes.io/version\""
        );
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        for input in ["", "a..b", "a.", "a[x]", "a[0", "a[0]b", "\"open"] {
            assert!(TagPath::parse(input).is_err(), "{input} should fail");
        }
    }

    #[test]
    fn display_round_trips() {
        let path = TagPath::new(["spec", "containers", "[1]", "image"]);
        assert_eq!(path.to_string(), "spec.containers.[1].image");
        assert_eq!(TagPath::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn equality_is_length_sensitive() {
        assert_ne!(TagPath::new(["image"]), TagPath::new(["image", "tag"]));
        assert_ne!(TagPath::new(["tag", "image"]), TagPath::new(["image", "tag"]));
    }

    #[test]
    fn index_segment_detection() {
        assert!(is_index_segment("[0]"));
        assert!(is_index_segment("[12]"));
        assert!(!is_index_segment("[]"));
        assert!(!is_index_segment("[a]"));
        assert!(!is_index_segment("tag"));
    }
}
