use crate::config::ParserConfig;
use crate::yaml::emitter::emit;
use crate::yaml::errors::YamlError;
use crate::yaml::locator::{locate, DefaultTagHeuristic, TagHeuristic, TagLocation};
use crate::yaml::parser;
use crate::yaml::path::TagPath;
use crate::yaml::scalar::{is_plain_safe, ScalarKind};
use crate::yaml::tree::{Document, Scalar, ScalarStyle};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Longest tag value accepted by an update, in characters.
pub const MAX_TAG_VALUE_LENGTH: usize = 256;

/// Paths tried by [`TagEditor::update_tag_simple`], in priority order.
const CONVENTIONAL_PATHS: &[&[&str]] = &[
    &["tag"],
    &["image", "tag"],
    &["spec", "template", "spec", "containers", "[0]", "image"],
    &["spec", "containers", "[0]", "image"],
    &["metadata", "labels", "version"],
    &["version"],
];

/// A parsed document and the tag fields found in it.
///
/// Consumed by value by [`TagEditor::update_tag`]; the locations refer to
/// this document only and cannot outlive it.
#[derive(Debug)]
pub struct ParseResult {
    pub document: Document,
    pub locations: Vec<TagLocation>,
    pub original_text: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ParseResult {
    pub fn find(&self, path: &TagPath) -> Option<&TagLocation> {
        self.locations.iter().find(|location| &location.path == path)
    }
}

/// Parses, queries and rewrites YAML documents.
///
/// Formatting settings come from the [`ParserConfig`] the editor is built
/// with; the heuristic deciding which fields are tags is swappable.
#[derive(Clone)]
pub struct TagEditor {
    config: ParserConfig,
    heuristic: Arc<dyn TagHeuristic>,
}

impl fmt::Debug for TagEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagEditor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for TagEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagEditor {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            heuristic: Arc::new(DefaultTagHeuristic),
        }
    }

    pub fn with_heuristic(mut self, heuristic: impl TagHeuristic + 'static) -> Self {
        self.heuristic = Arc::new(heuristic);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse_content(&self, text: &str) -> Result<ParseResult, YamlError> {
        let document = parser::parse(text, &self.config)?;
        let locations = locate(&document, self.heuristic.as_ref());
        debug!(locations = locations.len(), "located tag fields");
        Ok(ParseResult {
            document,
            locations,
            original_text: text.to_string(),
            is_valid: true,
            errors: Vec::new(),
        })
    }

    /// Replace the value at `path` and return the re-emitted document.
    pub fn update_tag(
        &self,
        parsed: ParseResult,
        path: &TagPath,
        new_value: &str,
    ) -> Result<String, YamlError> {
        validate_tag_value(new_value)?;

        let node = parsed
            .find(path)
            .map(|location| location.node)
            .ok_or_else(|| not_found(path, &parsed.locations))?;

        let mut document = parsed.document;
        let style = restyle(document.scalar(node)?, new_value);
        document.set_scalar(node, new_value, style)?;
        debug!(path = %path, ?style, "updated tag value");

        Ok(emit(&document, &self.config))
    }

    /// Update the first conventional tag field present in `text`.
    pub fn update_tag_simple(&self, text: &str, new_value: &str) -> Result<String, YamlError> {
        validate_tag_value(new_value)?;
        let parsed = self.parse_content(text)?;

        let path = CONVENTIONAL_PATHS
            .iter()
            .map(|segments| TagPath::new(segments.iter().copied()))
            .find(|path| parsed.find(path).is_some())
            .ok_or_else(|| YamlError::validation("no suitable tag field found in YAML content"))?;

        self.update_tag(parsed, &path, new_value)
    }

    /// Creating fields that do not exist yet has no defined placement
    /// policy, so it always fails.
    pub fn create_and_update_tag(
        &self,
        _parsed: ParseResult,
        _path: &TagPath,
        _new_value: &str,
    ) -> Result<String, YamlError> {
        Err(YamlError::NotImplemented {
            feature: "creating new tag fields",
        })
    }

    pub fn validate_yaml(&self, text: &str) -> Result<(), YamlError> {
        parser::parse(text, &self.config).map(|_| ())
    }

    pub fn format_yaml(&self, text: &str) -> Result<String, YamlError> {
        let document = parser::parse(text, &self.config)?;
        Ok(emit(&document, &self.config))
    }

    pub fn get_tag_value(&self, parsed: &ParseResult, path: &TagPath) -> Result<String, YamlError> {
        let location = parsed
            .find(path)
            .ok_or_else(|| not_found(path, &parsed.locations))?;
        Ok(parsed.document.scalar(location.node)?.value.clone())
    }

    pub fn list_all_tags<'p>(&self, parsed: &'p ParseResult) -> &'p [TagLocation] {
        &parsed.locations
    }
}

pub fn validate_tag_value(value: &str) -> Result<(), YamlError> {
    if value.trim().is_empty() {
        return Err(YamlError::validation("new tag value cannot be empty"));
    }
    let length = value.chars().count();
    if length > MAX_TAG_VALUE_LENGTH {
        return Err(YamlError::validation(format!(
            "tag value too long: {length} characters (max {MAX_TAG_VALUE_LENGTH})"
        )));
    }
    if value.contains(['\n', '\r']) {
        return Err(YamlError::validation("tag value must be a single line"));
    }
    Ok(())
}

/// Style for the new value. A plain scalar stays plain only when the new
/// text needs no quoting and resolves to the same type as the old text.
fn restyle(current: &Scalar, new_value: &str) -> ScalarStyle {
    match current.style {
        ScalarStyle::Plain => {
            let same_kind = ScalarKind::of(&current.value) == ScalarKind::of(new_value);
            if same_kind && is_plain_safe(new_value) {
                ScalarStyle::Plain
            } else {
                ScalarStyle::DoubleQuoted
            }
        }
        ScalarStyle::SingleQuoted if new_value.chars().any(char::is_control) => {
            ScalarStyle::DoubleQuoted
        }
        style => style,
    }
}

fn not_found(path: &TagPath, locations: &[TagLocation]) -> YamlError {
    let wanted = path.to_string();
    let suggestion = locations
        .iter()
        .map(|location| {
            let candidate = location.path.to_string();
            (strsim::normalized_levenshtein(&wanted, &candidate), candidate)
        })
        .filter(|(score, _)| *score >= 0.6)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate);
    YamlError::NotFound {
        path: wanted,
        suggestion,
    }
}
