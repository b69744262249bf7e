//! Tag-field discovery over a parsed [`Document`].

use crate::yaml::path::TagPath;
use crate::yaml::tree::{Document, NodeId, NodeKind, NodeRef};
use serde::Serialize;

/// Decides whether a mapping entry with a scalar value is a release tag,
/// version or image field.
pub trait TagHeuristic: Send + Sync {
    fn is_tag_field(&self, key: &str, value: &str) -> bool;
}

impl<F> TagHeuristic for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_tag_field(&self, key: &str, value: &str) -> bool {
        self(key, value)
    }
}

/// Key substrings that mark a field as tag-like on their own.
const KEY_PATTERNS: &[&str] = &["tag", "version", "image", "release"];
/// Key substrings that qualify a version-looking value.
const VALUE_KEY_PATTERNS: &[&str] = &["tag", "version", "image"];

/// Key-name matching, with a value-shape fallback for version-looking
/// values under tag/version/image keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTagHeuristic;

impl TagHeuristic for DefaultTagHeuristic {
    fn is_tag_field(&self, key: &str, value: &str) -> bool {
        let key = key.to_lowercase();
        if KEY_PATTERNS.iter().any(|pattern| key.contains(pattern)) {
            return true;
        }
        looks_like_version(&value.to_lowercase())
            && VALUE_KEY_PATTERNS.iter().any(|pattern| key.contains(pattern))
    }
}

/// `v1...`, dotted numerics, anything semver accepts, or a dashed token.
pub fn looks_like_version(value: &str) -> bool {
    let mut chars = value.chars();
    if chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return true;
    }
    let dotted_numeric = value.contains('.')
        && value
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    dotted_numeric
        || semver::Version::parse(value.trim_start_matches('v')).is_ok()
        || value.contains('-')
}

/// A tag-like field found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagLocation {
    pub path: TagPath,
    /// 1-based position of the value
    pub line: usize,
    pub column: usize,
    pub value: String,
    #[serde(skip)]
    pub node: NodeRef,
}

/// Walk the document depth-first, pre-order, and collect every entry the
/// heuristic accepts. Paths are unique: a later entry with the same path
/// (a duplicate key) replaces the earlier one.
pub fn locate(doc: &Document, heuristic: &dyn TagHeuristic) -> Vec<TagLocation> {
    let mut locations = Vec::new();
    if let Some(root) = doc.root() {
        let mut path = TagPath::default();
        walk(doc, root, &mut path, heuristic, &mut locations);
    }
    locations
}

fn walk(
    doc: &Document,
    id: NodeId,
    path: &mut TagPath,
    heuristic: &dyn TagHeuristic,
    locations: &mut Vec<TagLocation>,
) {
    match &doc.node(id).kind {
        NodeKind::Mapping { entries, .. } => {
            for entry in entries {
                if entry.key.text.is_empty() {
                    continue;
                }
                path.push(entry.key.text.as_str());

                let value = doc.node(entry.value);
                if let Some(scalar) = value.as_scalar() {
                    if heuristic.is_tag_field(&entry.key.text, &scalar.value) {
                        record(
                            locations,
                            TagLocation {
                                path: path.clone(),
                                line: value.mark.line,
                                column: value.mark.column,
                                value: scalar.value.clone(),
                                node: doc.reference(entry.value),
                            },
                        );
                    }
                }

                walk(doc, entry.value, path, heuristic, locations);
                path.pop();
            }
        }
        NodeKind::Sequence { items, .. } => {
            for (index, item) in items.iter().enumerate() {
                path.push_index(index);
                walk(doc, item.value, path, heuristic, locations);
                path.pop();
            }
        }
        NodeKind::Scalar(_) => {}
    }
}

fn record(locations: &mut Vec<TagLocation>, location: TagLocation) {
    locations.retain(|existing| existing.path != location.path);
    locations.push(location);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::yaml::parser::parse;

    fn paths(text: &str, heuristic: &dyn TagHeuristic) -> Vec<String> {
        let doc = parse(text, &ParserConfig::default()).unwrap();
        locate(&doc, heuristic)
            .into_iter()
            .map(|location| location.path.to_string())
            .collect()
    }

    #[test]
    fn default_heuristic_matches_key_names() {
        let heuristic = DefaultTagHeuristic;
        assert!(heuristic.is_tag_field("tag", "latest"));
        assert!(heuristic.is_tag_field("imageTag", "x"));
        assert!(heuristic.is_tag_field("appVersion", "1"));
        assert!(heuristic.is_tag_field("ReleaseName", "prod"));
        assert!(!heuristic.is_tag_field("name", "v1.2.3"));
        assert!(!heuristic.is_tag_field("replicas", "3"));
    }

    #[test]
    fn version_shapes() {
        assert!(looks_like_version("v1.2.3"));
        assert!(looks_like_version("1.25"));
        assert!(looks_like_version("1.2.3-rc.1"));
        assert!(looks_like_version("release-2024"));
        assert!(!looks_like_version("latest"));
        assert!(!looks_like_version("value"));
    }

    #[test]
    fn locates_in_traversal_order_with_index_segments() {
        let text = "version: 1.0.0\nspec:\n  containers:\n    - name: web\n      image: nginx:1.25\n    - name: sidecar\n      image: envoy:v1\nimage:\n  tag: v2\n";
        assert_eq!(
            paths(text, &DefaultTagHeuristic),
            vec![
                "version",
                "spec.containers.[0].image",
                "spec.containers.[1].image",
                "image.tag",
            ]
        );
    }

    #[test]
    fn non_scalar_values_are_not_classified() {
        let text = "image:\n  repository: nginx\n";
        assert!(paths(text, &DefaultTagHeuristic).is_empty());
    }

    #[test]
    fn duplicate_paths_keep_the_last_occurrence() {
        let doc = parse("tag: v1\nname: x\ntag: v2\n", &ParserConfig::default()).unwrap();
        let locations = locate(&doc, &DefaultTagHeuristic);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].value, "v2");
        assert_eq!(locations[0].line, 3);
    }

    #[test]
    fn closures_act_as_heuristics() {
        let only_build = |key: &str, _value: &str| key == "build";
        let text = "build: 42\ntag: v1\n";
        assert_eq!(paths(text, &only_build), vec!["build"]);
    }

    #[test]
    fn records_value_positions() {
        let doc = parse("image:\n  tag: v1.0.0\n", &ParserConfig::default()).unwrap();
        let locations = locate(&doc, &DefaultTagHeuristic);
        assert_eq!(locations[0].line, 2);
        assert_eq!(locations[0].column, 8);
        assert_eq!(locations[0].value, "v1.0.0");
    }

    #[test]
    fn serializes_without_node_reference() {
        let doc = parse("tag: v1\n", &ParserConfig::default()).unwrap();
        let locations = locate(&doc, &DefaultTagHeuristic);
        let json = serde_json::to_value(&locations).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "path": "tag", "line": 1, "column": 6, "value": "v1" }])
        );
    }
}
