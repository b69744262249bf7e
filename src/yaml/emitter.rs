//! Block-style serializer for [`Document`] trees.
//!
//! The output is a fixed point: parsing emitted text and emitting it again
//! yields the same bytes.

use crate::config::ParserConfig;
use crate::yaml::scalar::{is_plain_safe, is_plain_safe_in_block, quote_double, quote_single};
use crate::yaml::tree::{Document, Entry, Item, Key, Node, NodeId, NodeKind, Scalar, ScalarStyle};

pub fn emit(doc: &Document, config: &ParserConfig) -> String {
    let mut emitter = Emitter {
        doc,
        step: config.indent.max(1),
        out: String::new(),
    };
    if let Some(root) = doc.root() {
        emitter.root(root);
    }
    for comment in doc.foot_comments() {
        emitter.comment(0, comment);
    }
    emitter.out
}

struct Emitter<'d> {
    doc: &'d Document,
    step: usize,
    out: String,
}

/// A scalar that can be written as a literal block: chomping header, content
/// lines, and the blank lines kept after them.
struct Literal<'v> {
    header: &'static str,
    lines: Vec<&'v str>,
    kept_blank_lines: usize,
}

/// Literal form of a block-styled scalar, if its content allows one.
fn block_literal(node: &Node) -> Option<Literal<'_>> {
    match &node.kind {
        NodeKind::Scalar(scalar) if scalar.style.is_block() => literal(&scalar.value),
        _ => None,
    }
}

fn literal(value: &str) -> Option<Literal<'_>> {
    let core = value.trim_end_matches('\n');
    let trailing = value.len() - core.len();
    let unrepresentable = value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t');
    let indented_start = core
        .split('\n')
        .find(|line| !line.is_empty())
        .map_or(true, |line| line.starts_with([' ', '\t']));
    if unrepresentable || indented_start || core.ends_with([' ', '\t']) {
        return None;
    }
    let header = match trailing {
        0 => "|-",
        1 => "|",
        _ => "|+",
    };
    Some(Literal {
        header,
        lines: core.split('\n').collect(),
        kept_blank_lines: trailing.saturating_sub(1),
    })
}

impl<'d> Emitter<'d> {
    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat(' ').take(indent));
    }

    fn comment(&mut self, indent: usize, text: &str) {
        if !text.is_empty() {
            self.pad(indent);
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn head(&mut self, indent: usize, head: &[String]) {
        for line in head {
            self.comment(indent, line);
        }
    }

    fn line_end(&mut self, comment: Option<&str>) {
        if let Some(comment) = comment {
            self.out.push(' ');
            self.out.push_str(comment);
        }
        self.out.push('\n');
    }

    fn root(&mut self, id: NodeId) {
        let node = self.doc.node(id);
        if let Some(literal) = block_literal(node) {
            self.literal(&literal, self.step);
            return;
        }
        match &node.kind {
            NodeKind::Mapping { entries, .. } if node.is_block_collection() => {
                self.mapping(entries, 0, false);
            }
            NodeKind::Sequence { items, .. } if node.is_block_collection() => {
                self.sequence(items, 0);
            }
            _ => {
                let text = self.inline(id, true);
                self.out.push_str(&text);
                self.out.push('\n');
            }
        }
    }

    /// Write ` |-` and the indented content. The caller has written
    /// everything up to the indicator.
    fn literal(&mut self, literal: &Literal<'_>, indent: usize) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push(' ');
        }
        self.out.push_str(literal.header);
        self.out.push('\n');
        for line in &literal.lines {
            self.comment(indent, line);
        }
        for _ in 0..literal.kept_blank_lines {
            self.out.push('\n');
        }
    }

    /// Block mapping at `indent`. With `dash`, the first entry shares the
    /// line of a sequence dash two columns to the left.
    fn mapping(&mut self, entries: &[Entry], indent: usize, dash: bool) {
        for (index, entry) in entries.iter().enumerate() {
            if dash && index == 0 {
                let dash_indent = indent.saturating_sub(2);
                self.head(dash_indent, &entry.comments.head);
                self.pad(dash_indent);
                self.out.push_str("- ");
            } else {
                self.head(indent, &entry.comments.head);
                self.pad(indent);
            }

            let key = key_text(&entry.key, false);
            self.out.push_str(&key);
            self.out.push(':');

            let comment = entry.comments.line.as_deref();
            let child = indent + self.step;
            let value = self.doc.node(entry.value);
            if let Some(literal) = block_literal(value) {
                self.literal(&literal, child);
                continue;
            }
            match &value.kind {
                NodeKind::Mapping { entries: inner, .. } if value.is_block_collection() => {
                    self.line_end(comment);
                    self.mapping(inner, child, false);
                }
                NodeKind::Sequence { items, .. } if value.is_block_collection() => {
                    self.line_end(comment);
                    self.sequence(items, child);
                }
                NodeKind::Scalar(scalar) if is_empty_plain(scalar) => self.line_end(comment),
                _ => {
                    let text = self.inline(entry.value, false);
                    self.out.push(' ');
                    self.out.push_str(&text);
                    self.line_end(comment);
                }
            }
        }
    }

    fn sequence(&mut self, items: &[Item], indent: usize) {
        for item in items {
            self.head(indent, &item.comments.head);
            let comment = item.comments.line.as_deref();
            let value = self.doc.node(item.value);
            match &value.kind {
                NodeKind::Mapping { entries, .. } if value.is_block_collection() => {
                    if comment.is_some() {
                        self.pad(indent);
                        self.out.push('-');
                        self.line_end(comment);
                        self.mapping(entries, indent + 2, false);
                    } else {
                        self.mapping(entries, indent + 2, true);
                    }
                }
                NodeKind::Sequence { items: inner, .. } if value.is_block_collection() => {
                    self.pad(indent);
                    self.out.push('-');
                    self.line_end(comment);
                    self.sequence(inner, indent + self.step);
                }
                NodeKind::Scalar(scalar) => {
                    self.pad(indent);
                    self.out.push('-');
                    if let Some(literal) = block_literal(value) {
                        self.literal(&literal, indent + self.step);
                    } else if is_empty_plain(scalar) {
                        self.line_end(comment);
                    } else {
                        let text = self.inline(item.value, false);
                        self.out.push(' ');
                        self.out.push_str(&text);
                        self.line_end(comment);
                    }
                }
                _ => {
                    let text = self.inline(item.value, false);
                    self.pad(indent);
                    self.out.push_str("- ");
                    self.out.push_str(&text);
                    self.line_end(comment);
                }
            }
        }
    }

    /// Single-line rendering. Collections come out in flow style, and
    /// everything below a flow collection stays in flow context.
    fn inline(&self, id: NodeId, flow: bool) -> String {
        match &self.doc.node(id).kind {
            NodeKind::Scalar(scalar) => scalar_text(scalar, flow),
            NodeKind::Mapping { entries, .. } => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        format!(
                            "{}: {}",
                            key_text(&entry.key, true),
                            self.inline(entry.value, true)
                        )
                    })
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            NodeKind::Sequence { items, .. } => {
                let body: Vec<String> = items
                    .iter()
                    .map(|item| self.inline(item.value, true))
                    .collect();
                format!("[{}]", body.join(", "))
            }
        }
    }
}

fn is_empty_plain(scalar: &Scalar) -> bool {
    scalar.style == ScalarStyle::Plain && scalar.value.is_empty()
}

fn plain_allowed(value: &str, flow: bool) -> bool {
    if flow {
        is_plain_safe(value)
    } else {
        is_plain_safe_in_block(value)
    }
}

fn quoted(value: &str, style: ScalarStyle) -> String {
    let single = style == ScalarStyle::SingleQuoted && !value.chars().any(char::is_control);
    if single {
        quote_single(value)
    } else {
        quote_double(value)
    }
}

fn scalar_text(scalar: &Scalar, flow: bool) -> String {
    match scalar.style {
        ScalarStyle::Plain if scalar.value.is_empty() => {
            if flow {
                "null".to_string()
            } else {
                String::new()
            }
        }
        ScalarStyle::Plain if plain_allowed(&scalar.value, flow) => scalar.value.clone(),
        style => quoted(&scalar.value, style),
    }
}

fn key_text(key: &Key, flow: bool) -> String {
    match key.style {
        ScalarStyle::Plain if plain_allowed(&key.text, flow) => key.text.clone(),
        style => quoted(&key.text, style),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parser::parse;

    fn round_trip(text: &str) -> String {
        let config = ParserConfig::default();
        emit(&parse(text, &config).unwrap(), &config)
    }

    fn assert_fixed_point(text: &str) {
        let once = round_trip(text);
        assert_eq!(round_trip(&once), once, "not a fixed point:\n{once}");
    }

    #[test]
    fn emits_nested_block_mappings() {
        let text = "name: app\nimage:\n  repository: nginx\n  tag: v1.0.0\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn normalizes_indentation() {
        let text = "image:\n    tag: v1\n";
        assert_eq!(round_trip(text), "image:\n  tag: v1\n");

        let config = ParserConfig::with_indent(4);
        let doc = parse("image:\n  tag: v1\n", &config).unwrap();
        assert_eq!(emit(&doc, &config), "image:\n    tag: v1\n");
    }

    #[test]
    fn indents_sequences_under_keys_and_inlines_first_entry() {
        let text = "spec:\n  containers:\n  - name: web\n    image: nginx:1.25\n";
        let expected = "spec:\n  containers:\n    - name: web\n      image: nginx:1.25\n";
        assert_eq!(round_trip(text), expected);
        assert_fixed_point(text);
    }

    #[test]
    fn preserves_scalar_styles() {
        let text = "a: 'single'\nb: \"double\"\nc: plain\nd: 'it''s'\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn emits_flow_and_empty_collections_inline() {
        let text = "args: [--port, \"8080\"]\nlabels: {app: web}\nempty: {}\nnone: []\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn emits_empty_values_bare() {
        let text = "key:\nlist:\n  -\n  - x\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn emits_literal_blocks_with_chomping() {
        let text = "strip: |-\n  one\n  two\nclip: |\n  line\nafter: x\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn folded_blocks_become_literal() {
        let text = "msg: >\n  folded\n  text\n";
        assert_eq!(round_trip(text), "msg: |\n  folded text\n");
    }

    #[test]
    fn preserves_comments() {
        let text = "# header\nname: app # inline\n\n# image\nimage:\n  # pinned\n  tag: v1\n# footer\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn keeps_comments_on_dash_lines() {
        let text = "items:\n  - # first\n    name: a\n  - name: b\n";
        assert_eq!(round_trip(text), text);
        assert_fixed_point("matrix:\n  - # row\n    - 1\n    - 2\n");
    }

    #[test]
    fn emits_exactly_one_trailing_newline() {
        assert_eq!(round_trip("tag: v1\n\n\n"), "tag: v1\n");
        assert_eq!(round_trip("tag: v1"), "tag: v1\n");
    }

    #[test]
    fn mixed_document_is_a_fixed_point() {
        assert_fixed_point(
            "# deploy\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  labels: {tier: \"1\"}\nspec:\n  template:\n    spec:\n      containers:\n        - name: web # main\n          image: nginx:1.25\n          args:\n            - --verbose\n          env: []\n",
        );
    }
}
