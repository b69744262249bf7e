//! Builds a [`Document`] arena from the `saphyr-parser` event stream.
//!
//! The event stream carries values and positions but no comments, so
//! comments are recovered in a second pass over the source lines: every line
//! touched by an event is owned by the tree, and the unowned comment lines
//! directly above an entry become its head comments.

use crate::config::ParserConfig;
use crate::yaml::errors::YamlError;
use crate::yaml::tree::{
    Comments, Document, Entry, Item, Key, Mark, Node, NodeId, NodeKind, Scalar, ScalarStyle,
};
use saphyr_parser::{Event, Marker, Parser, ScalarStyle as EventStyle, ScanError, Span};
use std::collections::HashMap;
use tracing::debug;

/// Nodes that alias expansion may add to one document.
const MAX_ALIAS_NODES: usize = 100_000;

/// Parse a single YAML document.
pub fn parse(text: &str, config: &ParserConfig) -> Result<Document, YamlError> {
    if text.trim().is_empty() {
        return Err(YamlError::validation("YAML content cannot be empty"));
    }
    if text.len() > config.max_document_bytes {
        return Err(YamlError::validation(format!(
            "YAML content is {} bytes, exceeding the limit of {} bytes",
            text.len(),
            config.max_document_bytes
        )));
    }

    let source = Source::new(text);
    let mut builder = Builder::new(&source);
    let mut documents = 0usize;

    for event in Parser::new_from_str(text) {
        let (event, span) = event.map_err(|err| scan_error(&err))?;
        match event {
            Event::DocumentStart { .. } => {
                documents += 1;
                if documents > 1 {
                    return Err(builder.syntax(
                        &span,
                        "multiple documents in one stream are not supported",
                    ));
                }
            }
            Event::Scalar(value, style, anchor, ..) => {
                builder.scalar(value.to_string(), scalar_style(style), anchor, &span)?;
            }
            Event::Alias(anchor) => builder.alias(anchor, &span)?,
            Event::MappingStart(anchor, ..) => builder.open(anchor, &span, true)?,
            Event::SequenceStart(anchor, ..) => builder.open(anchor, &span, false)?,
            Event::MappingEnd | Event::SequenceEnd => builder.close(&span)?,
            _ => {}
        }
    }

    let Builder {
        mut doc,
        stack,
        owned,
        ..
    } = builder;
    if !stack.is_empty() {
        return Err(YamlError::Syntax {
            message: "unexpected end of stream inside a collection".to_string(),
            line: source.lines.len(),
            column: 1,
        });
    }

    if config.preserve_comments {
        let mut collector = CommentCollector::new(&source, owned);
        collector.collect(&mut doc);
    }

    debug!(nodes = doc.len(), "parsed YAML document");
    Ok(doc)
}

fn scan_error(err: &ScanError) -> YamlError {
    let marker = err.marker();
    YamlError::Syntax {
        message: err.info().to_string(),
        line: marker.line(),
        column: marker.col() + 1,
    }
}

/// Source text indexed by line, used to turn scanner markers into byte
/// offsets and to read the bytes the event stream does not expose.
struct Source<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    line_starts: Vec<usize>,
}

impl<'a> Source<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            text,
            lines: text.lines().collect(),
            line_starts,
        }
    }

    /// Byte offset of a 1-based line and 0-based character column.
    fn offset(&self, line: usize, col: usize) -> usize {
        let Some(&start) = self.line_starts.get(line.saturating_sub(1)) else {
            return self.text.len();
        };
        self.text[start..]
            .char_indices()
            .nth(col)
            .map_or(self.text.len(), |(i, _)| start + i)
    }

    fn mark(&self, marker: &Marker) -> Mark {
        Mark {
            line: marker.line(),
            column: marker.col() + 1,
            offset: self.offset(marker.line(), marker.col()),
        }
    }

    /// Lines taken by the block scalar whose span starts on `line`: the
    /// header line and the content indented below it. Trailing blank lines
    /// count only under `+` chomping.
    fn block_lines(&self, line: usize) -> Option<(usize, usize)> {
        let header = (1..=line.min(self.lines.len()))
            .rev()
            .find(|&candidate| block_header(self.lines[candidate - 1]).is_some())?;
        let keep = block_header(self.lines[header - 1])?;
        let header_indent = indentation(self.lines[header - 1]);

        let mut content_indent = None;
        let mut last = header;
        for (index, text) in self.lines.iter().enumerate().skip(header) {
            let number = index + 1;
            if text.trim().is_empty() {
                if keep {
                    last = number;
                }
                continue;
            }
            let indent = *content_indent.get_or_insert(indentation(text));
            if indent <= header_indent || indentation(text) < indent {
                break;
            }
            last = number;
        }
        Some((header, last))
    }

    /// Offset just past the quote closing the scalar opened at `open`.
    fn closing_quote(&self, open: usize, quote: u8) -> Option<usize> {
        let bytes = self.text.as_bytes();
        if bytes.get(open) != Some(&quote) {
            return None;
        }
        let mut index = open + 1;
        while let Some(&byte) = bytes.get(index) {
            match byte {
                b'\\' if quote == b'"' => index += 2,
                b'\'' if quote == b'\'' && bytes.get(index + 1) == Some(&b'\'') => index += 2,
                _ if byte == quote => return Some(index + 1),
                _ => index += 1,
            }
        }
        None
    }

    /// Offset where the text following a scalar begins.
    fn scalar_end(&self, start: Mark, end: Mark, style: ScalarStyle) -> usize {
        let quote = match style {
            ScalarStyle::DoubleQuoted => b'"',
            ScalarStyle::SingleQuoted => b'\'',
            _ => return end.offset,
        };
        self.closing_quote(start.offset, quote).unwrap_or(end.offset)
    }

    /// Whether a collection starting at `offset` opens with `{` or `[`,
    /// looking past any `&anchor` or `!tag` properties.
    fn opens_flow(&self, offset: usize) -> bool {
        let bytes = self.text.as_bytes();
        let mut index = offset;
        loop {
            match bytes.get(index) {
                Some(b' ' | b'\t') => index += 1,
                Some(b'&' | b'!') => {
                    while bytes.get(index).is_some_and(|b| !b.is_ascii_whitespace()) {
                        index += 1;
                    }
                }
                Some(b'{' | b'[') => return true,
                _ => return false,
            }
        }
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// `Some(keep)` when `line` ends in a block scalar header such as `|`,
/// `>-` or `|+2`, ignoring a trailing comment.
fn block_header(line: &str) -> Option<bool> {
    let code = match line.find(" #") {
        Some(index) => &line[..index],
        None => line,
    };
    let token = code.trim_end().rsplit([' ', '\t']).next()?;
    let indicators = token.strip_prefix(['|', '>'])?;
    if !indicators
        .chars()
        .all(|c| c == '+' || c == '-' || c.is_ascii_digit())
    {
        return None;
    }
    Some(indicators.contains('+'))
}

fn scalar_style(style: EventStyle) -> ScalarStyle {
    match style {
        EventStyle::Plain => ScalarStyle::Plain,
        EventStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        EventStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        EventStyle::Literal => ScalarStyle::Literal,
        EventStyle::Folded => ScalarStyle::Folded,
    }
}

enum Frame {
    Mapping {
        entries: Vec<Entry>,
        key: Option<Key>,
        flow: bool,
        mark: Mark,
        anchor: usize,
    },
    Sequence {
        items: Vec<Item>,
        flow: bool,
        mark: Mark,
        anchor: usize,
    },
}

struct Builder<'s, 'a> {
    source: &'s Source<'a>,
    doc: Document,
    stack: Vec<Frame>,
    anchors: HashMap<usize, NodeId>,
    /// Nodes created so far by alias expansion
    expanded: usize,
    /// Indexed by 1-based line number
    owned: Vec<bool>,
}

impl<'s, 'a> Builder<'s, 'a> {
    fn new(source: &'s Source<'a>) -> Self {
        Self {
            source,
            doc: Document::new(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            expanded: 0,
            owned: vec![false; source.lines.len() + 2],
        }
    }

    fn syntax(&self, span: &Span, message: &str) -> YamlError {
        YamlError::Syntax {
            message: message.to_string(),
            line: span.start.line(),
            column: span.start.col() + 1,
        }
    }

    fn own(&mut self, first: usize, last: usize) {
        for line in first..=last {
            if let Some(slot) = self.owned.get_mut(line) {
                *slot = true;
            }
        }
    }

    /// Mark the lines a token occupies. A token ending at column 1 stopped at
    /// the previous line break, so its last line is not owned.
    fn own_span(&mut self, start: Mark, end: Mark) {
        let last = if end.column == 1 && end.line > start.line {
            end.line - 1
        } else {
            end.line
        };
        self.own(start.line, last);
    }

    fn expecting_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { key: None, .. }))
    }

    fn scalar(
        &mut self,
        value: String,
        style: ScalarStyle,
        anchor: usize,
        span: &Span,
    ) -> Result<(), YamlError> {
        let mark = self.source.mark(&span.start);
        let end = self.source.mark(&span.end);
        // Empty values come through as a zero-width plain `~`
        let empty = style == ScalarStyle::Plain && mark.offset == end.offset;
        let value = if empty {
            String::new()
        } else {
            match style.is_block().then(|| self.source.block_lines(mark.line)) {
                Some(Some((first, last))) => self.own(first, last),
                _ => self.own_span(mark, end),
            }
            value
        };

        if let Some(Frame::Mapping { key: slot @ None, .. }) = self.stack.last_mut() {
            *slot = Some(Key {
                text: value,
                style,
                mark,
                end,
            });
            return Ok(());
        }

        let id = self.doc.push(Node {
            kind: NodeKind::Scalar(Scalar { value, style }),
            mark,
            end,
        });
        self.register(anchor, id);
        self.attach(id)
    }

    fn alias(&mut self, anchor: usize, span: &Span) -> Result<(), YamlError> {
        if self.expecting_key() {
            return Err(self.syntax(span, "alias mapping keys are not supported"));
        }
        let target = *self
            .anchors
            .get(&anchor)
            .ok_or_else(|| self.syntax(span, "alias refers to an unknown anchor"))?;

        self.expanded += self.doc.subtree_len(target);
        if self.expanded > MAX_ALIAS_NODES {
            return Err(YamlError::validation(format!(
                "alias expansion exceeds the limit of {MAX_ALIAS_NODES} nodes"
            )));
        }

        let mark = self.source.mark(&span.start);
        let end = self.source.mark(&span.end);
        self.own_span(mark, end);

        let copy = self.doc.deep_copy(target);
        let node = self.doc.node_mut(copy);
        node.mark = mark;
        node.end = end;
        self.attach(copy)
    }

    fn open(&mut self, anchor: usize, span: &Span, mapping: bool) -> Result<(), YamlError> {
        if self.expecting_key() {
            return Err(self.syntax(span, "only scalar mapping keys are supported"));
        }
        let mark = self.source.mark(&span.start);
        let flow = self.source.opens_flow(mark.offset);
        self.stack.push(if mapping {
            Frame::Mapping {
                entries: Vec::new(),
                key: None,
                flow,
                mark,
                anchor,
            }
        } else {
            Frame::Sequence {
                items: Vec::new(),
                flow,
                mark,
                anchor,
            }
        });
        Ok(())
    }

    fn close(&mut self, span: &Span) -> Result<(), YamlError> {
        let Some(frame) = self.stack.pop() else {
            return Err(self.syntax(span, "unbalanced collection end"));
        };
        let close = self.source.mark(&span.end);

        let (kind, flow, mark, anchor, last_child) = match frame {
            Frame::Mapping {
                entries,
                key,
                flow,
                mark,
                anchor,
            } => {
                if key.is_some() {
                    return Err(self.syntax(span, "mapping key without a value"));
                }
                let last = entries.last().map(|entry| entry.value);
                (NodeKind::Mapping { entries, flow }, flow, mark, anchor, last)
            }
            Frame::Sequence {
                items,
                flow,
                mark,
                anchor,
            } => {
                let last = items.last().map(|item| item.value);
                (NodeKind::Sequence { items, flow }, flow, mark, anchor, last)
            }
        };

        let end = if flow {
            // Comment lines inside a flow collection cannot be re-attached
            self.own(mark.line, close.line);
            close
        } else {
            last_child.map_or(mark, |child| self.doc.node(child).end)
        };

        let id = self.doc.push(Node { kind, mark, end });
        self.register(anchor, id);
        self.attach(id)
    }

    fn register(&mut self, anchor: usize, id: NodeId) {
        if anchor != 0 {
            self.anchors.insert(anchor, id);
        }
    }

    fn attach(&mut self, id: NodeId) -> Result<(), YamlError> {
        let mark = self.doc.node(id).mark;
        match self.stack.last_mut() {
            None => {
                if self.doc.root().is_some() {
                    return Err(YamlError::Syntax {
                        message: "unexpected second root node".to_string(),
                        line: mark.line,
                        column: mark.column,
                    });
                }
                self.doc.set_root(id);
            }
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                Some(key) => entries.push(Entry {
                    key,
                    value: id,
                    comments: Comments::default(),
                }),
                None => {
                    return Err(YamlError::Syntax {
                        message: "only scalar mapping keys are supported".to_string(),
                        line: mark.line,
                        column: mark.column,
                    })
                }
            },
            Some(Frame::Sequence { items, .. }) => items.push(Item {
                value: id,
                comments: Comments::default(),
            }),
        }
        Ok(())
    }
}

/// Second pass: hand unowned comment and blank lines to the entries and
/// items that follow them, in source order.
struct CommentCollector<'s, 'a> {
    source: &'s Source<'a>,
    owned: Vec<bool>,
    claimed: Vec<bool>,
    /// Line of the last entry or item that received comments. Alias copies
    /// carry earlier lines and are skipped.
    last_line: usize,
}

impl<'s, 'a> CommentCollector<'s, 'a> {
    fn new(source: &'s Source<'a>, owned: Vec<bool>) -> Self {
        let claimed = vec![false; owned.len()];
        Self {
            source,
            owned,
            claimed,
            last_line: 0,
        }
    }

    fn collect(&mut self, doc: &mut Document) {
        if let Some(root) = doc.root() {
            self.visit(doc, root);
        }
        doc.foot_comments = self.foot_comments();
    }

    fn visit(&mut self, doc: &mut Document, id: NodeId) {
        let node = doc.node(id);
        if !node.is_block_collection() {
            return;
        }
        match &node.kind {
            NodeKind::Mapping { entries, .. } => {
                let plan: Vec<(Mark, usize, NodeId)> = entries
                    .iter()
                    .map(|entry| {
                        let key = &entry.key;
                        let key_end = self.source.scalar_end(key.mark, key.end, key.style);
                        (key.mark, key_end, entry.value)
                    })
                    .collect();
                for (index, (key_mark, key_end, value)) in plan.into_iter().enumerate() {
                    if key_mark.line < self.last_line {
                        continue;
                    }
                    let comments = Comments {
                        head: self.head_comments(key_mark.line),
                        line: self.entry_line_comment(doc, key_end, value),
                    };
                    self.last_line = key_mark.line;
                    if let NodeKind::Mapping { entries, .. } = &mut doc.node_mut(id).kind {
                        entries[index].comments = comments;
                    }
                    self.visit(doc, value);
                }
            }
            NodeKind::Sequence { items, .. } => {
                let plan: Vec<NodeId> = items.iter().map(|item| item.value).collect();
                for (index, value) in plan.into_iter().enumerate() {
                    let value_node = doc.node(value);
                    let line = value_node.mark.line;
                    if line < self.last_line {
                        continue;
                    }
                    let (head_line, trailing) = if value_node.is_block_collection() {
                        match self.dash_line_comment(value_node) {
                            Some((dash, comment)) => (dash, Some(comment)),
                            None => (line, None),
                        }
                    } else {
                        (line, self.value_line_comment(value_node))
                    };
                    let comments = Comments {
                        head: self.head_comments(head_line),
                        line: trailing,
                    };
                    self.last_line = line;
                    if let NodeKind::Sequence { items, .. } = &mut doc.node_mut(id).kind {
                        items[index].comments = comments;
                    }
                    self.visit(doc, value);
                }
            }
            NodeKind::Scalar(_) => {}
        }
    }

    fn available(&self, line: usize) -> bool {
        !self.owned.get(line).copied().unwrap_or(true)
            && !self.claimed.get(line).copied().unwrap_or(true)
    }

    fn head_comments(&mut self, line: usize) -> Vec<String> {
        let mut head = Vec::new();
        let mut current = line.saturating_sub(1);
        while current >= 1 && self.available(current) {
            let trimmed = self.source.lines[current - 1].trim();
            if trimmed.is_empty() {
                head.push(String::new());
            } else if trimmed.starts_with('#') {
                head.push(trimmed.to_string());
            } else if trimmed != "---" && !trimmed.starts_with('%') {
                break;
            }
            self.claimed[current] = true;
            current -= 1;
        }
        head.reverse();
        head
    }

    /// Comment on a bare `-` line above a block collection item, with the
    /// dash's line number. The dash line is claimed.
    fn dash_line_comment(&mut self, node: &Node) -> Option<(usize, String)> {
        let first = self.source.lines.get(node.mark.line.checked_sub(1)?)?;
        if !first
            .chars()
            .take(node.mark.column.saturating_sub(1))
            .all(char::is_whitespace)
        {
            return None;
        }
        let mut line = node.mark.line - 1;
        while line >= 1 && self.available(line) {
            let trimmed = self.source.lines[line - 1].trim();
            if let Some(rest) = trimmed.strip_prefix('-') {
                let rest = rest.trim_start();
                if !rest.starts_with('#') {
                    return None;
                }
                let comment = rest.to_string();
                self.claimed[line] = true;
                return Some((line, comment));
            }
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return None;
            }
            line -= 1;
        }
        None
    }

    fn entry_line_comment(&self, doc: &Document, key_end: usize, value: NodeId) -> Option<String> {
        let node = doc.node(value);
        if node.is_block_collection() || node.mark.offset == node.end.offset {
            return self.comment_after(key_end);
        }
        self.value_line_comment(node)
    }

    fn value_line_comment(&self, node: &Node) -> Option<String> {
        match &node.kind {
            NodeKind::Scalar(scalar) if scalar.style.is_block() => None,
            _ if node.mark.offset == node.end.offset => None,
            NodeKind::Scalar(scalar) => {
                self.comment_after(self.source.scalar_end(node.mark, node.end, scalar.style))
            }
            _ => self.comment_after(node.end.offset),
        }
    }

    /// `# ...` following `from` on the same line, skipping a `:` indicator.
    fn comment_after(&self, from: usize) -> Option<String> {
        let rest = self.source.text.get(from..)?;
        let line = rest.split('\n').next().unwrap_or_default();
        let line = line.trim();
        let line = line.strip_prefix(':').unwrap_or(line).trim_start();
        line.starts_with('#').then(|| line.to_string())
    }

    fn foot_comments(&self) -> Vec<String> {
        let last_owned = self.owned.iter().rposition(|owned| *owned).unwrap_or(0);
        let mut foot: Vec<String> = (last_owned + 1..=self.source.lines.len())
            .filter(|line| !self.claimed[*line])
            .filter_map(|line| {
                let trimmed = self.source.lines[line - 1].trim();
                if trimmed.is_empty() {
                    Some(String::new())
                } else if trimmed.starts_with('#') {
                    Some(trimmed.to_string())
                } else {
                    None
                }
            })
            .collect();
        while foot.last().is_some_and(String::is_empty) {
            foot.pop();
        }
        foot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(text: &str) -> Document {
        parse(text, &ParserConfig::default()).unwrap()
    }

    fn root_entries(doc: &Document) -> &[Entry] {
        match &doc.node(doc.root().unwrap()).kind {
            NodeKind::Mapping { entries, .. } => entries,
            other => panic!("expected mapping root, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_and_oversized_input() {
        let config = ParserConfig::default();
        assert!(matches!(
            parse("", &config),
            Err(YamlError::Validation { .. })
        ));
        assert!(matches!(
            parse("   \n", &config),
            Err(YamlError::Validation { .. })
        ));

        let small = ParserConfig {
            max_document_bytes: 8,
            ..ParserConfig::default()
        };
        assert!(matches!(
            parse("tag: v1.2.3\n", &small),
            Err(YamlError::Validation { .. })
        ));
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = parse("a: [1, 2\nb: 3\n", &ParserConfig::default()).unwrap_err();
        match err {
            YamlError::Syntax { line, column, .. } => {
                assert!(line >= 1);
                assert!(column >= 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_multiple_documents() {
        let err = parse("a: 1\n---\nb: 2\n", &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, YamlError::Syntax { .. }));
    }

    #[test]
    fn rejects_complex_keys() {
        let err = parse("? [a, b]\n: value\n", &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, YamlError::Syntax { .. }));
    }

    #[test]
    fn records_positions_and_styles() {
        let doc = parse_default("name: app\nimage:\n  tag: \"v1.0\"\n");
        let entries = root_entries(&doc);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key.text, "name");
        assert_eq!(entries[0].key.mark.line, 1);
        assert_eq!(entries[0].key.mark.column, 1);

        let image = doc.node(entries[1].value);
        let NodeKind::Mapping { entries: inner, flow } = &image.kind else {
            panic!("image should be a mapping");
        };
        assert!(!flow);
        let tag = doc.node(inner[0].value);
        assert_eq!(tag.mark.line, 3);
        assert_eq!(tag.mark.column, 8);
        let scalar = tag.as_scalar().unwrap();
        assert_eq!(scalar.value, "v1.0");
        assert_eq!(scalar.style, ScalarStyle::DoubleQuoted);
    }

    #[test]
    fn detects_flow_collections_and_empty_values() {
        let doc = parse_default("args: [a, b]\nlabels: {}\nempty:\n");
        let entries = root_entries(&doc);
        assert!(matches!(
            doc.node(entries[0].value).kind,
            NodeKind::Sequence { flow: true, .. }
        ));
        assert!(matches!(
            doc.node(entries[1].value).kind,
            NodeKind::Mapping { flow: true, .. }
        ));
        let empty = doc.node(entries[2].value).as_scalar().unwrap();
        assert_eq!(empty.value, "");
        assert_eq!(empty.style, ScalarStyle::Plain);
    }

    #[test]
    fn expands_aliases() {
        let doc = parse_default("base: &base\n  tag: v1\ncopy: *base\n");
        let entries = root_entries(&doc);
        assert_ne!(entries[0].value, entries[1].value);
        let NodeKind::Mapping { entries: copied, .. } = &doc.node(entries[1].value).kind else {
            panic!("alias should expand to a mapping");
        };
        assert_eq!(copied[0].key.text, "tag");
    }

    #[test]
    fn anchored_flow_collections_stay_flow() {
        let doc = parse_default("ports: &ports [80, 443]\nsame: *ports\n");
        let entries = root_entries(&doc);
        for entry in entries {
            assert!(matches!(
                doc.node(entry.value).kind,
                NodeKind::Sequence { flow: true, .. }
            ));
        }
    }

    #[test]
    fn nested_alias_expansion_is_bounded() {
        let mut text = format!("a0: &a0 [{}]\n", vec!["x"; 10].join(", "));
        for level in 1..=8 {
            let refs = vec![format!("*a{}", level - 1); 10].join(", ");
            text.push_str(&format!("a{level}: &a{level} [{refs}]\n"));
        }
        let err = parse(&text, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, YamlError::Validation { .. }), "{err:?}");
        assert!(err.to_string().contains("alias expansion"));
    }

    #[test]
    fn keeps_block_scalar_styles_and_content() {
        let doc = parse_default("config: |\n  # not a comment\n\n  port = 80\nmsg: >-\n  folded\ntag: v1\n");
        let entries = root_entries(&doc);
        let config = doc.node(entries[0].value).as_scalar().unwrap();
        assert_eq!(config.style, ScalarStyle::Literal);
        assert_eq!(config.value, "# not a comment\n\nport = 80\n");
        assert!(entries[0].comments.is_empty());
        let msg = doc.node(entries[1].value).as_scalar().unwrap();
        assert_eq!(msg.style, ScalarStyle::Folded);
        assert!(entries[2].comments.head.is_empty());
    }

    #[test]
    fn finds_comments_after_quoted_values() {
        let doc = parse_default("a: \"v1\" # pinned\nb: 'it''s' # quoted\nc: \"x # y\"\n");
        let entries = root_entries(&doc);
        assert_eq!(entries[0].comments.line.as_deref(), Some("# pinned"));
        assert_eq!(entries[1].comments.line.as_deref(), Some("# quoted"));
        assert_eq!(entries[2].comments.line, None);
    }

    #[test]
    fn attaches_dash_line_comments_to_items() {
        let doc = parse_default("items:\n  # first item\n  - # note\n    name: a\n  - name: b # inline\n");
        let NodeKind::Sequence { items, .. } = &doc.node(root_entries(&doc)[0].value).kind else {
            panic!("expected a sequence");
        };
        assert_eq!(items[0].comments.head, vec!["# first item".to_string()]);
        assert_eq!(items[0].comments.line.as_deref(), Some("# note"));
        assert_eq!(items[1].comments.line, None);
    }

    #[test]
    fn attaches_head_line_and_foot_comments() {
        let text = "# leading\nname: app # the name\n\n# image settings\nimage:\n  tag: v1\n# trailing\n";
        let doc = parse_default(text);
        let entries = root_entries(&doc);
        assert_eq!(entries[0].comments.head, vec!["# leading".to_string()]);
        assert_eq!(entries[0].comments.line.as_deref(), Some("# the name"));
        assert_eq!(
            entries[1].comments.head,
            vec![String::new(), "# image settings".to_string()]
        );
        assert_eq!(doc.foot_comments(), &["# trailing".to_string()]);
    }

    #[test]
    fn comments_are_dropped_when_disabled() {
        let config = ParserConfig {
            preserve_comments: false,
            ..ParserConfig::default()
        };
        let doc = parse("# leading\nname: app # c\n", &config).unwrap();
        let entries = root_entries(&doc);
        assert!(entries[0].comments.is_empty());
        assert!(doc.foot_comments().is_empty());
    }

    #[test]
    fn handles_multibyte_text_before_values() {
        let doc = parse_default("título: café\ntag: v1\n");
        let entries = root_entries(&doc);
        let tag = doc.node(entries[1].value);
        assert_eq!(tag.mark.line, 2);
        assert_eq!(tag.as_scalar().unwrap().value, "v1");
        assert_eq!(&"título: café\ntag: v1\n"[tag.mark.offset..tag.mark.offset + 2], "v1");
    }
}
