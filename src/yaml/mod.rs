//! YAML parsing, tag discovery and re-emission.
//!
//! Documents are parsed into an arena ([`tree::Document`]), scanned for
//! tag-like fields ([`locator`]), edited in place and written back out by the
//! block-style [`emitter`].

pub mod editor;
pub mod emitter;
pub mod errors;
pub mod locator;
pub mod parser;
pub mod path;
pub mod scalar;
pub mod tree;

pub use editor::{validate_tag_value, ParseResult, TagEditor, MAX_TAG_VALUE_LENGTH};
pub use errors::YamlError;
pub use locator::{DefaultTagHeuristic, TagHeuristic, TagLocation};
pub use path::TagPath;
pub use tree::{Document, NodeRef, ScalarStyle};
