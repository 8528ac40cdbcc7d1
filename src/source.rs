//! Source access and comment tracking.
//!
//! Documents are identified by URI. The front-end never opens files itself:
//! callers inject a [`SourceReader`], and the filesystem-backed
//! [`FileSourceReader`] is the default. Comments lexed out of a document are
//! collected in a [`CommentMap`] keyed by line for consumers (formatters,
//! doc generators) that need them.

use crate::error::{SourcePosition, WdlError};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Range;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// Supplies document text by URI.
///
/// `read` returns the text and the canonical URI the document should be
/// registered under; relative imports are resolved against the importing
/// document's canonical URI.
pub trait SourceReader {
    fn read(&self, uri: &str) -> Result<(String, String), WdlError>;

    /// Resolve `import_uri` relative to the canonical URI of the importer.
    fn resolve(&self, base: &str, import_uri: &str) -> String;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Default)]
pub struct FileSourceReader;

impl FileSourceReader {
    pub fn new() -> Self {
        Self
    }
}

impl SourceReader for FileSourceReader {
    fn read(&self, uri: &str) -> Result<(String, String), WdlError> {
        let path = Path::new(uri);
        let text = std::fs::read_to_string(path).map_err(|e| WdlError::Import {
            pos: SourcePosition::unknown(),
            message: format!("failed to read {}", uri),
            cause: Some(Box::new(e)),
        })?;
        let canonical = path
            .canonicalize()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| uri.to_string());
        Ok((text, canonical))
    }

    fn resolve(&self, base: &str, import_uri: &str) -> String {
        if Path::new(import_uri).is_absolute() {
            return import_uri.to_string();
        }
        // file URIs and plain paths both resolve against the importer's
        // directory; remote URLs go through the url crate.
        if base.contains("://") || import_uri.contains("://") {
            if let Ok(base_url) = url::Url::parse(base) {
                if let Ok(joined) = base_url.join(import_uri) {
                    return joined.to_string();
                }
            }
            return import_uri.to_string();
        }
        let mut dir = PathBuf::from(base);
        dir.pop();
        dir.join(import_uri).to_string_lossy().into_owned()
    }
}

/// A source comment. A leading `##` marks it pre-formatted. A comment on
/// its own line attaches to the nearest following syntactic element; an
/// end-of-line comment attaches to the preceding one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub preformatted: bool,
    pub own_line: bool,
    pub pos: SourcePosition,
}

impl Comment {
    pub fn new(text: String, pos: SourcePosition, own_line: bool) -> Self {
        let preformatted = text.starts_with("##");
        Self {
            text,
            preformatted,
            own_line,
            pos,
        }
    }
}

/// Comments of one document, sorted by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentMap {
    by_line: BTreeMap<u32, Comment>,
}

impl CommentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, comment: Comment) {
        self.by_line.insert(comment.pos.line, comment);
    }

    pub fn get(&self, line: u32) -> Option<&Comment> {
        self.by_line.get(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_line.len()
    }

    /// Comments with `start_line <= line < end_line`.
    pub fn range(&self, start_line: u32, end_line: u32) -> Range<'_, u32, Comment> {
        self.by_line
            .range((Bound::Included(start_line), Bound::Excluded(end_line)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.by_line.values()
    }
}
