//! Version-dispatched WDL parser.
//!
//! The language version is detected from the `version` directive before
//! tokenization (its value, `draft-2`, does not survive tokenizing), then
//! the matching version grammar builds the CST. A document without a
//! directive is draft-2.

pub mod cst;
pub mod declarations;
pub mod document;
pub mod expressions;
pub mod keywords;
pub mod lexer;
pub mod statements;
pub mod tasks;
pub mod token_stream;
pub mod tokens;
pub mod types;

use crate::error::{SourcePosition, WdlError};
use token_stream::TokenStream;

/// A supported WDL language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Version {
    /// Pre-1.0 WDL; no `version` directive, no input sections.
    Draft2,
    /// WDL 1.0 (and the compatible 1.1).
    V1_0,
    /// WDL 2.0, a.k.a. "development".
    V2_0,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Draft2 => "draft-2",
            Version::V1_0 => "1.0",
            Version::V2_0 => "2.0",
        }
    }

    pub fn from_directive(value: &str) -> Option<Version> {
        match value {
            "draft-2" => Some(Version::Draft2),
            "1.0" | "1.1" => Some(Version::V1_0),
            "2.0" | "development" => Some(Version::V2_0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior toggles for parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Reject a written `T??` instead of flattening to `T?`.
    pub strict_double_optional: bool,
}

/// Read the `version` directive off the raw text: the first line that is
/// not blank and not a comment must be the directive, if there is one.
pub fn detect_version(source: &str, uri: &str) -> Result<Version, WdlError> {
    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix("version") else {
            return Ok(Version::Draft2);
        };
        if !rest.starts_with(char::is_whitespace) {
            // e.g. an identifier like `versioned_thing`; not a directive.
            return Ok(Version::Draft2);
        }
        let value = rest.trim();
        return Version::from_directive(value).ok_or_else(|| {
            WdlError::syntax(
                SourcePosition::new(
                    uri.to_string(),
                    uri.to_string(),
                    index as u32 + 1,
                    1,
                    index as u32 + 1,
                    line.chars().count() as u32 + 1,
                ),
                format!("unsupported WDL version '{}'", value),
                value,
            )
        });
    }
    Ok(Version::Draft2)
}

/// Parse a document, detecting its version.
pub fn parse_document(source: &str, uri: &str) -> Result<cst::Document, WdlError> {
    parse_document_with_options(source, uri, uri, ParserOptions::default())
}

/// Parse with explicit canonical path and options.
pub fn parse_document_with_options(
    source: &str,
    uri: &str,
    abspath: &str,
    options: ParserOptions,
) -> Result<cst::Document, WdlError> {
    let version = detect_version(source, uri)?;
    log::trace!("parsing {} as WDL {}", uri, version);
    match version {
        Version::Draft2 => draft2::parse(source, uri, abspath, options),
        Version::V1_0 => v1::parse(source, uri, abspath, options),
        Version::V2_0 => v2::parse(source, uri, abspath, options),
    }
}

fn parse_with_version(
    source: &str,
    uri: &str,
    abspath: &str,
    version: Version,
    options: ParserOptions,
) -> Result<cst::Document, WdlError> {
    let mut stream = TokenStream::new(source, uri, abspath, version);
    stream.strict_double_optional = options.strict_double_optional;
    document::parse_document(&mut stream, uri, abspath)
}

/// Draft-2 grammar: no `version` directive required, bare task/workflow
/// inputs, `${}` placeholders.
pub mod draft2 {
    use super::*;

    pub fn parse(
        source: &str,
        uri: &str,
        abspath: &str,
        options: ParserOptions,
    ) -> Result<cst::Document, WdlError> {
        parse_with_version(source, uri, abspath, Version::Draft2, options)
    }
}

/// WDL 1.0 grammar: `input {}` sections, struct definitions.
pub mod v1 {
    use super::*;

    pub fn parse(
        source: &str,
        uri: &str,
        abspath: &str,
        options: ParserOptions,
    ) -> Result<cst::Document, WdlError> {
        parse_with_version(source, uri, abspath, Version::V1_0, options)
    }
}

/// WDL 2.0 ("development") grammar: `Directory`, `hints`, struct literals,
/// `after` clauses.
pub mod v2 {
    use super::*;

    pub fn parse(
        source: &str,
        uri: &str,
        abspath: &str,
        options: ParserOptions,
    ) -> Result<cst::Document, WdlError> {
        parse_with_version(source, uri, abspath, Version::V2_0, options)
    }
}
