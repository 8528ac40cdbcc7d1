//! Reserved words per WDL version.

use crate::parser::Version;

/// Keywords common to every supported version.
const COMMON: &[&str] = &[
    "version",
    "import",
    "as",
    "task",
    "workflow",
    "struct",
    "call",
    "scatter",
    "if",
    "then",
    "else",
    "input",
    "output",
    "command",
    "runtime",
    "meta",
    "parameter_meta",
    "in",
    "alias",
    "object",
];

/// Additional reserved words in WDL >= 2.0.
const V2: &[&str] = &["hints", "requirements", "after"];

pub fn is_keyword(word: &str, version: Version) -> bool {
    if COMMON.contains(&word) {
        return true;
    }
    match version {
        Version::Draft2 | Version::V1_0 => false,
        Version::V2_0 => V2.contains(&word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_keywords() {
        assert!(is_keyword("task", Version::Draft2));
        assert!(is_keyword("scatter", Version::V1_0));
        assert!(!is_keyword("frobnicate", Version::V2_0));
    }

    #[test]
    fn test_version_gated_keywords() {
        assert!(is_keyword("hints", Version::V2_0));
        assert!(!is_keyword("hints", Version::V1_0));
        assert!(is_keyword("after", Version::V2_0));
        assert!(!is_keyword("after", Version::Draft2));
    }
}
