//! Payload filename parsing.

use regex::Regex;
use serde::Serialize;

use crate::error::{MetadataError, MetadataResult};
use crate::index::FuzzyIndex;
use crate::keys::collapse_whitespace;

const ANNOTATION_PATTERN: &str = r"\[([^\]]*)\]|\(([^)]*)\)";
const TITLE_ID_PATTERN: &str = r"^[0-9A-Fa-f]{16}$";
const VERSION_PATTERN: &str = r"^[vV](\d+)$";

/// Identity extracted from a payload filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFilename {
    /// Name with extension and annotations removed.
    pub clean_name: String,
    /// Canonical 16-hex-digit title identifier, explicit or looked up.
    pub title_id: Option<String>,
    /// Release version from a `v<digits>` annotation.
    pub version: Option<u64>,
}

/// Compiled patterns for filename parsing.
#[derive(Debug, Clone)]
pub struct FilenameParser {
    annotation: Regex,
    title_id: Regex,
    version: Regex,
}

fn compile(pattern: &'static str) -> MetadataResult<Regex> {
    Regex::new(pattern).map_err(|source| MetadataError::RegexCompile { pattern, source })
}

impl FilenameParser {
    /// Compile the parser patterns.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::RegexCompile`] if a pattern fails to compile.
    pub fn new() -> MetadataResult<Self> {
        Ok(Self {
            annotation: compile(ANNOTATION_PATTERN)?,
            title_id: compile(TITLE_ID_PATTERN)?,
            version: compile(VERSION_PATTERN)?,
        })
    }

    /// Parse `filename` into a clean name, title identifier and version.
    ///
    /// A title identifier inside `[...]` or `(...)` takes precedence and the
    /// index is not consulted; otherwise the clean name is looked up.
    #[must_use]
    pub fn parse(&self, filename: &str, index: &FuzzyIndex) -> ParsedFilename {
        let stem = strip_extension(filename.trim());

        let mut title_id = None;
        let mut version = None;
        for captures in self.annotation.captures_iter(stem) {
            let inner = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map_or("", |m| m.as_str())
                .trim();
            if title_id.is_none() && self.title_id.is_match(inner) {
                title_id = Some(inner.to_ascii_uppercase());
            } else if version.is_none() {
                version = self
                    .version
                    .captures(inner)
                    .and_then(|caps| caps.get(1))
                    .and_then(|digits| digits.as_str().parse::<u64>().ok());
            }
        }

        let clean_name = collapse_whitespace(&self.annotation.replace_all(stem, " "));
        if title_id.is_none() {
            title_id = index.lookup(&clean_name).map(str::to_string);
        }

        ParsedFilename {
            clean_name,
            title_id,
            version,
        }
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=4).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> FilenameParser {
        FilenameParser::new().expect("patterns compile")
    }

    #[test]
    fn explicit_annotations_take_precedence() {
        let mut index = FuzzyIndex::new();
        index.insert_record("Super Mario Odyssey", "FFFFFFFFFFFFFFFF");

        let parsed = parser().parse(
            "Super Mario Odyssey [0100000000010000][v65536].nsp",
            &index,
        );
        assert_eq!(parsed.clean_name, "Super Mario Odyssey");
        assert_eq!(parsed.title_id.as_deref(), Some("0100000000010000"));
        assert_eq!(parsed.version, Some(65_536));
    }

    #[test]
    fn falls_back_to_index_lookup() {
        let mut index = FuzzyIndex::new();
        index.insert_record("Hollow Knight", "0100633007D48000");

        let parsed = parser().parse("Hollow Knight (US) [v0].xci", &index);
        assert_eq!(parsed.clean_name, "Hollow Knight");
        assert_eq!(parsed.title_id.as_deref(), Some("0100633007D48000"));
        assert_eq!(parsed.version, Some(0));
    }

    #[test]
    fn unknown_titles_have_no_identifier() {
        let parsed = parser().parse("Homebrew_Tool.nsz", &FuzzyIndex::new());
        assert_eq!(parsed.clean_name, "Homebrew_Tool");
        assert_eq!(parsed.title_id, None);
        assert_eq!(parsed.version, None);
    }

    #[test]
    fn lowercase_identifiers_are_uppercased() {
        let parsed = parser().parse("Demo [01007ef00011e000].nsp", &FuzzyIndex::new());
        assert_eq!(parsed.title_id.as_deref(), Some("01007EF00011E000"));
    }

    #[test]
    fn extension_stripping_ignores_dotted_names() {
        assert_eq!(strip_extension("Game v1.0 final"), "Game v1.0 final");
        assert_eq!(strip_extension("Game.nsp"), "Game");
        assert_eq!(strip_extension(".nsp"), ".nsp");
    }
}
