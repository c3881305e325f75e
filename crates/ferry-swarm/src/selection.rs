//! Payload file selection.

use ferry_core::SwarmFile;

/// Index and metadata of the largest file; the first-listed file wins ties.
#[must_use]
pub fn select_largest(files: &[SwarmFile]) -> Option<(usize, &SwarmFile)> {
    files
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &SwarmFile)>, (index, file)| match best {
            Some((_, current)) if current.length >= file.length => best,
            _ => Some((index, file)),
        })
}

/// Case-insensitive file extension allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAllowList {
    extensions: Vec<String>,
}

impl ExtensionAllowList {
    /// Normalise `extensions` (lowercase, no leading dot, no blanks).
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
        }
    }

    /// Whether `file_name` carries an allowed extension.
    #[must_use]
    pub fn allows(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| {
                !stem.is_empty()
                    && self
                        .extensions
                        .iter()
                        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Normalised extensions in configuration order.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, length: u64) -> SwarmFile {
        SwarmFile {
            name: name.into(),
            length,
        }
    }

    #[test]
    fn largest_file_wins_and_ties_keep_first() {
        let files = vec![
            file("readme.txt", 10),
            file("game.nsp", 500),
            file("game-copy.xci", 500),
        ];
        let (index, chosen) = select_largest(&files).expect("non-empty");
        assert_eq!(index, 1);
        assert_eq!(chosen.name, "game.nsp");
        assert!(select_largest(&[]).is_none());
    }

    #[test]
    fn allow_list_ignores_case_and_dots() {
        let allow = ExtensionAllowList::new([".NSP", "xci", " nsz "]);
        assert_eq!(allow.extensions(), ["nsp", "xci", "nsz"]);
        assert!(allow.allows("Celeste.NSP"));
        assert!(allow.allows("dir/Game.v2.xci"));
        assert!(!allow.allows("Game.zip"));
        assert!(!allow.allows("nsp"));
        assert!(!allow.allows(".nsp"));
    }

    #[test]
    fn repeated_extensions_keep_first_position() {
        let allow = ExtensionAllowList::new(["nsp", "xci", ".NSP", "xci"]);
        assert_eq!(allow.extensions(), ["nsp", "xci"]);
    }
}
