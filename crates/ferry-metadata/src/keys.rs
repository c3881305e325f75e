//! Lookup-key derivations shared by index construction and lookup.
//!
//! Both sides derive keys in the same order, so a lookup tries the most
//! specific spelling first and falls back to looser word phrases.

/// Lowercase alphanumerics only: `"Zelda: BotW!"` becomes `"zeldabotw"`.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Trimmed lowercase spelling.
#[must_use]
pub fn lowercase(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Lowercase with `&` spelled out, trademark glyphs and apostrophes removed,
/// other punctuation turned into spaces, and whitespace collapsed.
#[must_use]
pub fn strip_symbols(value: &str) -> String {
    let lowered = value.to_lowercase().replace('&', " and ");
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            '™' | '®' | '©' | '℠' | '\'' | '’' => {}
            c if c.is_alphanumeric() || c.is_whitespace() => out.push(c),
            _ => out.push(' '),
        }
    }
    collapse_whitespace(&out)
}

/// Every lookup key for `name`, most specific first, without duplicates.
///
/// Order: normalized, lowercase, symbol-stripped, normalized symbol-stripped,
/// then the first two and first three significant words (longer than two
/// characters).
#[must_use]
pub fn derive_keys(name: &str) -> Vec<String> {
    let stripped = strip_symbols(name);
    let words: Vec<&str> = stripped
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .collect();

    let mut candidates = vec![
        normalize(name),
        lowercase(name),
        stripped.clone(),
        normalize(&stripped),
    ];
    if let Some(pair) = words.get(..2) {
        candidates.push(pair.join(" "));
    }
    if let Some(triple) = words.get(..3) {
        candidates.push(triple.join(" "));
    }

    let mut keys: Vec<String> = Vec::with_capacity(candidates.len());
    for key in candidates {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Remove bracketed/parenthesised annotations, emoji and flag glyphs.
#[must_use]
pub fn strip_decorations(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut square = 0_usize;
    let mut round = 0_usize;
    for c in raw.chars() {
        match c {
            '[' => square += 1,
            ']' => square = square.saturating_sub(1),
            '(' => round += 1,
            ')' => round = round.saturating_sub(1),
            _ if square > 0 || round > 0 => {}
            c if is_pictograph(c) => {}
            c => out.push(c),
        }
    }
    collapse_whitespace(&out)
}

const fn is_pictograph(c: char) -> bool {
    matches!(
        c as u32,
        0x1F1E6..=0x1F1FF
            | 0x1F000..=0x1F0FF
            | 0x1F300..=0x1FAFF
            | 0x2190..=0x21FF
            | 0x2300..=0x23FF
            | 0x25A0..=0x25FF
            | 0x2600..=0x27BF
            | 0x2934..=0x2935
            | 0x2B00..=0x2BFF
            | 0x203C
            | 0x2049
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0xFE0F
            | 0x200D
    )
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivations_follow_documented_order() {
        let keys = derive_keys("The Legend of Zelda™: Breath of the Wild");
        assert_eq!(
            keys,
            vec![
                "thelegendofzeldabreathofthewild",
                "the legend of zelda™: breath of the wild",
                "the legend of zelda breath of the wild",
                "the legend",
                "the legend zelda",
            ]
        );
    }

    #[test]
    fn ampersands_are_spelled_out() {
        assert_eq!(strip_symbols("Mario & Luigi's"), "mario and luigis");
        let keys = derive_keys("Mario & Sonic");
        assert!(keys.contains(&"marioandsonic".to_string()));
        assert!(keys.contains(&"mariosonic".to_string()));
    }

    #[test]
    fn short_names_skip_phrase_keys() {
        assert_eq!(derive_keys("Tetris 99"), vec!["tetris99", "tetris 99"]);
        assert!(derive_keys("  ").is_empty());
    }

    #[test]
    fn decorations_are_removed() {
        assert_eq!(
            strip_decorations("Pokémon Violet 🇺🇸 [Update] (EU) 🎮"),
            "Pokémon Violet"
        );
        assert_eq!(strip_decorations("Game [a [nested] note] Name"), "Game Name");
    }

    #[test]
    fn symbol_glyphs_are_removed_but_punctuation_stays() {
        assert_eq!(strip_decorations("⭐ Kirby ⬛ Star Allies ‼"), "Kirby Star Allies");
        assert_eq!(strip_decorations("▶ Tetris⁉ ⏩"), "Tetris");
        assert_eq!(
            strip_decorations("Assassin’s Creed – Rebel Collection"),
            "Assassin’s Creed – Rebel Collection"
        );
    }
}
