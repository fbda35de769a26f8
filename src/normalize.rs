// 🔤 Name Normalizer - canonical player names for comparison
// Fantrax exports plain ASCII while NHL.com keeps the accented spelling
// ("Stutzle" vs "Stützle"), so both sides are folded before any match.

// ============================================================================
// SUBSTITUTION TABLE
// ============================================================================

/// Fixed diacritic → ASCII substitutions seen on NHL rosters.
/// Extending the table is data-only; the fold itself never changes.
const REPLACEMENTS: &[(char, &str)] = &[
    // Lowercase
    ('á', "a"), ('à', "a"), ('â', "a"), ('ä', "a"), ('å', "a"), ('ā', "a"),
    ('é', "e"), ('è', "e"), ('ê', "e"), ('ë', "e"), ('ě', "e"),
    ('í', "i"), ('ì', "i"), ('î', "i"), ('ï', "i"),
    ('ó', "o"), ('ò', "o"), ('ô', "o"), ('ö', "o"), ('ø', "o"),
    ('ú', "u"), ('ù', "u"), ('û', "u"), ('ü', "u"), ('ů', "u"),
    ('ý', "y"),
    ('č', "c"), ('ç', "c"), ('ć', "c"),
    ('ľ', "l"), ('ĺ', "l"),
    ('ň', "n"), ('ñ', "n"),
    ('ř', "r"),
    ('š', "s"),
    ('ť', "t"),
    ('ž', "z"),
    // Uppercase
    ('Á', "A"), ('À', "A"), ('Ä', "A"), ('Å', "A"),
    ('É', "E"), ('È', "E"),
    ('Ö', "O"), ('Ø', "O"),
    ('Ü', "U"),
    ('Č', "C"), ('Ć', "C"),
    ('Š', "S"),
    ('Ž', "Z"),
];

// ============================================================================
// FOLDING
// ============================================================================

/// Replace known special characters with their closest ASCII equivalent and
/// collapse whitespace runs to single spaces.
///
/// Pure and idempotent: applying twice yields the same string as once, and a
/// name with no matching characters comes back unchanged.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for word in name.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for ch in word.chars() {
            match REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
                Some((_, to)) => out.push_str(to),
                None => out.push(ch),
            }
        }
    }

    out
}

/// Everything after the first whitespace-separated token, so multi-word last
/// names ("van Riemsdyk", "Del Zotto") survive intact.
/// Returns an empty string for single-token names.
pub fn last_name(name: &str) -> String {
    let mut words = name.split_whitespace();
    words.next(); // drop the first name
    words.collect::<Vec<_>>().join(" ")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_known_diacritics() {
        assert_eq!(normalize_name("Tim Stützle"), "Tim Stutzle");
        assert_eq!(normalize_name("Alexis Lafrenière"), "Alexis Lafreniere");
        assert_eq!(normalize_name("Jiří Kulich"), "Jiri Kulich");
        assert_eq!(normalize_name("Rasmus Ristolainen"), "Rasmus Ristolainen");
    }

    #[test]
    fn test_untouched_when_no_matches() {
        let plain = "Leon Draisaitl";
        assert_eq!(normalize_name(plain), plain);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_name("  Juraj  Slafkovský ");
        let twice = normalize_name(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "Juraj Slafkovsky");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize_name("  Connor   McDavid "), "Connor McDavid");
    }

    #[test]
    fn test_last_name_multi_word() {
        assert_eq!(last_name("James van Riemsdyk"), "van Riemsdyk");
        assert_eq!(last_name("Leon Draisaitl"), "Draisaitl");
        assert_eq!(last_name("Pelé"), "");
    }
}
