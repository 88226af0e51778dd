//! Layer name normalization.

use unicode_normalization::UnicodeNormalization;

/// Normalize a user supplied layer name into a catalog-safe one.
///
/// Dots become underscores. The name is then folded to ASCII (NFKD, with
/// anything left outside ASCII dropped), stripped of everything but
/// alphanumerics, `_`, `-` and whitespace, trimmed and lowercased. Runs of
/// whitespace or hyphens collapse into a single `-`.
pub fn layer_name(raw: &str) -> String {
    let kept: String = raw
        .replace('.', "_")
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_ascii_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.trim().to_ascii_lowercase().chars() {
        if c == '-' || c.is_ascii_whitespace() {
            if !in_separator {
                slug.push('-');
            }
            in_separator = true;
        } else {
            slug.push(c);
            in_separator = false;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::layer_name;

    #[test]
    fn test_dots_and_spaces() {
        assert_eq!(layer_name("Roads v1.2"), "roads-v1_2");
        assert_eq!(layer_name("  Land   Use -- 2020 "), "land-use-2020");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(layer_name("Parks & Gardens!"), "parks-gardens");
        assert_eq!(layer_name("__private__"), "__private__");
        assert_eq!(layer_name("-edge-"), "-edge-");
    }

    #[test]
    fn test_accents_fold_to_ascii() {
        assert_eq!(layer_name("Café Noir"), "cafe-noir");
        assert_eq!(layer_name("Zürich Straßen"), "zurich-straen");
        assert_eq!(layer_name("ﬁeld 2"), "field-2");
        assert_eq!(layer_name("東京"), "");
    }

    #[test]
    fn test_already_clean() {
        assert_eq!(layer_name("wells"), "wells");
    }
}
