//! URL-safe slug derivation for catalog names.

/// Derives a URL-safe slug from a display name.
///
/// Lowercases the input, keeps ASCII alphanumerics, and collapses any run
/// of whitespace, underscores, or hyphens into a single hyphen. Everything
/// else is dropped. The result carries no leading or trailing hyphen and
/// may be empty if the input has no usable characters.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
        }
        // any other character is dropped without forcing a separator
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Number Theory"), "number-theory");
        assert_eq!(slugify("Grade 7"), "grade-7");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("intro  --  to_sets"), "intro-to-sets");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn drops_punctuation() {
        assert_eq!(slugify("What's a prime?"), "whats-a-prime");
        assert_eq!(slugify("100% complete!"), "100-complete");
    }

    #[test]
    fn may_be_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }
}
