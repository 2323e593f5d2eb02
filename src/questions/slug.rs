//! URL slugs derived from question titles.

/// Used when a title contains nothing sluggable
const FALLBACK_SLUG: &str = "question";

/// Static segments under `/questions/` that a slug must not shadow
const RESERVED_SLUGS: &[&str] = &["create"];

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' => ch,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// The `attempt`-th candidate for `base`: `base`, `base-2`, `base-3`, ...
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}
