//! Pure article-content helpers: slug derivation, reading time and excerpts.
//! Slug uniqueness probing lives in the db helpers since it needs the store.

const WORDS_PER_MINUTE: i64 = 200;
const EXCERPT_LENGTH: usize = 150;

/// Derive a URL-safe slug from an article title: lowercase, strip anything
/// outside the word/space/hyphen set, collapse whitespace and hyphen runs to a
/// single hyphen, trim edge hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Estimated reading time in whole minutes, at 200 words per minute, rounded
/// up. An empty body yields 0 minutes rather than an error.
pub fn reading_time(content: &str) -> i64 {
    let words = content.split_whitespace().count() as i64;
    (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

/// Fallback excerpt when the author does not supply one: the first 150
/// characters of the content.
pub fn default_excerpt(content: &str) -> String {
    content.chars().take(EXCERPT_LENGTH).collect()
}

/// Tags are stored lowercased and trimmed; empty entries are dropped.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
