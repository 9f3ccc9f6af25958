use once_cell::sync::Lazy;
use regex::Regex;

/// Markdown inline link: `[text](url)` or `[text](url "title")`.
/// The destination has no whitespace and may hold one level of balanced parentheses.
static INLINE_LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]*)\]\(\s*((?:[^\s()]|\([^\s()]*\))*)(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#)
        .expect("inline link pattern is valid")
});

/// A link found in raw markdown, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub text: String,
    pub url: String,
}

/// Pull every `[text](url)` pair out of `content`, in source order.
///
/// The title, if any, is dropped. The URL is not resolved, parsed or checked here.
pub fn extract_links(content: &str) -> Vec<ExtractedLink> {
    INLINE_LINK_REGEX
        .captures_iter(content)
        .map(|caps| ExtractedLink {
            text: caps[1].to_string(),
            url: caps[2].to_string(),
        })
        .collect()
}
