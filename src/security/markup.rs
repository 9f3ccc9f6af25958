use ammonia::{Builder, UrlRelative};
use pulldown_cmark::{html, Options, Parser};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "strong", "em", "del", "code", "pre", "a", "img", "blockquote", "ul", "ol", "li",
    "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Tags dropped together with everything inside them
const STRIPPED_WITH_CONTENT: &[&str] = &["script", "style", "iframe", "object", "embed", "noscript"];

/// Render user markdown to raw, unsanitized HTML.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Reduce raw HTML to the display allow-list.
///
/// Links keep only `href` (http, https, mailto); images keep `src`
/// (http, https, data:image) and `alt`. Every other attribute,
/// event handlers included, is dropped. Disallowed wrappers such as `<div>`
/// are unwrapped and their text kept.
pub fn sanitize_html(input: &str) -> String {
    let tag_attributes = HashMap::from([
        ("a", HashSet::from(["href"])),
        ("img", HashSet::from(["src", "alt"])),
    ]);

    let mut builder = Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(STRIPPED_WITH_CONTENT.iter().copied().collect())
        .tag_attributes(tag_attributes)
        .url_schemes(HashSet::from(["http", "https", "mailto", "data"]))
        .url_relative(UrlRelative::Deny)
        .link_rel(Some("noopener noreferrer nofollow"))
        .strip_comments(true)
        .attribute_filter(filter_url_attribute);

    builder.clean(input).to_string()
}

/// Narrow the global scheme list per attribute: `data:` only for image
/// sources, `mailto:` only for link targets.
fn filter_url_attribute<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    let lowered = value.trim_start().to_ascii_lowercase();
    match (element, attribute) {
        ("a", "href") if lowered.starts_with("data:") => None,
        ("img", "src") if lowered.starts_with("mailto:") => None,
        ("img", "src") if lowered.starts_with("data:") && !lowered.starts_with("data:image/") => None,
        _ => Some(Cow::Borrowed(value)),
    }
}

/// Markdown in, display-safe HTML out.
pub fn render_and_sanitize(content: &str) -> String {
    sanitize_html(&render_markdown(content))
}
