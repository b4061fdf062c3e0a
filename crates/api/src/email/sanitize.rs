use std::collections::HashSet;

/// Strip scripts, event handlers and other unsafe markup, keeping formatting.
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Plain-text alternative of an HTML body: every tag removed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(html)
        .to_string()
}
