//! Plain-text extraction from answer markup.
//!
//! Answer bodies arrive as HTML. The chat shows them as text, so the body is
//! parsed and its text nodes collected in document order, the same walk a
//! browser tree walker restricted to text nodes would make.

use scraper::Html;

/// Text nodes of `markup` in document order, entities decoded.
///
/// Whitespace-only nodes between block elements are kept so that joining
/// the tokens with a space reproduces the visible spacing.
pub fn extract_plain_text(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .text()
        .map(str::to_string)
        .collect()
}

/// Flattened single-line rendering used for chat replies.
pub fn flatten(markup: &str) -> String {
    extract_plain_text(markup).join(" ")
}
