//! Status content extraction.
//!
//! Mastodon renders status bodies as HTML wrapped in a `<p>` element, while
//! editing a status expects plain text. Concatenating every text node of
//! the parsed fragment undoes the wrapping. This is not a sanitizer: links
//! collapse to their label and line breaks disappear.

use scraper::Html;

/// Plain text of an HTML status body.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect()
}
