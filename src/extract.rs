use lazy_static::lazy_static;
use scraper::{Html, Selector};

const E: &str = "Invalid selector";
lazy_static! {
    static ref IMG: Selector = Selector::parse("img").expect(E);
}

/// Extract the visible text of a document, dropping `script` and `style`
/// content entirely. Text nodes are concatenated as they occur in the tree,
/// whitespace included.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut text = String::new();
    for node in doc.tree.root().descendants() {
        if let Some(t) = node.value().as_text() {
            let excluded = node.ancestors().any(|n| {
                n.value()
                    .as_element()
                    .map_or(false, |el| matches!(el.name(), "script" | "style"))
            });
            if !excluded {
                text.push_str(t);
            }
        }
    }
    text
}

/// Collect image URLs in document order, without deduplication.
///
/// `src` wins when non-empty, otherwise `data-original` (lazy-loading sites
/// park the real URL there). Protocol-relative URLs get an explicit scheme.
pub fn extract_image_urls(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    doc.select(&IMG)
        .filter_map(|img| {
            img.value()
                .attr("src")
                .filter(|src| !src.is_empty())
                .or_else(|| img.value().attr("data-original").filter(|d| !d.is_empty()))
        })
        .map(|url| {
            if url.starts_with("//") {
                format!("https:{}", url)
            } else {
                url.to_string()
            }
        })
        .collect()
}
