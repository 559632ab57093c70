//! HTML post-processing for post bodies.

use lol_html::errors::RewritingError;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use scraper::{Html, Selector};

/// Attributes that survive [`clear_img_attributes`].
const ALLOWED_IMG_ATTRIBUTES: [&str; 5] = ["src", "data-original", "width", "style", "class"];

pub const SUMMARY_LENGTH: usize = 150;
pub const SUMMARY_MIN: usize = 10;
pub const NO_SUMMARY: &str = "No summary";

/// Strips every `img` attribute except `src`, `data-original`, `width`,
/// `style` and `class`.
pub fn clear_img_attributes(html: &str) -> Result<String, RewritingError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                let names: Vec<String> = el
                    .attributes()
                    .iter()
                    .map(|attr| attr.name())
                    .filter(|name| !ALLOWED_IMG_ATTRIBUTES.contains(&name.as_str()))
                    .collect();

                for name in names {
                    el.remove_attribute(&name);
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
}

/// Prepares images for lazy loading: `src` moves to `data-original`, `alt`
/// becomes the site title and `title` the post title.
pub fn replace_img_attribute(
    html: &str,
    title: &str,
    site_title: &str,
) -> Result<String, RewritingError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src") {
                    el.remove_attribute("src");
                    el.set_attribute("data-original", &src)?;
                    el.set_attribute("alt", site_title)?;
                    el.set_attribute("title", title)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
}

/// Text of the first paragraph longer than `min` characters, cut to `length`
/// characters with a trailing `...`.
pub fn get_summary(html: &str, length: usize, min: usize) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return NO_SUMMARY.to_string();
    };

    let document = Html::parse_fragment(html);
    let summary = document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .find(|text| text.chars().count() > min);

    match summary {
        Some(text) if text.chars().count() > length => {
            let mut cut: String = text.chars().take(length).collect();
            cut.push_str("...");
            cut
        }
        Some(text) => text,
        None => NO_SUMMARY.to_string(),
    }
}

/// Drops query segments that are not exactly `key=value` with both sides present.
pub fn trim_query(query: &str) -> String {
    query
        .split('&')
        .filter(|segment| segment.split('=').filter(|part| !part.is_empty()).count() == 2)
        .collect::<Vec<_>>()
        .join("&")
}
