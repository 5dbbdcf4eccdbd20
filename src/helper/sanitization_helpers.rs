use std::collections::HashSet;

use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

/// Renders a Markdown description to HTML and sanitizes the result. A safe
/// subset of tags survives; all scripting capability (`onclick`, `onerror`,
/// javascript: URLs) is removed.
pub fn render_description(markdown_input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown_input, options);
    let mut unsafe_html = String::new();
    html::push_html(&mut unsafe_html, parser);

    let tags_to_allow = [
        "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "p", "br", "a", "ul",
        "ol", "li", "blockquote", "code", "pre", "hr", "img", "table", "thead", "tbody", "tr",
        "th", "td", "s", "del",
    ];
    let safe_tags = tags_to_allow.iter().cloned().collect::<HashSet<_>>();

    let safe_attributes = ["src", "href", "alt", "title"];
    let generic_attributes = safe_attributes.iter().cloned().collect::<HashSet<_>>();

    Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("nofollow ugc"))
        .clean(&unsafe_html)
        .to_string()
}

/// Strips all HTML tags, leaving plain text. Used for titles, which must never
/// carry markup.
pub fn strip_all_html(input: &str) -> String {
    Builder::new().tags(HashSet::new()).clean(input).to_string()
}

/// A well-formed video host reference is either a raw numeric id ("772401")
/// or an id:hash pair ("772401:9f2ac1"). Error sentinels and anything else
/// are rejected at the creator-input boundary; items that slip through with a
/// bad ref are additionally excluded from every feed by the eligibility filter.
pub fn is_valid_video_ref(video_ref: &str) -> bool {
    let pattern = Regex::new(r"^\d+(:[0-9A-Za-z]+)?$").expect("video ref pattern is valid");
    pattern.is_match(video_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tags_are_removed() {
        let rendered = render_description("hello <script>alert(1)</script> world");
        assert!(!rendered.contains("<script"));
        assert!(rendered.contains("hello"));
    }

    #[test]
    fn markdown_structure_survives() {
        let rendered = render_description("# Title\n\nsome *emphasis*");
        assert!(rendered.contains("<h1>"));
        assert!(rendered.contains("<em>"));
    }

    #[test]
    fn titles_lose_all_markup() {
        assert_eq!(strip_all_html("<b>Armbar</b> basics"), "Armbar basics");
    }

    #[test]
    fn video_ref_formats() {
        assert!(is_valid_video_ref("772401"));
        assert!(is_valid_video_ref("772401:9f2ac1"));
        assert!(!is_valid_video_ref("error"));
        assert!(!is_valid_video_ref("ERROR: upload failed"));
        assert!(!is_valid_video_ref(""));
        assert!(!is_valid_video_ref(":abc"));
    }
}
