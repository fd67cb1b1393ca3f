use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::extractor::collapse_whitespace;

static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("valid heading selector"));

/// 从章节标记中嗅探标题
///
/// 取文档顺序中第一个 h1-h3；其文本为空或不存在时，返回 `Chapter_<序号>`
pub fn sniff_title(markup: &str, fallback_ordinal: usize) -> String {
    find_title(markup).unwrap_or_else(|| fallback_title(fallback_ordinal))
}

/// 第一个 h1-h3 的文本（去除首尾空白），没有或为空时返回 None
///
/// 只看第一个标题元素，不会继续向后查找
pub fn find_title(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let element = document.select(&HEADING_SELECTOR).next()?;
    let text = collapse_whitespace(&element.text().collect::<String>())
        .trim()
        .to_string();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 序号标签
pub fn fallback_title(ordinal: usize) -> String {
    format!("Chapter_{}", ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_h1() {
        let html = r#"<html><body><h1>第一章</h1><p>内容</p></body></html>"#;
        assert_eq!(sniff_title(html, 1), "第一章");
    }

    #[test]
    fn test_sniff_first_heading_in_document_order() {
        let html = r#"<body><h3>Prologue</h3><h1>Main Title</h1></body>"#;
        assert_eq!(sniff_title(html, 1), "Prologue");
    }

    #[test]
    fn test_sniff_ignores_deeper_headings() {
        let html = r#"<body><h4>Too deep</h4><p>内容</p></body>"#;
        assert_eq!(sniff_title(html, 7), "Chapter_7");
    }

    #[test]
    fn test_sniff_ignores_title_tag() {
        let html = r#"<html><head><title>书名</title></head><body><p>内容</p></body></html>"#;
        assert_eq!(find_title(html), None);
        assert_eq!(sniff_title(html, 2), "Chapter_2");
    }

    #[test]
    fn test_sniff_empty_first_heading_falls_back() {
        let html = r#"<body><h2>   </h2><h2>Later</h2></body>"#;
        assert_eq!(sniff_title(html, 3), "Chapter_3");
    }

    #[test]
    fn test_sniff_collapses_inner_whitespace() {
        let html = "<h2>\n  Part <em>One</em>:\n  Beginnings </h2>";
        assert_eq!(find_title(html), Some("Part One: Beginnings".to_string()));
    }

    #[test]
    fn test_sniff_empty_markup() {
        assert_eq!(sniff_title("", 1), "Chapter_1");
    }
}
