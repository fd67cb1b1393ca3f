use super::*;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

/// 黑名单：这些标签内的文本不属于正文
pub const DENYLIST: &[&str] = &[
    "head", "title", "meta", "link", "script", "style", "noscript", "template", "nav",
    "header", "footer", "input", "button", "select", "textarea", "svg",
];

/// 标题标签，黑名单策略下默认视为结构而非正文
pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// 白名单：只有这些块级元素的文本会被提取
pub const ALLOWLIST: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "pre"];

/// 段落分隔符
pub const PARAGRAPH_BREAK: &str = "\n\n";

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// 将连续空白折叠为一个空格（保留首尾的单个空格）
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").into_owned()
}

/// 节点序列中是否有标签落在给定集合内
fn has_tag_in<'a>(mut nodes: impl Iterator<Item = &'a Node>, tags: &[&str]) -> bool {
    nodes.any(|node| {
        node.as_element()
            .map_or(false, |element| tags.contains(&element.name()))
    })
}

/// 黑名单提取器
///
/// 按文档顺序遍历所有文本节点：
/// - 任一祖先元素在黑名单中，跳过
/// - 纯空白节点，跳过
/// - 前一个保留节点的结尾和当前节点的开头都不是空白时，插入段落分隔
#[derive(Debug, Clone, Default)]
pub struct DenylistExtractor {
    include_headings: bool,
}

impl DenylistExtractor {
    pub fn new(include_headings: bool) -> Self {
        Self { include_headings }
    }

    fn is_denied(&self, ancestor_tags: &[&str]) -> bool {
        ancestor_tags.iter().any(|tag| {
            DENYLIST.contains(tag) || (!self.include_headings && HEADING_TAGS.contains(tag))
        })
    }
}

impl TextExtractor for DenylistExtractor {
    fn extract(&self, markup: &str) -> String {
        let document = Html::parse_document(markup);
        let mut output = String::new();
        let mut prev: Option<&str> = None;

        for node in document.tree.root().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let raw: &str = text;

            if raw.trim().is_empty() {
                continue;
            }
            // 文档根下的游离文本（不在任何元素内）
            if !node.parent().map_or(false, |p| p.value().is_element()) {
                continue;
            }
            let ancestor_tags: Vec<&str> = node
                .ancestors()
                .filter_map(|a| a.value().as_element().map(|el| el.name()))
                .collect();
            if self.is_denied(&ancestor_tags) {
                continue;
            }

            let piece = collapse_whitespace(raw);
            if let Some(prev) = prev {
                let prev_spaced = prev.ends_with(char::is_whitespace);
                let cur_spaced = raw.starts_with(char::is_whitespace);
                if !(prev_spaced || cur_spaced) {
                    output.truncate(output.trim_end().len());
                    output.push_str(PARAGRAPH_BREAK);
                }
            }

            if output.ends_with(' ') && piece.starts_with(' ') {
                output.push_str(&piece[1..]);
            } else {
                output.push_str(&piece);
            }
            prev = Some(raw);
        }

        output.trim().to_string()
    }

    fn policy(&self) -> ExtractPolicy {
        ExtractPolicy::Denylist
    }
}

/// 白名单提取器
///
/// 只选取段落、h1-h6、列表项和预格式化块；
/// 嵌套在另一个白名单元素内的元素不重复提取
#[derive(Debug, Clone, Default)]
pub struct AllowlistExtractor;

impl AllowlistExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 元素的可见文本，跳过其中黑名单标签的内容，`<br>` 视为空格
    fn visible_text(&self, element: &ElementRef) -> String {
        let mut text = String::new();

        for node in element.descendants() {
            match node.value() {
                Node::Text(t) => {
                    let inside_denied = has_tag_in(
                        node.ancestors()
                            .take_while(|a| a.id() != element.id())
                            .map(|a| a.value()),
                        DENYLIST,
                    );
                    if !inside_denied {
                        text.push_str(t);
                    }
                }
                Node::Element(el) if el.name() == "br" => text.push(' '),
                _ => {}
            }
        }

        collapse_whitespace(&text).trim().to_string()
    }
}

impl TextExtractor for AllowlistExtractor {
    fn extract(&self, markup: &str) -> String {
        let document = Html::parse_document(markup);
        let mut paragraphs = Vec::new();

        for node in document.tree.root().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if !ALLOWLIST.contains(&element.value().name()) {
                continue;
            }

            let ancestors = || node.ancestors().map(|a| a.value());
            if has_tag_in(ancestors(), DENYLIST) || has_tag_in(ancestors(), ALLOWLIST) {
                continue;
            }

            let text = self.visible_text(&element);
            if !text.is_empty() {
                paragraphs.push(text);
            }
        }

        paragraphs.join(PARAGRAPH_BREAK)
    }

    fn policy(&self) -> ExtractPolicy {
        ExtractPolicy::Allowlist
    }
}
