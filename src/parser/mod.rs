use serde::{Deserialize, Serialize};

// 子模块声明
pub mod decoder;
pub mod extractor;
pub mod title;
pub mod xhtml;

pub use decoder::{decode, decode_with_details, Decoded};
pub use extractor::{AllowlistExtractor, DenylistExtractor};
pub use title::{fallback_title, find_title, sniff_title};

/// 文档类型
///
/// 区分正文文档与其他资源（图片、样式表、导航文件）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// 正文（XHTML / HTML）
    Content,
    /// 导航文件（NCX）
    Navigation,
    /// 样式表
    Stylesheet,
    /// 图片
    Image,
    /// 其他资源
    Other,
}

impl DocumentKind {
    /// 根据媒体类型判断文档类型
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/xhtml+xml" | "text/html" | "application/x-dtbook+xml"
            | "text/x-oeb1-document" => DocumentKind::Content,
            "application/x-dtbncx+xml" => DocumentKind::Navigation,
            "text/css" => DocumentKind::Stylesheet,
            m if m.starts_with("image/") => DocumentKind::Image,
            _ => DocumentKind::Other,
        }
    }

    /// 根据清单条目判断文档类型
    ///
    /// EPUB3 的导航文档媒体类型是 XHTML，只能靠 `properties="nav"` 区分
    pub fn from_manifest(media_type: &str, properties: Option<&str>) -> Self {
        let is_nav = properties.map_or(false, |props| {
            props.split_whitespace().any(|p| p.eq_ignore_ascii_case("nav"))
        });
        if is_nav {
            DocumentKind::Navigation
        } else {
            Self::from_media_type(media_type)
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DocumentKind::Content)
    }
}

/// 书中的一个文档
///
/// 原始字节在读取后不再修改
#[derive(Debug, Clone)]
pub struct Document {
    /// 在书中的位置（从 1 开始，按阅读顺序）
    pub position: usize,
    /// 容器内路径
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 文档类型
    pub kind: DocumentKind,
    /// 原始字节
    pub bytes: Vec<u8>,
    /// 是否在 spine 中（否则只出现在清单里）
    pub in_spine: bool,
    /// 清单或 spine 引用了它，但容器里没有对应文件
    pub missing: bool,
}

impl Document {
    pub fn new(
        position: usize,
        href: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let media_type = media_type.into();
        Self {
            position,
            href: href.into(),
            kind: DocumentKind::from_media_type(&media_type),
            media_type,
            bytes,
            in_spine: true,
            missing: false,
        }
    }

    /// 容器中缺失的文档，保留位置以便序号不变
    pub fn missing(position: usize, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            missing: true,
            ..Self::new(position, href, media_type, Vec::new())
        }
    }

    /// 覆盖按媒体类型推断出的文档类型
    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    /// 标记为不在 spine 中
    pub fn unlisted(mut self) -> Self {
        self.in_spine = false;
        self
    }

    /// 是否按 XHTML 声明（需要良构）
    pub fn is_xhtml(&self) -> bool {
        xhtml::declares_xhtml(&self.media_type, &self.href)
    }
}

/// 提取后的章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedChapter {
    /// 章节序号（正文文档中的顺序，从 1 开始）
    pub ordinal: usize,
    /// 嗅探到的标题
    pub title: Option<String>,
    /// 纯文本内容，段落之间以空行分隔
    pub text: String,
}

/// 文本提取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractPolicy {
    /// 遍历所有文本节点，跳过黑名单标签内的文本
    #[default]
    Denylist,
    /// 只选取白名单中的块级元素
    Allowlist,
}

impl std::fmt::Display for ExtractPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExtractPolicy::Denylist => "denylist",
            ExtractPolicy::Allowlist => "allowlist",
        };
        write!(f, "{}", label)
    }
}

/// 文本提取选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub policy: ExtractPolicy,
    /// 黑名单策略下是否保留 h1-h6 文本
    pub include_headings: bool,
    /// XHTML 文档必须良构，否则视为解析失败
    pub strict_xhtml: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            policy: ExtractPolicy::Denylist,
            include_headings: false,
            strict_xhtml: true,
        }
    }
}

/// 文本提取器 trait
///
/// 同样的输入总是得到同样的输出；没有正文时返回空字符串
pub trait TextExtractor: Send + Sync {
    /// 从已解码的标记中提取可见文本
    fn extract(&self, markup: &str) -> String;

    /// 当前使用的策略
    fn policy(&self) -> ExtractPolicy;
}

/// 根据选项创建对应的提取器
pub fn extractor_for(options: &ExtractOptions) -> Box<dyn TextExtractor> {
    match options.policy {
        ExtractPolicy::Denylist => Box::new(DenylistExtractor::new(options.include_headings)),
        ExtractPolicy::Allowlist => Box::new(AllowlistExtractor::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_from_media_type() {
        assert_eq!(DocumentKind::from_media_type("application/xhtml+xml"), DocumentKind::Content);
        assert_eq!(DocumentKind::from_media_type("text/html; charset=utf-8"), DocumentKind::Content);
        assert_eq!(DocumentKind::from_media_type("application/x-dtbncx+xml"), DocumentKind::Navigation);
        assert_eq!(DocumentKind::from_media_type("text/css"), DocumentKind::Stylesheet);
        assert_eq!(DocumentKind::from_media_type("image/jpeg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_media_type("application/vnd.ms-opentype"), DocumentKind::Other);
    }

    #[test]
    fn test_document_kind_is_case_insensitive() {
        assert_eq!(DocumentKind::from_media_type("Application/XHTML+XML"), DocumentKind::Content);
    }

    #[test]
    fn test_nav_property_marks_navigation() {
        assert_eq!(
            DocumentKind::from_manifest("application/xhtml+xml", Some("nav")),
            DocumentKind::Navigation
        );
        assert_eq!(
            DocumentKind::from_manifest("application/xhtml+xml", Some("scripted nav")),
            DocumentKind::Navigation
        );
        assert_eq!(
            DocumentKind::from_manifest("application/xhtml+xml", Some("svg")),
            DocumentKind::Content
        );
        assert_eq!(DocumentKind::from_manifest("application/xhtml+xml", None), DocumentKind::Content);
    }

    #[test]
    fn test_missing_document() {
        let doc = Document::missing(2, "OEBPS/gone.xhtml", "application/xhtml+xml");
        assert!(doc.missing);
        assert!(doc.in_spine);
        assert!(doc.bytes.is_empty());
        assert_eq!(doc.kind, DocumentKind::Content);
        assert!(!doc.unlisted().in_spine);
    }

    #[test]
    fn test_only_content_is_textual() {
        assert!(DocumentKind::Content.is_textual());
        assert!(!DocumentKind::Navigation.is_textual());
        assert!(!DocumentKind::Image.is_textual());
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::new(1, "OEBPS/ch1.xhtml", "application/xhtml+xml", b"<p/>".to_vec());
        assert_eq!(doc.kind, DocumentKind::Content);
        assert!(doc.is_xhtml());

        let doc = Document::new(2, "OEBPS/ch2.html", "text/html", Vec::new());
        assert!(!doc.is_xhtml());
    }

    #[test]
    fn test_extractor_router() {
        let mut options = ExtractOptions::default();
        assert_eq!(extractor_for(&options).policy(), ExtractPolicy::Denylist);

        options.policy = ExtractPolicy::Allowlist;
        assert_eq!(extractor_for(&options).policy(), ExtractPolicy::Allowlist);
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(ExtractPolicy::Denylist.to_string(), "denylist");
        assert_eq!(ExtractPolicy::Allowlist.to_string(), "allowlist");
    }
}
