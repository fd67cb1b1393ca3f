use thiserror::Error;

/// 书籍级错误
///
/// 出现时整本书的转换中止，不产生部分压缩包
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("EPUB 容器无效: {0}")]
    Container(String),
    #[error("写入压缩包失败: {0}")]
    ArchiveWrite(#[from] zip::result::ZipError),
    #[error("压缩包成员重名: {0}")]
    DuplicateMember(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// 章节级错误
///
/// 只影响当前章节，流水线会将其降级为报告中的 skip 条目
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChapterError {
    #[error("解码失败: {0}")]
    Decode(String),
    #[error("标记解析失败: {0}")]
    Parse(String),
    #[error("容器中缺少文件: {0}")]
    Missing(String),
}

impl ChapterError {
    /// 报告中使用的稳定标签
    pub fn kind(&self) -> &'static str {
        match self {
            ChapterError::Decode(_) => "DecodeError",
            ChapterError::Parse(_) => "ParseError",
            ChapterError::Missing(_) => "MissingResource",
        }
    }
}
