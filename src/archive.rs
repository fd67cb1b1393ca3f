use std::collections::HashSet;
use std::io::{Cursor, Seek, Write};

use tracing::debug;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::{ConvertError, Result};

/// 压缩包成员
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// 成员名称，在同一个压缩包内唯一
    pub name: String,
    /// 内容
    pub content: Vec<u8>,
}

impl ArchiveMember {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// 以 UTF-8 文本创建成员，内容总以单个换行结尾（空文本即 `"\n"`）
    pub fn text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, format!("{}\n", text.trim_end()).into_bytes())
    }
}

/// 在内存中构建 zip（deflate），保持成员顺序
pub fn build_archive(members: &[ArchiveMember]) -> Result<Vec<u8>> {
    let cursor = write_archive(Cursor::new(Vec::new()), members)?;
    Ok(cursor.into_inner())
}

/// 将成员写入任意可 seek 的输出
///
/// 写入前检查重名：重名说明上游命名出了问题，直接报错而不是覆盖
pub fn write_archive<W: Write + Seek>(sink: W, members: &[ArchiveMember]) -> Result<W> {
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !seen.insert(member.name.as_str()) {
            return Err(ConvertError::DuplicateMember(member.name.clone()));
        }
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(sink);
    for member in members {
        zip.start_file(member.name.as_str(), options)?;
        zip.write_all(&member.content).map_err(ZipError::from)?;
        debug!(name = %member.name, bytes = member.content.len(), "写入压缩包成员");
    }

    Ok(zip.finish()?)
}
