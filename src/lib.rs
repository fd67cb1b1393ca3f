// EPUB 转纯文本：读取容器 → 解码 → 提取正文 → 命名 → 打包为 zip

pub mod archive;
pub mod config;
pub mod epub_reader;
pub mod error;
pub mod naming;
pub mod parser;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use archive::{build_archive, ArchiveMember};
pub use config::{load_config, AppConfig};
pub use epub_reader::{read_book, read_book_from_bytes, Book};
pub use error::{ChapterError, ConvertError, Result};
pub use naming::{make_filename, Candidate, FilenamePolicy};
pub use parser::{ExtractOptions, ExtractPolicy, TextExtractor};
pub use pipeline::{convert, convert_many, extract_chapter, ConversionReport, ConvertOptions};
