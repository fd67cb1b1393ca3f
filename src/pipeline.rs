// 转换流水线
//
// 每本书单次遍历：Idle → Decoding → Extracting → Naming → Archiving → Done。
// 单个章节失败只记录到报告中并跳过，不影响其余章节；
// 书籍级错误（容器无效、压缩包写入失败）直接返回给调用方。

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::archive::{build_archive, ArchiveMember};
use crate::config::{AppConfig, ArchiveLayout, LossyDecode, NamingMode};
use crate::epub_reader::Book;
use crate::error::{ChapterError, Result};
use crate::naming::{Candidate, FilenamePolicy};
use crate::parser::{
    decode_with_details, extractor_for, fallback_title, find_title, xhtml, Decoded, Document,
    ExtractOptions, ExtractedChapter, TextExtractor,
};

/// 空章节在报告中的跳过原因
pub const EMPTY_REASON: &str = "Empty";

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Decoding,
    Extracting,
    Naming,
    Archiving,
    Done,
}

/// 单章结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChapterStatus {
    Ok,
    Skipped {
        /// `DecodeError` / `ParseError` / `MissingResource` / `Empty`
        reason: String,
        detail: String,
        /// 出错时所处的阶段
        stage: Stage,
    },
}

impl ChapterStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ChapterStatus::Ok)
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterStatus::Ok => write!(f, "ok"),
            ChapterStatus::Skipped { reason, .. } => write!(f, "skipped:{}", reason),
        }
    }
}

/// 报告中的一章
#[derive(Debug, Clone, Serialize)]
pub struct ChapterOutcome {
    pub ordinal: usize,
    /// 容器内路径
    pub source: String,
    pub title: Option<String>,
    /// 写入压缩包的成员名
    pub entry: Option<String>,
    pub encoding: Option<String>,
    pub lossy: bool,
    #[serde(flatten)]
    pub status: ChapterStatus,
}

/// 一本书的转换报告
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub book: String,
    pub chapters: Vec<ChapterOutcome>,
    /// 成功处理的章节数
    pub processed: usize,
    pub skipped: usize,
}

impl ConversionReport {
    fn new(book: &str) -> Self {
        Self {
            book: book.to_string(),
            chapters: Vec::new(),
            processed: 0,
            skipped: 0,
        }
    }

    fn tally(&mut self) {
        self.processed = self.chapters.iter().filter(|c| c.status.is_ok()).count();
        self.skipped = self.chapters.len() - self.processed;
    }

    /// 每章的状态标签，如 `["ok", "skipped:ParseError", "ok"]`
    pub fn statuses(&self) -> Vec<String> {
        self.chapters.iter().map(|c| c.status.to_string()).collect()
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.book)?;
        for chapter in &self.chapters {
            match (&chapter.status, &chapter.entry) {
                (ChapterStatus::Ok, Some(entry)) => {
                    writeln!(f, "  [{}] ok -> {}", chapter.ordinal, entry)?
                }
                (ChapterStatus::Skipped { detail, .. }, _) => writeln!(
                    f,
                    "  [{}] {} ({}: {})",
                    chapter.ordinal, chapter.status, chapter.source, detail
                )?,
                (status, None) => writeln!(f, "  [{}] {}", chapter.ordinal, status)?,
            }
        }
        write!(f, "  共处理 {} 章，跳过 {} 章", self.processed, self.skipped)
    }
}

/// 转换选项
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub extract: ExtractOptions,
    pub naming: NamingMode,
    pub filenames: FilenamePolicy,
    pub layout: ArchiveLayout,
    pub skip_empty_chapters: bool,
    pub lossy_decode: LossyDecode,
    /// 是否转换不在 spine 中的正文文档
    pub include_unlisted: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ConvertOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            extract: ExtractOptions {
                policy: config.policy,
                include_headings: config.include_headings,
                strict_xhtml: config.strict_xhtml,
            },
            naming: config.naming,
            filenames: FilenamePolicy::new(config.extension.clone(), config.max_name_len),
            layout: config.layout,
            skip_empty_chapters: config.skip_empty_chapters,
            lossy_decode: config.lossy_decode,
            include_unlisted: config.include_unlisted,
        }
    }
}

/// 章节失败：阶段 + 错误，解码信息（如已解码）
struct ChapterFailure {
    stage: Stage,
    error: ChapterError,
    decoded: Option<Decoded>,
}

/// 单次转换的流水线实例，不在多次调用之间共享
struct Pipeline<'a> {
    options: &'a ConvertOptions,
    extractor: Box<dyn TextExtractor>,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    fn new(options: &'a ConvertOptions) -> Self {
        Self {
            options,
            extractor: extractor_for(&options.extract),
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage != stage {
            debug!(from = ?self.stage, to = ?stage, "流水线阶段切换");
            self.stage = stage;
        }
    }

    /// 解码 → 良构检查 → 提取 → 标题
    fn process_chapter(
        &mut self,
        doc: &Document,
        ordinal: usize,
    ) -> std::result::Result<(ExtractedChapter, Decoded), ChapterFailure> {
        self.enter(Stage::Decoding);
        if doc.missing {
            return Err(ChapterFailure {
                stage: Stage::Decoding,
                error: ChapterError::Missing(doc.href.clone()),
                decoded: None,
            });
        }
        let decoded = decode_with_details(&doc.bytes);
        if decoded.lossy && self.options.lossy_decode == LossyDecode::Skip {
            return Err(ChapterFailure {
                stage: Stage::Decoding,
                error: ChapterError::Decode(format!(
                    "{} 含有无法解码的字节",
                    decoded.encoding.name()
                )),
                decoded: Some(decoded),
            });
        }

        self.enter(Stage::Extracting);
        if self.options.extract.strict_xhtml && doc.is_xhtml() {
            if let Err(error) = xhtml::check_well_formed(&decoded.text) {
                return Err(ChapterFailure {
                    stage: Stage::Extracting,
                    error,
                    decoded: Some(decoded),
                });
            }
        }

        let text = self.extractor.extract(&decoded.text);
        let title = find_title(&decoded.text);

        Ok((ExtractedChapter { ordinal, title, text }, decoded))
    }

    /// 处理一本书的所有正文文档
    ///
    /// 返回成功的章节（附带其在报告中的下标）和报告
    fn process_book(&mut self, book: &Book) -> (Vec<(usize, ExtractedChapter)>, ConversionReport) {
        let mut report = ConversionReport::new(&book.display_name);
        let mut chapters = Vec::new();
        let include_unlisted = self.options.include_unlisted;

        for (i, doc) in book.chapter_documents(include_unlisted).enumerate() {
            let ordinal = i + 1;
            let mut outcome = ChapterOutcome {
                ordinal,
                source: doc.href.clone(),
                title: None,
                entry: None,
                encoding: None,
                lossy: false,
                status: ChapterStatus::Ok,
            };

            match self.process_chapter(doc, ordinal) {
                Ok((chapter, decoded)) => {
                    outcome.title = chapter.title.clone();
                    outcome.encoding = Some(decoded.encoding.name().to_string());
                    outcome.lossy = decoded.lossy;

                    if self.options.skip_empty_chapters && chapter.text.is_empty() {
                        warn!(book = %book.display_name, ordinal, source = %doc.href, "空章节，已跳过");
                        outcome.status = ChapterStatus::Skipped {
                            reason: EMPTY_REASON.to_string(),
                            detail: "没有正文".to_string(),
                            stage: Stage::Extracting,
                        };
                    } else {
                        chapters.push((report.chapters.len(), chapter));
                    }
                }
                Err(failure) => {
                    if let Some(decoded) = &failure.decoded {
                        outcome.encoding = Some(decoded.encoding.name().to_string());
                        outcome.lossy = decoded.lossy;
                    }
                    match &failure.error {
                        ChapterError::Decode(_) => {
                            error!(book = %book.display_name, ordinal, source = %doc.href, "章节解码失败: {}", failure.error)
                        }
                        ChapterError::Parse(_) => {
                            warn!(book = %book.display_name, ordinal, source = %doc.href, "章节解析失败，已跳过: {}", failure.error)
                        }
                        ChapterError::Missing(_) => {
                            warn!(book = %book.display_name, ordinal, source = %doc.href, "章节文件缺失，已跳过")
                        }
                    }
                    outcome.status = ChapterStatus::Skipped {
                        reason: failure.error.kind().to_string(),
                        detail: failure.error.to_string(),
                        stage: failure.stage,
                    };
                }
            }

            report.chapters.push(outcome);
        }

        report.tally();
        (chapters, report)
    }
}

/// 单独提取一章，不参与命名和打包
pub fn extract_chapter(
    doc: &Document,
    ordinal: usize,
    options: &ConvertOptions,
) -> std::result::Result<ExtractedChapter, ChapterError> {
    let mut pipeline = Pipeline::new(options);
    pipeline
        .process_chapter(doc, ordinal)
        .map(|(chapter, _)| chapter)
        .map_err(|failure| failure.error)
}

/// 转换一本书
///
/// # 返回
/// zip 字节和转换报告
pub fn convert(book: &Book, options: &ConvertOptions) -> Result<(Vec<u8>, ConversionReport)> {
    let (bytes, reports) = convert_many(std::slice::from_ref(book), options)?;
    let report = reports
        .into_iter()
        .next()
        .unwrap_or_else(|| ConversionReport::new(&book.display_name));
    Ok((bytes, report))
}

/// 将多本书打包进同一个压缩包
///
/// 按章布局且多于一本书时，每本书的章节放在以书名命名的目录下
pub fn convert_many(
    books: &[Book],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, Vec<ConversionReport>)> {
    let mut pipeline = Pipeline::new(options);
    let mut members = Vec::new();
    let mut reports = Vec::with_capacity(books.len());
    let mut book_names: HashSet<String> = HashSet::new();
    let dir_policy = FilenamePolicy::new("", options.filenames.max_len());

    for book in books {
        let (chapters, mut report) = pipeline.process_book(book);
        pipeline.enter(Stage::Naming);

        match options.layout {
            ArchiveLayout::PerChapter => {
                let prefix = if books.len() > 1 {
                    let dir = dir_policy.make_filename(
                        &book.display_name,
                        Candidate::Title(&book.display_name),
                        &book_names,
                    );
                    book_names.insert(dir.clone());
                    Some(dir)
                } else {
                    None
                };

                let mut existing = HashSet::new();
                for (index, chapter) in &chapters {
                    let title;
                    let candidate = match options.naming {
                        NamingMode::Title => {
                            title = chapter
                                .title
                                .clone()
                                .unwrap_or_else(|| fallback_title(chapter.ordinal));
                            Candidate::Title(&title)
                        }
                        NamingMode::Ordinal => Candidate::Ordinal(chapter.ordinal),
                    };
                    let name = options
                        .filenames
                        .make_filename(&book.display_name, candidate, &existing);
                    existing.insert(name.clone());

                    let entry = match &prefix {
                        Some(dir) => format!("{}/{}", dir, name),
                        None => name,
                    };
                    report.chapters[*index].entry = Some(entry.clone());
                    members.push(ArchiveMember::text(entry, &chapter.text));
                }
            }
            ArchiveLayout::PerBook => {
                let name = options.filenames.make_filename(
                    &book.display_name,
                    Candidate::Title(&book.display_name),
                    &book_names,
                );
                book_names.insert(name.clone());

                let text = chapters
                    .iter()
                    .map(|(_, chapter)| chapter.text.as_str())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                for (index, _) in &chapters {
                    report.chapters[*index].entry = Some(name.clone());
                }
                members.push(ArchiveMember::text(name, &text));
            }
        }

        info!(
            book = %report.book,
            processed = report.processed,
            skipped = report.skipped,
            "书籍转换完成"
        );
        reports.push(report);
    }

    pipeline.enter(Stage::Archiving);
    let bytes = build_archive(&members)?;
    pipeline.enter(Stage::Done);

    Ok((bytes, reports))
}
