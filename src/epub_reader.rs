// EPUB 容器读取
//
// 把 EPUB 文件转换为按阅读顺序排列的文档列表；容器本身的解析交给 epub crate

use epub::doc::EpubDoc;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use crate::parser::{Document, DocumentKind};

/// 无法从文件名得到书名时使用
pub const DEFAULT_BOOK_NAME: &str = "converted_book";

/// 一本书：显示名称 + 按阅读顺序排列的文档
#[derive(Debug, Clone)]
pub struct Book {
    /// 显示名称（通常为上传文件的主干名）
    pub display_name: String,
    /// 文档列表
    pub documents: Vec<Document>,
}

impl Book {
    pub fn new(display_name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            display_name: display_name.into(),
            documents,
        }
    }

    /// 正文文档（按阅读顺序）
    pub fn content_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(|doc| doc.kind.is_textual())
    }

    /// 参与转换的章节文档
    ///
    /// # 参数
    /// - `include_unlisted`: 是否包含只出现在清单、不在 spine 中的正文文档
    pub fn chapter_documents(&self, include_unlisted: bool) -> impl Iterator<Item = &Document> {
        self.content_documents()
            .filter(move |doc| doc.in_spine || include_unlisted)
    }
}

/// 从文件读取书籍，书名取文件主干名
pub fn read_book(path: &Path) -> Result<Book> {
    let bytes = fs::read(path)?;
    let display_name = path.file_stem().and_then(|s| s.to_str());
    read_book_from_bytes(bytes, display_name)
}

/// 从内存字节读取书籍
///
/// # 参数
/// - `bytes`: EPUB 文件内容
/// - `display_name`: 书名；为空时使用 `converted_book`
pub fn read_book_from_bytes(bytes: Vec<u8>, display_name: Option<&str>) -> Result<Book> {
    let display_name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_BOOK_NAME)
        .to_string();

    let mut doc = EpubDoc::from_reader(Cursor::new(bytes))
        .map_err(|e| ConvertError::Container(format!("{}: {}", display_name, e)))?;

    let documents = read_documents(&mut doc);
    debug!(book = %display_name, documents = documents.len(), "EPUB 容器读取完成");

    Ok(Book::new(display_name, documents))
}

/// spine 条目缺少清单信息时假定的媒体类型
const SPINE_MEDIA_TYPE: &str = "application/xhtml+xml";

/// 读取所有文档：先按 spine 顺序，再按清单顺序追加不在 spine 中的正文文档
///
/// 引用了但容器中不存在的文件保留为缺失文档，位置不变
fn read_documents<R: Read + Seek>(doc: &mut EpubDoc<R>) -> Vec<Document> {
    let spine_ids: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
    let mut documents = Vec::with_capacity(spine_ids.len());

    for idref in &spine_ids {
        let position = documents.len() + 1;
        documents.push(read_resource(doc, idref, position));
    }

    let listed: HashSet<&str> = spine_ids.iter().map(String::as_str).collect();
    for id in manifest_order(doc) {
        if listed.contains(id.as_str()) {
            continue;
        }
        let Some(resource) = doc.resources.get(&id) else {
            continue;
        };
        let kind = DocumentKind::from_manifest(&resource.mime, resource.properties.as_deref());
        if !kind.is_textual() {
            continue;
        }

        let position = documents.len() + 1;
        debug!(id = %id, position, "追加不在 spine 中的正文文档");
        documents.push(read_resource(doc, &id, position).unlisted());
    }

    documents
}

/// 按清单 id 读取一个文档
fn read_resource<R: Read + Seek>(doc: &mut EpubDoc<R>, id: &str, position: usize) -> Document {
    let Some(resource) = doc.resources.get(id) else {
        warn!(id, "spine 条目不在清单中");
        return Document::missing(position, id, SPINE_MEDIA_TYPE);
    };

    let path = resource.path.clone();
    let href = path.to_string_lossy().to_string();
    let media_type = resource.mime.clone();
    let kind = DocumentKind::from_manifest(&media_type, resource.properties.as_deref());

    match doc.get_resource_by_path(&path) {
        Some(bytes) => Document::new(position, href, media_type, bytes).with_kind(kind),
        None => {
            warn!(id, href = %href, "清单引用的文件不存在");
            Document::missing(position, href, media_type).with_kind(kind)
        }
    }
}

/// 清单中条目的 id，按出现顺序
///
/// 清单无法读取时退回到按路径排序
fn manifest_order<R: Read + Seek>(doc: &mut EpubDoc<R>) -> Vec<String> {
    let root_file = doc.root_file.clone();
    if let Some(opf) = doc.get_resource_str_by_path(&root_file) {
        let ids = manifest_ids(&opf);
        if !ids.is_empty() {
            return ids;
        }
    }

    debug!(root = %root_file.display(), "无法读取清单顺序，按路径排序");
    let mut entries: Vec<(String, String)> = doc
        .resources
        .iter()
        .map(|(id, resource)| (resource.path.to_string_lossy().to_string(), id.clone()))
        .collect();
    entries.sort();
    entries.into_iter().map(|(_, id)| id).collect()
}

/// 从 OPF 中按顺序取出 `<manifest>` 下各 `<item>` 的 id
fn manifest_ids(opf: &str) -> Vec<String> {
    let mut reader = Reader::from_str(opf);
    let mut ids = Vec::new();
    let mut in_manifest = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"manifest" => in_manifest = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"manifest" => in_manifest = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if in_manifest && e.local_name().as_ref() == b"item" =>
            {
                let id = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.local_name().as_ref() == b"id");
                if let Some(attr) = id {
                    ids.push(String::from_utf8_lossy(&attr.value).into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("清单解析中断: {}", e);
                break;
            }
            _ => {}
        }
    }

    ids
}
