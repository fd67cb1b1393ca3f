// 测试辅助：在内存中构造最小 EPUB

use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const TOC_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:test-book"/></head>
  <docTitle><text>Test Book</text></docTitle>
  <navMap/>
</ncx>"#;

struct Item {
    href: String,
    media_type: String,
    content: Vec<u8>,
    properties: Option<String>,
    in_spine: bool,
    /// 为 false 时只写入清单，不写入文件
    present: bool,
}

/// 按 spine 顺序添加章节的 EPUB 构造器
pub struct EpubBuilder {
    items: Vec<Item>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// 添加一个 XHTML 章节
    pub fn chapter(self, href: &str, markup: &str) -> Self {
        self.item(href, "application/xhtml+xml", markup.as_bytes().to_vec())
    }

    /// 添加任意媒体类型的 spine 条目
    pub fn item(mut self, href: &str, media_type: &str, content: Vec<u8>) -> Self {
        self.items.push(Item {
            href: href.to_string(),
            media_type: media_type.to_string(),
            content,
            properties: None,
            in_spine: true,
            present: true,
        });
        self
    }

    /// 添加 EPUB3 导航文档（`properties="nav"`），放在 spine 中
    pub fn nav(mut self, href: &str, markup: &str) -> Self {
        self = self.chapter(href, markup);
        if let Some(item) = self.items.last_mut() {
            item.properties = Some("nav".to_string());
        }
        self
    }

    /// 添加只在清单中出现的 XHTML 文档
    pub fn unlisted(mut self, href: &str, markup: &str) -> Self {
        self = self.chapter(href, markup);
        if let Some(item) = self.items.last_mut() {
            item.in_spine = false;
        }
        self
    }

    /// 添加 spine 引用但容器中不存在的章节
    pub fn missing(mut self, href: &str) -> Self {
        self = self.chapter(href, "");
        if let Some(item) = self.items.last_mut() {
            item.present = false;
        }
        self
    }

    fn content_opf(&self) -> String {
        let mut manifest = String::from(
            r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        );
        let mut spine = String::new();
        for (i, item) in self.items.iter().enumerate() {
            let properties = item
                .properties
                .as_ref()
                .map(|p| format!(" properties=\"{}\"", p))
                .unwrap_or_default();
            manifest.push_str(&format!(
                "\n    <item id=\"item{}\" href=\"{}\" media-type=\"{}\"{}/>",
                i, item.href, item.media_type, properties
            ));
            if item.in_spine {
                spine.push_str(&format!("\n    <itemref idref=\"item{}\"/>", i));
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test Book</dc:title>
    <dc:identifier id="bookid">urn:uuid:test-book</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{}
  </manifest>
  <spine toc="ncx">{}
  </spine>
</package>"#,
            manifest, spine
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.content_opf().as_bytes()).unwrap();

        zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
        zip.write_all(TOC_NCX.as_bytes()).unwrap();

        for item in self.items.iter().filter(|item| item.present) {
            zip.start_file(format!("OEBPS/{}", item.href), deflated).unwrap();
            zip.write_all(&item.content).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}
