use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ChapterError;

/// 文档是否声明为 XHTML
///
/// 媒体类型优先；没有媒体类型时看扩展名
pub fn declares_xhtml(media_type: &str, href: &str) -> bool {
    let media_type = media_type.trim().to_ascii_lowercase();
    if media_type.starts_with("application/xhtml+xml") {
        return true;
    }
    media_type.is_empty() && href.to_ascii_lowercase().ends_with(".xhtml")
}

/// 检查 XHTML 是否良构
///
/// html5ever 能从任何错误中恢复，所以"无法恢复的解析错误"定义为
/// 声明为 XHTML 的文档不是良构的 XML：标签不匹配、未闭合、语法损坏
pub fn check_well_formed(markup: &str) -> Result<(), ChapterError> {
    let mut reader = Reader::from_str(markup);
    let mut open_tags: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => open_tags.push(e.name().as_ref().to_vec()),
            Ok(Event::End(e)) => {
                let name = e.name();
                match open_tags.pop() {
                    Some(open) if open.as_slice() == name.as_ref() => {}
                    Some(open) => {
                        return Err(ChapterError::Parse(format!(
                            "位置 {}: </{}> 与 <{}> 不匹配",
                            reader.buffer_position(),
                            String::from_utf8_lossy(name.as_ref()),
                            String::from_utf8_lossy(&open),
                        )));
                    }
                    None => {
                        return Err(ChapterError::Parse(format!(
                            "位置 {}: 多余的结束标签 </{}>",
                            reader.buffer_position(),
                            String::from_utf8_lossy(name.as_ref()),
                        )));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ChapterError::Parse(format!(
                    "位置 {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if let Some(open) = open_tags.last() {
        return Err(ChapterError::Parse(format!(
            "<{}> 未闭合",
            String::from_utf8_lossy(open)
        )));
    }

    Ok(())
}
