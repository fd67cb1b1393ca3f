use encoding_rs::*;
use tracing::warn;

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// 解码后的文本
    pub text: String,
    /// 实际使用的编码
    pub encoding: &'static Encoding,
    /// 是否出现了替换字符（有字节无法解码）
    pub lossy: bool,
}

/// 解码章节字节
///
/// 对任意输入都返回字符串，不会失败
pub fn decode(bytes: &[u8]) -> String {
    decode_with_details(bytes).text
}

/// 按回退链解码，并返回使用的编码
///
/// 顺序：
/// 1. BOM 指定的编码（UTF-8 / UTF-16）
/// 2. 严格 UTF-8
/// 3. 严格 GB18030
/// 4. UTF-8 有损解码，无法解码的字节替换为 U+FFFD
pub fn decode_with_details(bytes: &[u8]) -> Decoded {
    // 1. 检查 BOM (Byte Order Mark)
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        if had_errors {
            warn!(encoding = encoding.name(), "BOM 编码解码时出现无效字节，已替换");
        }
        return Decoded {
            text: text.into_owned(),
            encoding,
            lossy: had_errors,
        };
    }

    // 2. 尝试 UTF-8 解码
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded {
            text: text.to_string(),
            encoding: UTF_8,
            lossy: false,
        };
    }

    // 3. 尝试 GB18030 解码
    if let Some(text) = GB18030.decode_without_bom_handling_and_without_replacement(bytes) {
        return Decoded {
            text: text.into_owned(),
            encoding: GB18030,
            lossy: false,
        };
    }

    // 4. 有损回退
    let (text, _had_errors) = UTF_8.decode_without_bom_handling(bytes);
    warn!("UTF-8 与 GB18030 均无法解码，已替换无效字节");
    Decoded {
        text: text.into_owned(),
        encoding: UTF_8,
        lossy: true,
    }
}
