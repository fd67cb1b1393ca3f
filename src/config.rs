// 转换配置
//
// 所有可调整的选项集中在这里，可从 TOML 文件加载。
// 缺失的字段使用默认值；文件无法读取或格式错误时整体回退到默认配置。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ConvertError, Result};
use crate::naming::{DEFAULT_EXTENSION, MAX_STEM_LEN};
use crate::parser::ExtractPolicy;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub policy: ExtractPolicy,
    #[serde(default)]
    pub include_headings: bool,
    #[serde(default)]
    pub naming: NamingMode,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    #[serde(default)]
    pub layout: ArchiveLayout,
    #[serde(default)]
    pub skip_empty_chapters: bool,
    #[serde(default = "default_strict_xhtml")]
    pub strict_xhtml: bool,
    #[serde(default)]
    pub lossy_decode: LossyDecode,
    /// 转换只出现在清单、不在 spine 中的正文文档（如尾注）
    #[serde(default = "default_include_unlisted")]
    pub include_unlisted: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_max_name_len() -> usize {
    MAX_STEM_LEN
}

fn default_strict_xhtml() -> bool {
    true
}

fn default_include_unlisted() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            policy: ExtractPolicy::Denylist,
            include_headings: false,
            naming: NamingMode::Title,
            extension: default_extension(),
            max_name_len: default_max_name_len(),
            layout: ArchiveLayout::PerChapter,
            skip_empty_chapters: false,
            strict_xhtml: default_strict_xhtml(),
            lossy_decode: LossyDecode::Keep,
            include_unlisted: default_include_unlisted(),
            log_level: LogLevel::Info,
        }
    }
}

/// 文件名来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingMode {
    /// 嗅探到的章节标题
    #[default]
    Title,
    /// 书名 + 章节序号
    Ordinal,
}

/// 压缩包布局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveLayout {
    /// 每章一个文件
    #[default]
    PerChapter,
    /// 每本书一个文件，章节依次拼接
    PerBook,
}

/// 解码需要替换字符时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossyDecode {
    /// 保留替换后的文本
    #[default]
    Keep,
    /// 视为解码失败，跳过该章
    Skip,
}

/// 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// 严格解析 TOML 配置
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| ConvertError::Config(e.to_string()))
}

/// 严格读取配置文件，读取或解析失败都返回错误
pub fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))?;
    parse_config(&contents)
}

/// 加载配置，任何问题都回退到默认值
pub fn load_config(path: &Path) -> AppConfig {
    if !path.exists() {
        debug!(path = %path.display(), "配置文件不存在，使用默认配置");
        return AppConfig::default();
    }

    match read_config(path) {
        Ok(config) => {
            info!(path = %path.display(), "已加载配置文件");
            config
        }
        Err(err) => {
            warn!(path = %path.display(), "配置文件无效，使用默认配置: {err}");
            AppConfig::default()
        }
    }
}

/// 序列化为 TOML
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| ConvertError::Config(e.to_string()))
}
