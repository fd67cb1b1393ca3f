// 命令行入口
//
// - convert：把一本或多本 EPUB 转换为纯文本 zip
// - inspect：列出书中的文档
// - extract：打印单个章节的纯文本

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use epub_to_text_lib::config::{load_config, read_config, AppConfig, ArchiveLayout, NamingMode};
use epub_to_text_lib::parser::{fallback_title, ExtractPolicy};
use epub_to_text_lib::{convert_many, extract_chapter, read_book, ConvertOptions};

/// 未指定输出路径时使用
const DEFAULT_OUTPUT: &str = "converted_text_files.zip";

/// 未指定 `--config` 时尝试加载
const DEFAULT_CONFIG_PATH: &str = "epub-to-text.toml";

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

#[derive(Parser)]
#[command(author, version, about = "EPUB 转纯文本", long_about = None)]
struct Cli {
    /// TOML 配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 转换为 zip，每章（或每本书）一个文本文件
    Convert {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        #[arg(long, value_enum)]
        naming: Option<NamingArg>,
        /// 保留黑名单策略下的标题文本
        #[arg(long)]
        include_headings: bool,
        /// 每本书合并为一个文件
        #[arg(long)]
        per_book: bool,
        /// 以 JSON 输出转换报告
        #[arg(long)]
        report_json: bool,
    },
    /// 列出书中的文档（spine 顺序，之后是清单中的其他正文）
    Inspect { input: PathBuf },
    /// 打印第 N 章（从 1 开始）的纯文本
    Extract {
        input: PathBuf,
        ordinal: usize,
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        #[arg(long)]
        include_headings: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Denylist,
    Allowlist,
}

impl From<PolicyArg> for ExtractPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Denylist => ExtractPolicy::Denylist,
            PolicyArg::Allowlist => ExtractPolicy::Allowlist,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NamingArg {
    Title,
    Ordinal,
}

impl From<NamingArg> for NamingMode {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Title => NamingMode::Title,
            NamingArg::Ordinal => NamingMode::Ordinal,
        }
    }
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => read_config(path).with_context(|| format!("无法加载配置 {}", path.display()))?,
        None => load_config(Path::new(DEFAULT_CONFIG_PATH)),
    };
    set_log_level(reload_handle, &config.log_level.to_string());

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            policy,
            naming,
            include_headings,
            per_book,
            report_json,
        } => {
            let mut config = config;
            if let Some(policy) = policy {
                config.policy = policy.into();
            }
            if let Some(naming) = naming {
                config.naming = naming.into();
            }
            config.include_headings |= include_headings;
            if per_book {
                config.layout = ArchiveLayout::PerBook;
            }
            let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
            run_convert(&inputs, &output, &config, report_json)
        }
        Commands::Inspect { input } => run_inspect(&input, &config),
        Commands::Extract {
            input,
            ordinal,
            policy,
            include_headings,
        } => {
            let mut config = config;
            if let Some(policy) = policy {
                config.policy = policy.into();
            }
            config.include_headings |= include_headings;
            run_extract(&input, ordinal, &config)
        }
    }
}

fn run_convert(inputs: &[PathBuf], output: &Path, config: &AppConfig, report_json: bool) -> Result<()> {
    let mut books = Vec::with_capacity(inputs.len());
    for input in inputs {
        let book = read_book(input).with_context(|| format!("无法读取 {}", input.display()))?;
        books.push(book);
    }

    let options = ConvertOptions::from(config);
    info!(
        books = books.len(),
        policy = %config.policy,
        output = %output.display(),
        "开始转换"
    );

    let (bytes, reports) = convert_many(&books, &options).context("转换失败")?;
    fs::write(output, &bytes).with_context(|| format!("无法写入 {}", output.display()))?;

    if report_json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report);
        }
        println!("已写入 {}", output.display());
    }

    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    if skipped > 0 {
        warn!(skipped, "部分章节被跳过");
    }
    Ok(())
}

fn run_inspect(input: &Path, config: &AppConfig) -> Result<()> {
    let book = read_book(input).with_context(|| format!("无法读取 {}", input.display()))?;
    println!("{} ({} 个文档)", book.display_name, book.documents.len());

    let mut ordinal = 0;
    for doc in &book.documents {
        let is_chapter = doc.kind.is_textual() && (doc.in_spine || config.include_unlisted);
        let label = if is_chapter {
            ordinal += 1;
            format!("第 {} 章", ordinal)
        } else {
            "-".to_string()
        };
        let note = if doc.missing {
            " (缺失)"
        } else if !doc.in_spine {
            " (不在 spine 中)"
        } else {
            ""
        };
        println!(
            "  {:>3}  {:<8}  {:<24}  {:>8} B  {}{}",
            doc.position,
            label,
            doc.media_type,
            doc.bytes.len(),
            doc.href,
            note
        );
    }
    Ok(())
}

fn run_extract(input: &Path, ordinal: usize, config: &AppConfig) -> Result<()> {
    let book = read_book(input).with_context(|| format!("无法读取 {}", input.display()))?;
    let chapters = || book.chapter_documents(config.include_unlisted);
    let doc = ordinal
        .checked_sub(1)
        .and_then(|index| chapters().nth(index))
        .ok_or_else(|| anyhow!("第 {} 章不存在（共 {} 章）", ordinal, chapters().count()))?;

    let options = ConvertOptions::from(config);
    match extract_chapter(doc, ordinal, &options) {
        Ok(chapter) => {
            let title = chapter
                .title
                .unwrap_or_else(|| fallback_title(chapter.ordinal));
            println!("# {}\n\n{}", title, chapter.text);
        }
        Err(err) => {
            warn!(ordinal, source = %doc.href, "章节无法提取: {err}");
            println!("skipped:{} ({})", err.kind(), err);
        }
    }
    Ok(())
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

/// 配置中的日志级别只在没有设置 `RUST_LOG` 时生效
fn set_log_level(handle: &ReloadHandle, level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "无法应用配置中的日志级别: {err}");
    }
}
