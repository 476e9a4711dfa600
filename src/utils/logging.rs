//! 日志工具模块
//!
//! 提供 subscriber 初始化，以及链运行前后的日志横幅

use anyhow::Result;
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

/// 安装全局 tracing subscriber
///
/// 遵循 `RUST_LOG`，默认 `info`。重复调用不会报错。
///
/// # 参数
/// - `log_file_path`: 日志文件路径（可选），给出时日志同时追加写入该文件
pub fn init(log_file_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = log_file_path
        .map(open_log_file)
        .transpose()?
        .map(|writer| {
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
        });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
    Ok(())
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径，已存在则清空
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nQuiz solver log - {}\n{}\n\n",
        "=".repeat(60),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 写入表头后以追加方式打开日志文件
///
/// # 返回
/// 可直接交给 `with_writer` 的文件句柄
pub fn open_log_file(log_file_path: &str) -> Result<Mutex<File>> {
    init_log_file(log_file_path)?;
    let file = OpenOptions::new().append(true).open(log_file_path)?;
    Ok(Mutex::new(file))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Quiz solver starting");
    info!("📧 Student email: {}", config.email);
    info!(
        "🤖 Models: extraction={} solver={}",
        config.extraction_model, config.solver_model
    );
    info!("⏱️ Chain budget: {}s", config.chain_budget.as_secs());
    info!("{}", "=".repeat(60));
}

/// 记录链运行开始
pub fn log_chain_start(initial_url: &str, budget: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("🔗 Starting quiz chain at {}", initial_url);
    info!("⏱️ Budget: {}s", budget.as_secs());
    info!("{}", "=".repeat(60));
}

/// 记录链运行的最终状态
///
/// # 参数
/// - `attempts`: 已开始的步骤数
/// - `status`: 可读的终止状态
/// - `started_at`: 开始时的本地时间
/// - `elapsed`: 实际耗时
pub fn log_chain_finished(attempts: usize, status: &str, started_at: DateTime<Local>, elapsed: Duration) {
    info!("\n{}", "─".repeat(60));
    info!("📊 Quiz chain finished after {} attempts", attempts);
    info!("Status: {}", status);
    info!("Started at: {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    info!("Elapsed: {:.1}s", elapsed.as_secs_f64());
    info!("Finished at: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "─".repeat(60));
}

/// 截断文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最多保留的字符数
///
/// # 返回
/// 截断后的文本，被截断时末尾追加 `...`
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
