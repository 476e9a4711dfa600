//! 文件摘要 - 业务能力层
//!
//! 把下载的内容转成解答模型能读的文本。不会失败：无法读取的文件退化成一句简短描述

use std::fmt::Write as _;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::Result;
use calamine::{open_workbook_auto_from_rs, Reader};
use phf::phf_map;
use tracing::warn;

/// 长文本保留的字符数
const TEXT_EXCERPT_CHARS: usize = 3000;
/// 表格数据展示的行数
const HEAD_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
    Pdf,
    Json,
    Other,
}

static EXTENSIONS: phf::Map<&'static str, FileKind> = phf_map! {
    "csv" => FileKind::Csv,
    "xlsx" => FileKind::Spreadsheet,
    "xlsm" => FileKind::Spreadsheet,
    "xls" => FileKind::Spreadsheet,
    "ods" => FileKind::Spreadsheet,
    "pdf" => FileKind::Pdf,
    "json" => FileKind::Json,
};

impl FileKind {
    /// 按扩展名（不区分大小写）判断文件类型
    pub fn from_filename(filename: &str) -> Self {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| EXTENSIONS.get(ext.to_ascii_lowercase().as_str()).copied())
            .unwrap_or(FileKind::Other)
    }
}

/// 根据内容和文件名把文件转成 LLM 可读的文本
pub trait FileSummarizer: Send + Sync {
    /// 不应失败；未知或损坏的输入返回最简描述
    ///
    /// 解码是 CPU 密集的同步操作，调用方应放到阻塞线程池执行
    fn summarize(&self, payload: &[u8], filename: &str) -> String;
}

/// 识别 CSV、表格、PDF、JSON 和纯文本的摘要器
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSummarizer;

impl FileSummarizer for DefaultSummarizer {
    fn summarize(&self, payload: &[u8], filename: &str) -> String {
        if payload.is_empty() {
            return "No content available".to_string();
        }
        let kind = FileKind::from_filename(filename);

        // 部分解码器遇到畸形输入会 panic
        match catch_unwind(AssertUnwindSafe(|| summarize_kind(kind, payload))) {
            Ok(summary) => summary,
            Err(_) => {
                warn!("Summarizer panicked on {}", filename);
                format!("Unreadable {:?} file: {} bytes", kind, payload.len())
            }
        }
    }
}

fn summarize_kind(kind: FileKind, payload: &[u8]) -> String {
    match kind {
        FileKind::Csv => summarize_csv(payload).unwrap_or_else(|e| {
            warn!("CSV analysis failed: {}", e);
            format!(
                "CSV file (could not parse): {}",
                excerpt(&String::from_utf8_lossy(payload), 1000)
            )
        }),
        FileKind::Spreadsheet => summarize_spreadsheet(payload).unwrap_or_else(|e| {
            warn!("Spreadsheet analysis failed: {}", e);
            format!("Spreadsheet file (could not parse): {} bytes", payload.len())
        }),
        FileKind::Pdf => match pdf_extract::extract_text_from_mem(payload) {
            Ok(text) => format!("PDF Content:\n{}...", excerpt(&text, TEXT_EXCERPT_CHARS)),
            Err(e) => {
                warn!("PDF text extraction failed: {}", e);
                format!("PDF file (no extractable text): {} bytes", payload.len())
            }
        },
        FileKind::Json => match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(value) => {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                format!("JSON Data:\n{}", excerpt(&pretty, TEXT_EXCERPT_CHARS))
            }
            Err(_) => format!(
                "JSON file (could not parse): {}",
                excerpt(&String::from_utf8_lossy(payload), 1000)
            ),
        },
        FileKind::Other => match std::str::from_utf8(payload) {
            Ok(text) => format!("Text content:\n{}", excerpt(text, TEXT_EXCERPT_CHARS)),
            Err(_) => format!("Binary file: {} bytes", payload.len()),
        },
    }
}

/// 单个 CSV 列的累计统计
#[derive(Debug, Default)]
struct ColumnStats {
    empty: usize,
    numeric: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    fn observe(&mut self, cell: &str) {
        let cell = cell.trim();
        if cell.is_empty() {
            self.empty += 1;
            return;
        }
        if let Ok(value) = cell.parse::<f64>() {
            if value.is_finite() {
                self.numeric += 1;
                self.sum += value;
                self.min = Some(self.min.map_or(value, |m| m.min(value)));
                self.max = Some(self.max.map_or(value, |m| m.max(value)));
            }
        }
    }
}

fn summarize_csv(payload: &[u8]) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(payload);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut stats: Vec<ColumnStats> = headers.iter().map(|_| ColumnStats::default()).collect();
    let mut head = Vec::new();
    let mut row_count = 0usize;

    for record in reader.records() {
        let record = record?;
        for (idx, cell) in record.iter().enumerate() {
            if let Some(column) = stats.get_mut(idx) {
                column.observe(cell);
            }
        }
        // 短行缺少的单元格按空值计
        for column in stats.iter_mut().skip(record.len()) {
            column.empty += 1;
        }
        if head.len() < HEAD_ROWS {
            head.push(record.iter().collect::<Vec<_>>().join(", "));
        }
        row_count += 1;
    }

    let mut out = String::from("CSV Analysis:\n");
    let _ = writeln!(out, "Shape: {} rows × {} columns", row_count, headers.len());
    let _ = writeln!(out, "Columns: {}", headers.join(", "));
    let _ = writeln!(out, "\nFirst rows:");
    let _ = writeln!(out, "{}", headers.join(", "));
    for line in &head {
        let _ = writeln!(out, "{}", line);
    }

    let numeric: Vec<_> = headers
        .iter()
        .zip(&stats)
        .filter(|(_, s)| s.numeric > 0)
        .collect();
    if !numeric.is_empty() {
        let _ = writeln!(out, "\nNumeric columns:");
        for (name, s) in numeric {
            let _ = writeln!(
                out,
                "- {}: count={} sum={} mean={} min={} max={}",
                name,
                s.numeric,
                s.sum,
                s.sum / s.numeric as f64,
                s.min.unwrap_or_default(),
                s.max.unwrap_or_default()
            );
        }
    }

    let _ = writeln!(out, "\nEmpty cells:");
    for (name, s) in headers.iter().zip(&stats) {
        let _ = writeln!(out, "- {}: {}", name, s.empty);
    }
    Ok(out)
}

fn summarize_spreadsheet(payload: &[u8]) -> Result<String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(payload.to_vec()))?;
    let sheet_names = workbook.sheet_names();

    let mut out = String::from("Spreadsheet Analysis:\n");
    let _ = writeln!(out, "Sheets: {}", sheet_names.join(", "));

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                let _ = writeln!(out, "\n[{}] unreadable: {}", name, e);
                continue;
            }
        };
        let (rows, cols) = range.get_size();
        let _ = writeln!(out, "\n[{}] {} rows × {} columns", name, rows, cols);
        for row in range.rows().take(HEAD_ROWS + 1) {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            let _ = writeln!(out, "{}", cells.join(", "));
        }
    }
    Ok(out)
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
