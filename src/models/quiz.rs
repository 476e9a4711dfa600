//! 单个步骤的题目数据

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 文本类下载的预览长度
const PREVIEW_CHARS: usize = 1000;

/// 一个题目页面的结构化描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSpec {
    /// 题目或任务
    pub question: String,
    /// 答案的 POST 地址，页面没有给出时为 `None`
    pub submit_url: Option<String>,
    /// 题目引用的数据文件，按页面顺序
    pub file_urls: Vec<String>,
    pub instructions: String,
    /// 页面渲染来源 URL，总是由执行器设置
    pub origin_url: String,
}

/// 为一个步骤下载的数据文件
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub source_url: String,
    pub filename: String,
    pub byte_size: usize,
    pub content_type: String,
    pub payload: Vec<u8>,
    pub preview: Option<String>,
}

impl DownloadedFile {
    pub fn new(source_url: &str, content_type: &str, payload: Vec<u8>) -> Self {
        let filename = filename_from_url(source_url);
        let preview = build_preview(&filename, content_type, &payload);
        Self {
            source_url: source_url.to_string(),
            filename,
            byte_size: payload.len(),
            content_type: content_type.to_string(),
            payload,
            preview,
        }
    }
}

/// URL 路径的最后一段，忽略查询串和片段
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(name) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            return name.to_string();
        }
    }
    url.rsplit('/').next().unwrap_or_default().to_string()
}

fn build_preview(filename: &str, content_type: &str, payload: &[u8]) -> Option<String> {
    let lower = filename.to_lowercase();
    if content_type.contains("text") || lower.ends_with(".csv") {
        let text = String::from_utf8_lossy(payload);
        Some(text.chars().take(PREVIEW_CHARS).collect())
    } else if lower.ends_with(".pdf") {
        Some("PDF file downloaded".to_string())
    } else {
        None
    }
}

/// 一次提交的评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub correct: bool,
    pub next_url: Option<String>,
    pub reason: Option<String>,
    /// 完整的响应体
    pub raw_response: JsonValue,
}

/// 提交接口回复的结构
#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    correct: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    reason: Option<JsonValue>,
}

impl StepOutcome {
    /// 解析提交接口的响应体
    ///
    /// `correct` 必须存在；`url` 缺失、为 `null` 或为空表示没有下一题
    pub fn from_response(raw_response: JsonValue) -> Result<Self, serde_json::Error> {
        let response: SubmissionResponse = serde_json::from_value(raw_response.clone())?;
        let reason = match response.reason {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        Ok(Self {
            correct: response.correct,
            next_url: response.url.filter(|u| !u.trim().is_empty()),
            reason,
            raw_response,
        })
    }
}
