//! 题目提取 - 业务能力层
//!
//! 让 LLM 按固定 JSON 结构返回，把渲染后的页面文本变成 [`QuizSpec`]

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::models::QuizSpec;
use crate::services::llm_service::LlmGateway;
use crate::utils::truncate_text;

pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are a precise JSON extractor. Return only valid JSON.";

/// 文本中间的第一个围栏块：可选语言标记，正文到闭合标记为止
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

/// 构建页面的提取提示词
pub fn build_extraction_prompt(page_text: &str) -> String {
    format!(
        r#"You are parsing a quiz page. Extract the following information:

Page content:
{}

Extract and return a JSON object with exactly these keys:
- "question": The main question or task being asked
- "submit_url": The URL where the answer should be submitted (look for POST submission URL)
- "file_urls": List of any file URLs that need to be downloaded (PDFs, CSVs, etc.)
- "instructions": Any special instructions or context

Return ONLY valid JSON, nothing else.
"#,
        page_text
    )
}

/// 去掉回复外层的 markdown 代码围栏（如果有）
///
/// 支持 ```` ```json ````、```` ```JSON ````、裸 ```` ``` ```` 以及缺少闭合标记的围栏；
/// 以围栏开头时取到最后一个闭合标记为止，正文里引用的 ```` ``` ```` 不会截断结果。
/// 没有围栏的文本原样（去空白后）返回。
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let body = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || "_+-".contains(c))
            .trim_start_matches([' ', '\t']);
        let body = match body.rfind("```") {
            Some(end) => &body[..end],
            None => body,
        };
        return body.trim();
    }
    if let Some(body) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }
    text
}

/// 提取回复的宽松结构
#[derive(Debug, Default, Deserialize)]
struct ExtractedQuiz {
    #[serde(default)]
    question: Option<JsonValue>,
    #[serde(default)]
    submit_url: Option<String>,
    #[serde(default)]
    file_urls: Option<Vec<String>>,
    #[serde(default)]
    instructions: Option<JsonValue>,
}

/// 把提取回复解析成 `origin_url` 页面的题目描述
///
/// 先按原文解析，失败后才去掉代码围栏再解析。
/// 相对的 `submit_url` / `file_urls` 按 `origin_url` 解析成绝对地址，空项丢弃。
pub fn parse_quiz_spec(reply: &str, origin_url: &str) -> Result<QuizSpec> {
    let extracted: ExtractedQuiz = match serde_json::from_str(reply.trim()) {
        Ok(extracted) => extracted,
        Err(_) => {
            let json_text = strip_code_fence(reply);
            serde_json::from_str(json_text).with_context(|| {
                format!(
                    "extraction reply is not the expected JSON object: {}",
                    truncate_text(json_text, 200)
                )
            })?
        }
    };

    let base = Url::parse(origin_url).ok();

    Ok(QuizSpec {
        question: value_to_text(extracted.question),
        submit_url: extracted
            .submit_url
            .as_deref()
            .and_then(|u| resolve_url(base.as_ref(), u)),
        file_urls: extracted
            .file_urls
            .unwrap_or_default()
            .iter()
            .filter_map(|u| resolve_url(base.as_ref(), u))
            .collect(),
        instructions: value_to_text(extracted.instructions),
        origin_url: origin_url.to_string(),
    })
}

/// 调用 LLM 从页面文本提取题目
///
/// # 参数
/// - `llm`: 调用所用的网关（温度 0）
/// - `page_text`: 渲染后页面的可见文本
/// - `origin_url`: 页面来源 URL
///
/// # 返回
/// 解析好的题目描述，`origin_url` 由调用方决定
pub async fn extract_quiz(llm: &dyn LlmGateway, page_text: &str, origin_url: &str) -> Result<QuizSpec> {
    let prompt = build_extraction_prompt(page_text);
    let reply = llm
        .complete(EXTRACTION_SYSTEM_PROMPT, &prompt, true)
        .await
        .context("extraction call failed")?;
    debug!("Extraction reply: {}", truncate_text(&reply, 300));
    parse_quiz_spec(&reply, origin_url)
}

fn value_to_text(value: Option<JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn resolve_url(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }
    match base.and_then(|b| b.join(raw).ok()) {
        Some(joined) => Some(joined.to_string()),
        None => Some(raw.to_string()),
    }
}
