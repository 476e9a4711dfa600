//! 答案求解 - 业务能力层
//!
//! 用题目描述和文件摘要构建解答提示词，再从模型回复里取出最终答案

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::{Answer, QuizSpec};
use crate::services::llm_service::LlmGateway;
use crate::utils::truncate_text;

pub const SOLVER_SYSTEM_PROMPT: &str =
    "You are an expert data analyst. Solve the given task accurately.";

/// 模型必须放在最终答案前面的标记
pub const ANSWER_MARKER: &str = "ANSWER:";

/// 交给解答模型的单个文件摘要
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub filename: String,
    /// 已截断的摘要
    pub excerpt: String,
}

/// 构建解答提示词
///
/// # 参数
/// - `spec`: 提取出的题目
/// - `summaries`: 下载成功的文件摘要
///
/// # 返回
/// 完整的用户提示词
pub fn build_solve_prompt(spec: &QuizSpec, summaries: &[FileSummary]) -> String {
    let mut context = format!(
        "Question: {}\n\nInstructions: {}\n\nDownloaded files: {}\n",
        spec.question,
        spec.instructions,
        summaries.len()
    );

    if !summaries.is_empty() {
        context.push_str("\n=== FILE ANALYSIS ===");
        for summary in summaries {
            context.push_str(&format!("\n\n{}:\n{}", summary.filename, summary.excerpt));
        }
    }

    format!(
        r#"{}

Solve this question and provide the answer in the correct format.

IMPORTANT:
- If the answer is a number, return just the number (e.g., 12345)
- If it's a string, return the string
- If it's a boolean, return true or false
- If it's a complex object, return valid JSON
- If you need to return an image/chart, return it as a base64 data URI

Think step by step and provide your final answer clearly marked as {} <your answer>
"#,
        context, ANSWER_MARKER
    )
}

/// 最后一个答案标记（不区分大小写）之后的文本，没有标记时返回整个回复
pub fn extract_answer_text(reply: &str) -> &str {
    // ASCII 大写转换不改变字节偏移
    let upper = reply.to_ascii_uppercase();
    match upper.rfind(ANSWER_MARKER) {
        Some(pos) => reply[pos + ANSWER_MARKER.len()..].trim(),
        None => reply.trim(),
    }
}

/// 调用解答模型获取答案并规范化
pub async fn solve(llm: &dyn LlmGateway, spec: &QuizSpec, summaries: &[FileSummary]) -> Result<Answer> {
    let prompt = build_solve_prompt(spec, summaries);
    debug!("Solve prompt length: {} chars", prompt.len());

    let reply = llm
        .complete(SOLVER_SYSTEM_PROMPT, &prompt, true)
        .await
        .context("solve call failed")?;
    info!("LLM response: {}", truncate_text(&reply, 300));

    Ok(Answer::parse(extract_answer_text(&reply)))
}
