//! 带类型的题目答案
//!
//! 解答模型返回自由文本，`Answer::parse` 把其中的答案部分变成提交载荷里的值

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// 规范化后的答案，序列化为裸值（`4`、`true`、`"Paris"`、`{...}`）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Structured(JsonValue),
}

/// 变体标记，主要用于日志和断言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Integer,
    Real,
    Boolean,
    Text,
    Structured,
}

impl Answer {
    /// 规范化答案文本
    ///
    /// 依次尝试：JSON、整数、浮点数（仅当文本含 `.`）、布尔词 `true`/`yes`/`false`/`no`
    /// （不区分大小写），最后是原始文本。第一个成功的尝试决定结果
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Ok(value) = serde_json::from_str::<JsonValue>(text) {
            return Self::from_json(value);
        }

        if let Ok(integer) = text.parse::<i64>() {
            return Answer::Integer(integer);
        }

        if text.contains('.') {
            if let Some(real) = text.parse::<f64>().ok().filter(|r| r.is_finite()) {
                return Answer::Real(real);
            }
        }

        match text.to_lowercase().as_str() {
            "true" | "yes" => Answer::Boolean(true),
            "false" | "no" => Answer::Boolean(false),
            _ => Answer::Text(text.to_string()),
        }
    }

    /// 把解析出的 JSON 值映射到对应变体，容器和 null 保持结构化
    fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Bool(b) => Answer::Boolean(b),
            JsonValue::String(s) => Answer::Text(s),
            JsonValue::Number(n) => {
                if let Some(integer) = n.as_i64() {
                    Answer::Integer(integer)
                } else if n.is_f64() {
                    n.as_f64()
                        .map(Answer::Real)
                        .unwrap_or(Answer::Structured(JsonValue::Number(n)))
                } else {
                    // 超出 i64::MAX 的 u64
                    Answer::Structured(JsonValue::Number(n))
                }
            }
            other => Answer::Structured(other),
        }
    }

    pub fn kind(&self) -> AnswerKind {
        match self {
            Answer::Integer(_) => AnswerKind::Integer,
            Answer::Real(_) => AnswerKind::Real,
            Answer::Boolean(_) => AnswerKind::Boolean,
            Answer::Text(_) => AnswerKind::Text,
            Answer::Structured(_) => AnswerKind::Structured,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Integer(i) => write!(f, "{}", i),
            Answer::Real(r) => write!(f, "{}", r),
            Answer::Boolean(b) => write!(f, "{}", b),
            Answer::Text(s) => write!(f, "{}", s),
            Answer::Structured(v) => write!(f, "{}", v),
        }
    }
}
