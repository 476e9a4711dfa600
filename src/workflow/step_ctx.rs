//! 步骤上下文
//!
//! 封装"我正在处理链上的第几次尝试、哪个 URL、截止到何时"这一信息

use std::fmt::Display;
use std::time::Duration;

use tokio::time::Instant;

/// 题目步骤上下文
#[derive(Debug, Clone)]
pub struct StepCtx {
    /// 链内的尝试序号（从1开始）
    pub attempt: usize,

    /// 题目页面 URL
    pub url: String,

    /// 链的截止时间
    pub deadline: Instant,
}

impl StepCtx {
    pub fn new(attempt: usize, url: impl Into<String>, deadline: Instant) -> Self {
        Self {
            attempt,
            url: url.into(),
            deadline,
        }
    }

    /// 距链截止时间的剩余时长
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Display for StepCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[step #{}]", self.attempt)
    }
}
