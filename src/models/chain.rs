//! 链运行状态，以及运行结束时生成的报告

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;

use crate::error::StepError;

/// 一次链调用的可变状态，归控制器所有
#[derive(Debug, Clone)]
pub struct ChainRun {
    pub start_time: Instant,
    /// 开始时的本地时间，写入结束日志
    pub started_at: DateTime<Local>,
    pub current_url: Option<String>,
    pub attempt_count: usize,
    pub deadline: Instant,
}

impl ChainRun {
    pub fn new(initial_url: &str, budget: Duration) -> Self {
        let start_time = Instant::now();
        Self {
            start_time,
            started_at: Local::now(),
            current_url: Some(initial_url.to_string()),
            attempt_count: 0,
            deadline: start_time + budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 距截止时间的剩余时长，过期后为零
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// 链运行的结束方式
#[derive(Debug, Clone, PartialEq)]
pub enum ChainStatus {
    /// 最后一次回答正确且没有下一题
    Completed,
    /// 最后一次回答错误且没有下一题
    Failed { reason: Option<String> },
    /// 某个步骤没有产出结果
    StepFailed(StepError),
    /// 截止时还有待处理的题目
    BudgetExhausted,
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStatus::Completed => write!(f, "✅ completed"),
            ChainStatus::Failed { reason } => write!(
                f,
                "❌ failed: {}",
                reason.as_deref().unwrap_or("no reason given")
            ),
            ChainStatus::StepFailed(e) => write!(f, "❌ step failed: {}", e),
            ChainStatus::BudgetExhausted => write!(f, "⏱️ time budget exhausted"),
        }
    }
}

/// 一次链运行的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub attempts: usize,
    pub status: ChainStatus,
    /// 最后开始的步骤的 URL
    pub last_url: Option<String>,
    pub elapsed: Duration,
}
