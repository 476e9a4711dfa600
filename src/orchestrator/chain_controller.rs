//! 链控制器 - 编排层
//!
//! ## 职责
//!
//! 1. **资源管理**：第一步之前打开浏览器会话，结束时恰好释放一次（步骤 panic 也一样）
//! 2. **时间预算**：截止时间过后不再开始新步骤
//! 3. **续题**：按 [`decide`] 的决策表跟随 `next_url`
//! 4. **节奏**：步骤之间固定等待，不超过截止时间
//!
//! 步骤严格串行；不同链运行之间不共享任何东西

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::StepError;
use crate::infrastructure::{BrowserLauncher, ChromiumLauncher, PageRenderer};
use crate::models::{ChainReport, ChainRun, ChainStatus, StepOutcome};
use crate::utils::logging::{log_chain_finished, log_chain_start};
use crate::workflow::{QuizStepExecutor, StepCtx, StepRunner, StepServices};

/// 一个步骤之后循环要做的事
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// 继续处理这个 URL
    Continue(String),
    /// 以此状态结束链
    Stop(ChainStatus),
}

/// 每个步骤之后应用的决策表
///
/// | 步骤结果               | 决策                 |
/// |------------------------|----------------------|
/// | 正确，有下一题         | 继续                 |
/// | 正确，无下一题         | 停止：completed      |
/// | 错误，有下一题         | 继续（跳过本题）     |
/// | 错误，无下一题         | 停止：failed         |
/// | 无结果                 | 停止：step failed    |
pub fn decide(result: Result<StepOutcome, StepError>) -> Decision {
    match result {
        Err(e) => Decision::Stop(ChainStatus::StepFailed(e)),
        Ok(StepOutcome {
            next_url: Some(next),
            ..
        }) => Decision::Continue(next),
        Ok(StepOutcome {
            correct: true,
            next_url: None,
            ..
        }) => Decision::Stop(ChainStatus::Completed),
        Ok(StepOutcome {
            correct: false,
            next_url: None,
            reason,
            ..
        }) => Decision::Stop(ChainStatus::Failed { reason }),
    }
}

/// 从第一个 URL 驱动一条题目链直到停止条件
#[derive(Clone)]
pub struct ChainController {
    launcher: Arc<dyn BrowserLauncher>,
    runner: Arc<dyn StepRunner>,
    budget: Duration,
    step_delay: Duration,
}

impl ChainController {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        runner: Arc<dyn StepRunner>,
        budget: Duration,
        step_delay: Duration,
    ) -> Self {
        Self {
            launcher,
            runner,
            budget,
            step_delay,
        }
    }

    /// 生产环境装配：无头 Chromium 加真实的步骤执行器
    pub fn from_config(config: &Config) -> Result<Self> {
        let services = StepServices::from_config(config)?;
        Ok(Self::new(
            Arc::new(ChromiumLauncher::new(config)),
            Arc::new(QuizStepExecutor::new(config, services)),
            config.chain_budget,
            config.step_delay,
        ))
    }

    /// 运行整条链
    ///
    /// # 参数
    /// - `initial_url`: 第一题的 URL
    ///
    /// # 返回
    /// 链的结束方式；错误不会向外抛出，而是折叠进报告
    pub async fn run(&self, initial_url: &str) -> ChainReport {
        log_chain_start(initial_url, self.budget);
        let mut run = ChainRun::new(initial_url, self.budget);

        let mut renderer = match self.launcher.launch().await {
            Ok(renderer) => renderer,
            Err(e) => {
                error!("❌ Failed to launch browser: {:#}", e);
                let status = ChainStatus::StepFailed(StepError::Render(StepError::describe(&e)));
                return Self::finish(&run, status, None);
            }
        };

        let mut last_url = None;
        let result = AssertUnwindSafe(self.drive(renderer.as_ref(), &mut run, &mut last_url))
            .catch_unwind()
            .await;

        // 所有路径都会释放，包括步骤 panic
        renderer.shutdown().await;

        match result {
            Ok(status) => Self::finish(&run, status, last_url),
            Err(panic) => {
                error!("❌ Chain aborted by an internal panic");
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn drive(
        &self,
        renderer: &dyn PageRenderer,
        run: &mut ChainRun,
        last_url: &mut Option<String>,
    ) -> ChainStatus {
        while let Some(url) = run.current_url.take() {
            if run.is_expired() {
                warn!("⏱️ Time limit exceeded, {} not attempted", url);
                run.current_url = Some(url);
                return ChainStatus::BudgetExhausted;
            }

            run.attempt_count += 1;
            let ctx = StepCtx::new(run.attempt_count, url.clone(), run.deadline);
            info!(
                "{} 🚀 Processing {} ({}s left)",
                ctx,
                url,
                run.remaining().as_secs()
            );
            *last_url = Some(url);

            let result = self.runner.execute(renderer, &ctx).await;
            match &result {
                Ok(outcome) if outcome.correct => info!("{} ✅ Correct answer", ctx),
                Ok(outcome) => warn!(
                    "{} ❌ Wrong answer: {}",
                    ctx,
                    outcome.reason.as_deref().unwrap_or("no reason given")
                ),
                Err(e) => error!("{} ❌ Step produced no outcome: {}", ctx, e),
            }

            match decide(result) {
                Decision::Continue(next) => {
                    info!("{} ➡️ Next quiz: {}", ctx, next);
                    run.current_url = Some(next);
                    self.pause(run).await;
                }
                Decision::Stop(status) => return status,
            }
        }
        ChainStatus::Completed
    }

    /// 步骤间等待，不超过截止时间
    async fn pause(&self, run: &ChainRun) {
        let delay = self.step_delay.min(run.remaining());
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    fn finish(run: &ChainRun, status: ChainStatus, last_url: Option<String>) -> ChainReport {
        let elapsed = run.elapsed();
        log_chain_finished(run.attempt_count, &status.to_string(), run.started_at, elapsed);
        ChainReport {
            attempts: run.attempt_count,
            status,
            last_url,
            elapsed,
        }
    }
}
