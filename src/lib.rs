//! # Quiz Solver
//!
//! 自动解答网页题目链的 Rust 应用程序：无头浏览器渲染页面，LLM 读题作答并提交，
//! 评分回复里可能带着下一题的地址
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `PageRenderer` - 唯一的浏览器会话 owner，把 URL 渲染成可见文本
//! - `build_http_client` - 共享的出站 HTTP 客户端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，一次只处理一道题
//! - `LlmService` - 文本补全能力
//! - `quiz_extractor` / `answer_solver` - 提示词与回复解析
//! - `HttpFileFetcher` / `DefaultSummarizer` - 文件下载与摘要
//! - `HttpSubmitter` - 提交协议
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个题目页面"的完整处理流程
//! - `StepCtx` - 上下文封装（尝试序号 + URL + 截止时间）
//! - `QuizStepExecutor` - 流程编排（render → extract → ingest → solve → submit）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/chain_controller` - 时间预算、续题、浏览器生命周期
//!
//! Webhook（`app`、`handlers`）位于最上层，只负责接收和分派链运行

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use error::{AppError, AppResult, StepError};
pub use models::{Answer, ChainReport, ChainStatus, QuizSpec, StepOutcome};
pub use orchestrator::ChainController;
pub use workflow::{QuizStepExecutor, StepCtx, StepRunner, StepServices};
