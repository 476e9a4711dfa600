//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! handlers (webhook：接收 / 拒绝，分派)
//!     ↓
//! orchestrator::ChainController (一条链：预算、续题、浏览器生命周期)
//!     ↓
//! workflow::QuizStepExecutor (一个题目页面)
//!     ↓
//! services (llm / extractor / solver / fetcher / summarizer / submitter)
//!     ↓
//! infrastructure (PageRenderer, HTTP client)
//! ```
//!
//! 只有本层持有浏览器会话

pub mod chain_controller;

pub use chain_controller::{decide, ChainController, Decision};
