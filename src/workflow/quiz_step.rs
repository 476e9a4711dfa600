//! 题目步骤 - 流程层
//!
//! 核心职责：定义"一个题目页面"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染页面
//! 2. LLM 提取 → `QuizSpec`
//! 3. 下载并摘要引用的文件（单个文件失败直接跳过）
//! 4. LLM 解答 → 规范化的 `Answer`
//! 5. 提交 → `StepOutcome`
//!
//! 所有失败都以 `StepError` 返回，不会以其他形式越过这一层

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::StepError;
use crate::infrastructure::{build_http_client, PageRenderer};
use crate::models::{QuizSpec, StepOutcome};
use crate::services::{
    answer_solver, quiz_extractor, DefaultSummarizer, FileFetcher, FileSummarizer, FileSummary,
    HttpFileFetcher, HttpSubmitter, LlmGateway, LlmService, SubmissionPayload, Submitter,
};
use crate::utils::truncate_text;
use crate::workflow::step_ctx::StepCtx;

/// 链控制器对步骤执行器的要求
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn execute(&self, renderer: &dyn PageRenderer, ctx: &StepCtx) -> Result<StepOutcome, StepError>;
}

/// 步骤依赖的能力集合
#[derive(Clone)]
pub struct StepServices {
    pub extractor_llm: Arc<dyn LlmGateway>,
    pub solver_llm: Arc<dyn LlmGateway>,
    pub fetcher: Arc<dyn FileFetcher>,
    pub summarizer: Arc<dyn FileSummarizer>,
    pub submitter: Arc<dyn Submitter>,
}

impl StepServices {
    /// 生产环境装配：兼容 OpenAI 的 LLM，reqwest 下载与提交
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.http_timeout)?;
        Ok(Self {
            extractor_llm: Arc::new(LlmService::for_extraction(config)),
            solver_llm: Arc::new(LlmService::for_solving(config)),
            fetcher: Arc::new(HttpFileFetcher::new(http.clone())),
            summarizer: Arc::new(DefaultSummarizer),
            submitter: Arc::new(HttpSubmitter::new(http)),
        })
    }
}

/// 题目步骤执行器
///
/// 职责：
/// - 编排一次 渲染 → 提取 → 文件 → 解答 → 提交
/// - 不持有浏览器，渲染器由控制器按次借出
/// - 步骤之间不保留任何状态
pub struct QuizStepExecutor {
    services: StepServices,
    email: String,
    secret: SecretString,
    safety_margin: Duration,
    file_excerpt_chars: usize,
}

impl QuizStepExecutor {
    pub fn new(config: &Config, services: StepServices) -> Self {
        Self {
            services,
            email: config.email.clone(),
            secret: config.secret.clone(),
            safety_margin: config.safety_margin,
            file_excerpt_chars: config.file_excerpt_chars,
        }
    }

    /// 执行一个步骤
    ///
    /// # 参数
    /// - `renderer`: 整条链共用的浏览器会话
    /// - `ctx`: 尝试序号、URL 和链截止时间
    ///
    /// # 返回
    /// 提交的判定结果，或步骤没有结果的原因
    pub async fn run(&self, renderer: &dyn PageRenderer, ctx: &StepCtx) -> Result<StepOutcome, StepError> {
        // ========== 步骤 1: 渲染页面 ==========
        let page_text = renderer.render_text(&ctx.url).await.map_err(|e| {
            error!("{} ❌ Failed to render {}: {:#}", ctx, ctx.url, e);
            StepError::Render(StepError::describe(&e))
        })?;
        info!("{} Page content extracted, length: {}", ctx, page_text.len());

        // ========== 步骤 2: 提取题目 ==========
        let spec = quiz_extractor::extract_quiz(self.services.extractor_llm.as_ref(), &page_text, &ctx.url)
            .await
            .map_err(|e| {
                error!("{} ❌ Failed to parse quiz content: {:#}", ctx, e);
                StepError::Extraction(StepError::describe(&e))
            })?;
        info!("{} 🔍 Quiz parsed: {}", ctx, truncate_text(&spec.question, 100));

        // 没有提交地址就无法评分
        let Some(submit_url) = spec.submit_url.clone() else {
            error!("{} ❌ No submit URL found", ctx);
            return Err(StepError::NoSubmitUrl);
        };

        // ========== 步骤 3: 下载文件 ==========
        let summaries = self.ingest_files(&spec, ctx).await;

        // ========== 步骤 4: 解答 ==========
        if ctx.remaining() < self.safety_margin {
            warn!(
                "{} ⚠️ Running out of time ({}s left), answer may be rushed",
                ctx,
                ctx.remaining().as_secs()
            );
        }
        let answer = answer_solver::solve(self.services.solver_llm.as_ref(), &spec, &summaries)
            .await
            .map_err(|e| {
                error!("{} ❌ Failed to generate answer: {:#}", ctx, e);
                StepError::Solve(StepError::describe(&e))
            })?;
        info!(
            "{} Generated answer ({:?}): {}",
            ctx,
            answer.kind(),
            truncate_text(&answer.to_string(), 200)
        );

        // ========== 步骤 5: 提交 ==========
        let payload = SubmissionPayload {
            email: &self.email,
            secret: self.secret.expose_secret(),
            url: &spec.origin_url,
            answer: &answer,
        };
        let outcome = self
            .services
            .submitter
            .submit(&submit_url, &payload)
            .await
            .map_err(|e| {
                error!("{} ❌ Error submitting answer: {:#}", ctx, e);
                StepError::Submission(StepError::describe(&e))
            })?;

        Ok(outcome)
    }

    /// 下载并摘要所有引用的文件，下载失败的跳过
    async fn ingest_files(&self, spec: &QuizSpec, ctx: &StepCtx) -> Vec<FileSummary> {
        let mut summaries = Vec::with_capacity(spec.file_urls.len());

        for file_url in &spec.file_urls {
            let file = match self.services.fetcher.fetch(file_url).await {
                Ok(file) => file,
                Err(e) => {
                    warn!("{} ⚠️ Error downloading {}: {:#}", ctx, file_url, e);
                    continue;
                }
            };

            let analysis = self.summarize_blocking(file.payload, &file.filename).await;
            info!(
                "{} ✓ Ingested {} ({} bytes)",
                ctx, file.filename, file.byte_size
            );
            summaries.push(FileSummary {
                filename: file.filename,
                excerpt: analysis.chars().take(self.file_excerpt_chars).collect(),
            });
        }

        if summaries.len() < spec.file_urls.len() {
            warn!(
                "{} ⚠️ Ingested {}/{} files",
                ctx,
                summaries.len(),
                spec.file_urls.len()
            );
        }
        summaries
    }

    /// 在阻塞线程池里解析文件内容，解析任务崩溃时退化成最简描述
    async fn summarize_blocking(&self, payload: Vec<u8>, filename: &str) -> String {
        let summarizer = self.services.summarizer.clone();
        let name = filename.to_string();
        let byte_size = payload.len();

        tokio::task::spawn_blocking(move || summarizer.summarize(&payload, &name))
            .await
            .unwrap_or_else(|e| {
                warn!("⚠️ Summarizing {} aborted: {}", filename, e);
                format!("Unreadable file: {} bytes", byte_size)
            })
    }
}

#[async_trait]
impl StepRunner for QuizStepExecutor {
    async fn execute(&self, renderer: &dyn PageRenderer, ctx: &StepCtx) -> Result<StepOutcome, StepError> {
        self.run(renderer, ctx).await
    }
}
