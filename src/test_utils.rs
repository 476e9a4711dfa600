//! 浏览器、LLM、下载和提交接口的内存替身

pub mod fakes {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};

    use crate::error::StepError;
    use crate::infrastructure::{BrowserLauncher, PageRenderer};
    use crate::models::{DownloadedFile, StepOutcome};
    use crate::services::{FileFetcher, LlmGateway, SubmissionPayload, Submitter};
    use crate::workflow::{StepCtx, StepRunner};

    #[derive(Debug, Clone)]
    pub struct LlmCall {
        pub system: String,
        pub user: String,
        pub deterministic: bool,
    }

    /// 按顺序返回预设文本，`Err` 项变成调用失败
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<LlmCall>>,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<LlmCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedLlm {
        async fn complete(&self, system_prompt: &str, user_prompt: &str, deterministic: bool) -> Result<String> {
            self.calls.lock().unwrap().push(LlmCall {
                system: system_prompt.to_string(),
                user: user_prompt.to_string(),
                deterministic,
            });
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(reason)) => Err(anyhow!(reason)),
                None => Err(anyhow!("no scripted reply left")),
            }
        }
    }

    /// 从映射表返回页面文本，未知 URL 渲染失败
    #[derive(Default)]
    pub struct FakeRenderer {
        pages: HashMap<String, Result<String, String>>,
        rendered: Mutex<Vec<String>>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        pub fn with_page(url: &str, text: &str) -> Self {
            let mut renderer = Self::default();
            renderer.pages.insert(url.to_string(), Ok(text.to_string()));
            renderer
        }

        pub fn failing(url: &str, reason: &str) -> Self {
            let mut renderer = Self::default();
            renderer.pages.insert(url.to_string(), Err(reason.to_string()));
            renderer
        }

        pub fn rendered(&self) -> Vec<String> {
            self.rendered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render_text(&self, url: &str) -> Result<String> {
            self.rendered.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(reason)) => Err(anyhow!(reason.clone())),
                None => Err(anyhow!("no page at {}", url)),
            }
        }

        async fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 发放 `FakeRenderer`，并统计启动和关闭次数
    #[derive(Default)]
    pub struct FakeLauncher {
        failure: Option<String>,
        launches: AtomicUsize,
        shutdowns: Arc<AtomicUsize>,
    }

    impl FakeLauncher {
        pub fn failing(reason: &str) -> Self {
            Self {
                failure: Some(reason.to_string()),
                ..Self::default()
            }
        }

        pub fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }

        pub fn shutdowns(&self) -> usize {
            self.shutdowns.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn PageRenderer>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &self.failure {
                return Err(anyhow!(reason.clone()));
            }
            Ok(Box::new(FakeRenderer {
                shutdowns: self.shutdowns.clone(),
                ..FakeRenderer::default()
            }))
        }
    }

    /// 从映射表返回文件内容，未知 URL 下载失败
    #[derive(Default)]
    pub struct FakeFetcher {
        files: HashMap<String, Result<Vec<u8>, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn with_file(mut self, url: &str, body: &[u8]) -> Self {
            self.files.insert(url.to_string(), Ok(body.to_vec()));
            self
        }

        pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
            self.files.insert(url.to_string(), Err(reason.to_string()));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<DownloadedFile> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.files.get(url) {
                Some(Ok(body)) => Ok(DownloadedFile::new(url, "application/octet-stream", body.clone())),
                Some(Err(reason)) => Err(anyhow!(reason.clone())),
                None => Err(anyhow!("404 Not Found: {}", url)),
            }
        }
    }

    /// 以 JSON 记录每次提交，并返回预设的响应体
    pub struct RecordingSubmitter {
        responses: Mutex<VecDeque<Result<JsonValue, String>>>,
        payloads: Mutex<Vec<(String, JsonValue)>>,
    }

    impl RecordingSubmitter {
        pub fn new(responses: Vec<Result<JsonValue, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                payloads: Mutex::new(Vec::new()),
            }
        }

        /// 按调用顺序的 `(submit_url, payload)` 对
        pub fn payloads(&self) -> Vec<(String, JsonValue)> {
            self.payloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Submitter for RecordingSubmitter {
        async fn submit(&self, submit_url: &str, payload: &SubmissionPayload<'_>) -> Result<StepOutcome> {
            self.payloads
                .lock()
                .unwrap()
                .push((submit_url.to_string(), serde_json::to_value(payload)?));
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(body)) => Ok(StepOutcome::from_response(body)?),
                Some(Err(reason)) => Err(anyhow!(reason)),
                None => Err(anyhow!("no scripted response left")),
            }
        }
    }

    /// 每步消耗预设（虚拟）时间的步骤执行器
    pub struct ScriptedRunner {
        steps: Mutex<VecDeque<(Duration, Result<StepOutcome, StepError>)>>,
        seen: Mutex<Vec<StepCtx>>,
    }

    impl ScriptedRunner {
        pub fn new(steps: Vec<(Duration, Result<StepOutcome, StepError>)>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn seen(&self) -> Vec<StepCtx> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepRunner for ScriptedRunner {
        async fn execute(&self, _renderer: &dyn PageRenderer, ctx: &StepCtx) -> Result<StepOutcome, StepError> {
            self.seen.lock().unwrap().push(ctx.clone());
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some((duration, result)) => {
                    tokio::time::sleep(duration).await;
                    result
                }
                None => Err(StepError::Render("no scripted step left".to_string())),
            }
        }
    }

    /// 模拟提交接口返回的评分结果
    pub fn outcome(correct: bool, next_url: Option<&str>) -> StepOutcome {
        StepOutcome::from_response(json!({ "correct": correct, "url": next_url }))
            .unwrap_or_else(|e| panic!("bad outcome fixture: {}", e))
    }
}
