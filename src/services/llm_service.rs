//! LLM 服务 - 业务能力层
//!
//! 只负责"发送提示词、拿回文本"能力，不关心题目
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型，兼容 OpenAI API 的服务
//! - 关闭 `async-openai` 内置的退避重试，每次调用受 `http_timeout` 约束

use std::time::Duration;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use secrecy::ExposeSecret;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 非确定性调用使用的温度
const CREATIVE_TEMPERATURE: f32 = 0.3;

/// 文本补全能力
///
/// 调用背后没有任何重试，失败原样交给调用方
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// # 参数
    /// - `system_prompt`: 系统消息，设定模型角色
    /// - `user_prompt`: 用户消息，实际请求
    /// - `deterministic`: 为 `true` 时温度固定为 0
    ///
    /// # 返回
    /// 模型的回复（已去除首尾空白）
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        deterministic: bool,
    ) -> Result<String>;
}

/// LLM 服务
///
/// 职责：
/// - 绑定一个模型调用兼容 OpenAI 的 chat completion 接口
/// - 单次调用，超时即失败
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    request_timeout: Duration,
}

/// 第一次失败后立即放弃的退避策略
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    }
}

impl LlmService {
    /// 使用配置中的凭证和端点，为 `model_name` 创建服务
    pub fn new(config: &Config, model_name: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.llm_api_key.expose_secret())
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config).with_backoff(no_retry());

        Self {
            client,
            model_name: model_name.to_string(),
            request_timeout: config.http_timeout,
        }
    }

    /// 从页面文本提取题目用的服务
    pub fn for_extraction(config: &Config) -> Self {
        Self::new(config, &config.extraction_model)
    }

    /// 解答题目用的服务
    pub fn for_solving(config: &Config) -> Self {
        Self::new(config, &config.solver_model)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl LlmGateway for LlmService {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        deterministic: bool,
    ) -> Result<String> {
        debug!("Calling LLM API, model: {}", self.model_name);
        debug!("User prompt length: {} chars", user_prompt.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        let temperature = if deterministic { 0.0 } else { CREATIVE_TEMPERATURE };
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(temperature)
            .build()?;

        let response = match timeout(self.request_timeout, self.client.chat().create(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("LLM API call failed: {}", e);
                return Err(LlmError::ApiCallFailed {
                    model: self.model_name.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
            Err(_) => {
                warn!("LLM API call timed out after {:?}", self.request_timeout);
                return Err(LlmError::ApiCallFailed {
                    model: self.model_name.clone(),
                    reason: format!("no reply within {:?}", self.request_timeout),
                }
                .into());
            }
        };

        debug!("LLM API call succeeded");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}
