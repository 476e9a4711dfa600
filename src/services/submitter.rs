//! 答案提交 - 业务能力层
//!
//! 协议：以 JSON `POST {email, secret, url, answer}`；回复是 JSON，
//! 至少包含 `correct`，可选 `url` / `reason`

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::error::ApiError;
use crate::models::{Answer, StepOutcome};

/// 发往题目提交接口的请求体
#[derive(Serialize)]
pub struct SubmissionPayload<'a> {
    pub email: &'a str,
    pub secret: &'a str,
    /// 答案所属的题目页面
    pub url: &'a str,
    pub answer: &'a Answer,
}

/// 提交答案并解析评分结果，不重试
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload<'_>) -> Result<StepOutcome>;
}

/// 基于 reqwest 的提交器
pub struct HttpSubmitter {
    client: Client,
}

impl HttpSubmitter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload<'_>) -> Result<StepOutcome> {
        info!("📤 Submitting answer to {}", submit_url);

        let response = self
            .client
            .post(submit_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: submit_url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: submit_url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let parse_failed = |reason: String| ApiError::JsonParseFailed {
            endpoint: submit_url.to_string(),
            reason,
        };
        let body: JsonValue = response.json().await.map_err(|e| parse_failed(e.to_string()))?;
        info!("Submission result: {}", body);

        let outcome = StepOutcome::from_response(body).map_err(|e| parse_failed(e.to_string()))?;
        Ok(outcome)
    }
}
