//! 文件下载 - 业务能力层

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::debug;

use crate::error::ApiError;
use crate::models::DownloadedFile;

/// 下载单个文件，受客户端超时约束，不重试
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<DownloadedFile>;
}

/// 基于 reqwest 的下载器
pub struct HttpFileFetcher {
    client: Client,
}

impl HttpFileFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, url: &str) -> Result<DownloadedFile> {
        debug!("Downloading {}", url);
        let request_failed = |e: reqwest::Error| ApiError::RequestFailed {
            endpoint: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let payload = response.bytes().await.map_err(request_failed)?.to_vec();
        let file = DownloadedFile::new(url, &content_type, payload);
        debug!(
            "Downloaded {} ({} bytes, {})",
            file.filename, file.byte_size, file.content_type
        );
        Ok(file)
    }
}
