use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

const USER_AGENT: &str = concat!("quiz_solver/", env!("CARGO_PKG_VERSION"));

/// 构建下载和提交共用的 HTTP 客户端
///
/// # 参数
/// - `timeout`: 单次请求超时，覆盖连接和传输
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}
