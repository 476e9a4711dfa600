//! 页面渲染器 - 基础设施层
//!
//! 持有稀缺资源（浏览器），只对外提供"把 URL 渲染成文本"能力

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::browser::launch_headless_browser;
use crate::config::Config;
use crate::error::BrowserError;

const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// 能把 URL 变成可见文本的浏览器会话
///
/// 职责：
/// - 整条链运行期间持有浏览器
/// - 不关心题目
/// - 通过 `shutdown` 恰好释放一次
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 在新页面中打开 `url`，返回 body 的可见文本
    async fn render_text(&self, url: &str) -> Result<String>;

    /// 释放浏览器会话
    async fn shutdown(&mut self);
}

/// 打开浏览器会话，每次链运行一个
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageRenderer>>;
}

/// 启动本地无头 Chromium 会话
pub struct ChromiumLauncher {
    chrome_executable: Option<String>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl ChromiumLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            navigation_timeout: config.navigation_timeout,
            settle_delay: config.render_settle_delay,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageRenderer>> {
        let (browser, handler_task) =
            launch_headless_browser(self.chrome_executable.as_deref()).await?;
        Ok(Box::new(ChromiumRenderer {
            browser,
            handler_task,
            navigation_timeout: self.navigation_timeout,
            settle_delay: self.settle_delay,
            closed: false,
        }))
    }
}

/// 基于 Chromium 的渲染器
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
    settle_delay: Duration,
    closed: bool,
}

impl ChromiumRenderer {
    async fn read_page(&self, page: &Page, url: &str) -> Result<String> {
        match timeout(self.navigation_timeout, page.goto(url)).await {
            Err(_) => {
                return Err(BrowserError::NavigationTimedOut {
                    url: url.to_string(),
                    secs: self.navigation_timeout.as_secs(),
                }
                .into())
            }
            Ok(Err(e)) => {
                return Err(BrowserError::NavigationFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
            Ok(Ok(_)) => {}
        }

        // goto 只等到 load 事件；固定等待代替网络空闲，留给客户端渲染
        sleep(self.settle_delay).await;

        let text: String = page
            .evaluate(BODY_TEXT_JS)
            .await
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))?
            .into_value()
            .context("body text was not a string")?;
        Ok(text)
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render_text(&self, url: &str) -> Result<String> {
        debug!("Rendering {}", url);
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        let result = self.read_page(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Closing page for {} failed: {}", url, e);
        }
        result
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.browser.close().await {
            warn!("Closing browser failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler_task.abort();
        debug!("Browser session released");
    }
}
