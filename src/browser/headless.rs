use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::BrowserError;

/// 为一次链运行启动无头浏览器
///
/// # 参数
/// - `chrome_executable`: 指定的浏览器可执行文件，`None` 时自动查找
///
/// # 返回
/// 浏览器实例，以及消费其 CDP 事件流的后台任务（浏览器关闭后任务自行结束）
pub async fn launch_headless_browser(
    chrome_executable: Option<&str>,
) -> Result<(Browser, JoinHandle<()>)> {
    info!("🚀 Launching headless browser...");

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
    ]);
    if let Some(path) = chrome_executable {
        debug!("Using browser executable: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }

    let config = builder.build().map_err(|e| {
        error!("Failed to configure headless browser: {}", e);
        BrowserError::ConfigurationFailed(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("Failed to launch headless browser: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;
    debug!("Headless browser launched");

    // 后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态稳定
    sleep(Duration::from_millis(300)).await;

    info!("✅ Headless browser ready");
    Ok((browser, handler_task))
}
