use anyhow::{Context, Result};
use quiz_solver::utils::logging;
use quiz_solver::{app, ChainController, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 凭证在这里校验，缺失时服务不会启动
    let config = Config::load().context("missing or invalid configuration")?;

    // 日志（可选同时写入 OUTPUT_LOG_FILE）
    logging::init(config.output_log_file.as_deref())?;
    logging::log_startup(&config);

    match std::env::args().nth(1) {
        // 前台跑一条链后退出
        Some(initial_url) => {
            let report = ChainController::from_config(&config)?.run(&initial_url).await;
            info!("Result: {} after {} attempts", report.status, report.attempts);
        }
        None => app::serve(config).await?,
    }

    Ok(())
}
