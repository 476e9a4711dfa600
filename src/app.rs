//! Webhook 应用
//!
//! 共享状态、路由表和服务循环。每个被接受的请求启动一次独立的链运行，
//! 各次运行之间没有共享的可变状态

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::config::Config;
use crate::handlers::{handle_quiz, health_check, json_config};
use crate::orchestrator::ChainController;

/// 启动一次链运行，不等待其结束
pub trait ChainDispatcher: Send + Sync {
    fn dispatch(&self, initial_url: String);
}

/// 在主运行时上为每条链 spawn 任务，各自持有控制器和浏览器
pub struct SpawnDispatcher {
    config: Arc<Config>,
    runtime: Handle,
}

impl SpawnDispatcher {
    pub fn new(config: Arc<Config>, runtime: Handle) -> Self {
        Self { config, runtime }
    }
}

impl ChainDispatcher for SpawnDispatcher {
    fn dispatch(&self, initial_url: String) {
        let config = self.config.clone();
        self.runtime.spawn(async move {
            info!("Starting quiz solver for URL: {}", initial_url);
            match ChainController::from_config(&config) {
                Ok(controller) => {
                    let report = controller.run(&initial_url).await;
                    info!(
                        "Quiz solving finished for URL: {} ({})",
                        initial_url, report.status
                    );
                }
                Err(e) => error!("❌ Error starting quiz solver: {:#}", e),
            }
        });
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<dyn ChainDispatcher>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<dyn ChainDispatcher>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

/// 注册 webhook 路由
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(handle_quiz)
        .service(health_check);
}

/// 运行 webhook 服务直到进程退出
pub async fn serve(config: Config) -> std::io::Result<()> {
    let bind_addr = (config.host.clone(), config.port);
    let shared = Arc::new(config.clone());
    let dispatcher = Arc::new(SpawnDispatcher::new(shared, Handle::current()));
    let state = AppState::new(config, dispatcher);

    info!("🌐 Starting server on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
