use actix_web::{get, post, web, HttpRequest, HttpResponse};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::AppError;

/// 通知新题目链的 webhook 请求体
#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct QuizAccepted {
    pub status: &'static str,
    pub message: &'static str,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub email_configured: bool,
    pub secret_configured: bool,
    pub openai_configured: bool,
}

/// JSON 提取器配置：无法解析的请求体返回 400 和 JSON 错误体
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        warn!("Rejected webhook payload: {}", err);
        AppError::BadRequest(err.to_string()).into()
    })
}

/// 接收题目链并在后台开始解答
///
/// 先校验邮箱再校验 secret，链本身的结果不会回报给调用方
#[post("/")]
pub async fn handle_quiz(
    state: web::Data<AppState>,
    request: web::Json<QuizRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();

    if request.email != state.config.email {
        warn!("Invalid email: {}", request.email);
        return Err(AppError::Forbidden("Invalid email".to_string()));
    }
    if request.secret != state.config.secret.expose_secret() {
        warn!("Invalid secret for email: {}", request.email);
        return Err(AppError::Forbidden("Invalid secret".to_string()));
    }
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }

    info!("📥 Received valid quiz request for URL: {}", request.url);
    state.dispatcher.dispatch(request.url.clone());

    Ok(HttpResponse::Ok().json(QuizAccepted {
        status: "accepted",
        message: "Quiz solving initiated",
        url: request.url,
    }))
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus {
        status: "healthy",
        email_configured: state.config.email_configured(),
        secret_configured: state.config.secret_configured(),
        openai_configured: state.config.openai_configured(),
    })
}
