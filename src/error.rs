use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Webhook 对外返回的错误类型
///
/// 适配器内部错误走 `anyhow`，只在 HTTP 边界转换成这里的变体
#[derive(Debug, Error)]
pub enum AppError {
    /// 调用方身份校验失败
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// 请求体无法解析
    #[error("invalid request: {0}")]
    BadRequest(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to configure headless browser: {0}")]
    ConfigurationFailed(String),
    #[error("failed to launch headless browser: {0}")]
    LaunchFailed(String),
    #[error("failed to create page: {0}")]
    PageCreationFailed(String),
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },
    #[error("navigation to {url} timed out after {secs}s")]
    NavigationTimedOut { url: String, secs: u64 },
    #[error("script execution failed: {0}")]
    ScriptExecutionFailed(String),
}

/// 出站 HTTP 错误（下载、提交）
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },
    #[error("{endpoint} answered with status {status}")]
    BadStatus { endpoint: String, status: u16 },
    #[error("failed to decode response from {endpoint}: {reason}")]
    JsonParseFailed { endpoint: String, reason: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API call failed (model: {model}): {reason}")]
    ApiCallFailed { model: String, reason: String },
    #[error("LLM returned no content (model: {model})")]
    EmptyContent { model: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失或为空
    #[error("required setting {var_name} is not set")]
    Missing { var_name: String },
    /// 配置项存在但无法解析
    #[error("setting {var_name}: value '{value}' is not a valid {expected_type}")]
    InvalidValue {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件存在但无法读取
    #[error("failed to read config file {path}: {reason}")]
    FileUnreadable { path: String, reason: String },
}

/// 单个题目步骤没有产出结果的原因
///
/// 链控制器对所有变体的处理相同（停止），变体只用于日志和报告区分失败阶段
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("no submit url extracted from the quiz page")]
    NoSubmitUrl,
    #[error("solve failed: {0}")]
    Solve(String),
    #[error("submission failed: {0}")]
    Submission(String),
}

impl StepError {
    /// 把适配器错误（连同 context 链）展平成步骤失败信息
    pub fn describe(err: &anyhow::Error) -> String {
        format!("{:#}", err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.status_code().as_u16(),
        })
    }
}

/// Webhook 结果类型
pub type AppResult<T> = Result<T, AppError>;
