use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// 服务统一错误类型
///
/// 错误消息中不得包含上游凭证，只允许出现密钥序号和状态码。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing prompt parameter")]
    MissingPrompt,

    #[error("Invalid size parameter. Use format: widthxheight")]
    InvalidSize(String),

    #[error("Too many requests, please retry later")]
    RateLimited,

    #[error("No upstream API keys available")]
    NoKeysAvailable,

    /// 生图接口返回非成功状态或响应格式不符
    #[error("Image API error: {message}")]
    UpstreamGeneration { status: Option<u16>, message: String },

    #[error("Translation/Optimization API error: {0}")]
    PromptProcessing(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingPrompt | AppError::InvalidSize(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NoKeysAvailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamGeneration { .. } | AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::PromptProcessing(_) | AppError::CacheUnavailable(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::CacheUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::CacheUnavailable(format!("serialization error: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
