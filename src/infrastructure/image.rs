use std::sync::Arc;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{Config, KeyPool, KeyStrategy};
use crate::error::AppError;
use crate::infrastructure::keys::KeySelector;

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    image_size: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// 预先约定的错误图片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelImage {
    RateLimited,
    /// 没有可用密钥，或全部密钥都失败
    NoKeys,
    /// 按上游状态码区分的错误图片
    Upstream(u16),
    Default,
}

impl SentinelImage {
    /// 解析错误图片地址，未配置专用地址时退回默认错误图片
    pub fn url<'a>(&self, config: &'a Config) -> Option<&'a str> {
        let specific = match self {
            SentinelImage::RateLimited => config.rate_limit_image_url.as_deref(),
            SentinelImage::NoKeys => config.no_keys_image_url.as_deref(),
            SentinelImage::Upstream(status) => config.status_image_urls.get(status).map(String::as_str),
            SentinelImage::Default => None,
        };
        specific.or(config.error_image_url.as_deref())
    }

    /// 错误图片不可用时，纯文本回退所使用的状态码
    pub fn fallback_status(&self) -> StatusCode {
        match self {
            SentinelImage::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SentinelImage::NoKeys => StatusCode::SERVICE_UNAVAILABLE,
            SentinelImage::Upstream(_) | SentinelImage::Default => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SentinelImage::RateLimited => "Too many requests, please retry later",
            SentinelImage::NoKeys => "No upstream API keys available",
            SentinelImage::Upstream(_) => "Image generation failed upstream",
            SentinelImage::Default => "Image generation failed",
        }
    }
}

/// 单次生图的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Url(String),
    Failed(SentinelImage),
}

#[derive(Clone)]
pub struct ImageGenerator {
    client: reqwest::Client,
    api_url: String,
    model: String,
    keys: KeyPool,
    selector: Arc<dyn KeySelector>,
}

impl ImageGenerator {
    pub fn new(client: reqwest::Client, config: &Config, selector: Arc<dyn KeySelector>) -> Self {
        Self {
            client,
            api_url: config.image_api_url.clone(),
            model: config.image_model.clone(),
            keys: config.image_api_keys.clone(),
            selector,
        }
    }

    /// 按密钥选择策略依次尝试，返回第一个成功的图片地址
    ///
    /// 不返回错误：全部失败时给出对应的错误图片。
    pub async fn generate(&self, prompt: &str, size: &str) -> Generation {
        let order = match self.selector.attempt_order(self.keys.len()) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(error = %e, "image generation skipped");
                return Generation::Failed(SentinelImage::NoKeys);
            }
        };

        let mut last_status = None;
        for index in order {
            let Some(key) = self.keys.get(index) else {
                continue;
            };

            match self.request(key, prompt, size).await {
                Ok(url) => {
                    tracing::debug!(key_index = index, "image generated");
                    return Generation::Url(url);
                }
                Err(e) => {
                    if let AppError::UpstreamGeneration { status, .. } = &e {
                        last_status = *status;
                    }
                    tracing::warn!(key_index = index, status = ?last_status, error = %e, "image key attempt failed");
                }
            }
        }

        Generation::Failed(match self.selector.strategy() {
            KeyStrategy::Shuffle => SentinelImage::NoKeys,
            KeyStrategy::RoundRobin => last_status
                .map(SentinelImage::Upstream)
                .unwrap_or(SentinelImage::Default),
        })
    }

    async fn request(&self, key: &str, prompt: &str, size: &str) -> Result<String, AppError> {
        let body = GenerationRequest {
            model: &self.model,
            prompt,
            image_size: size,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamGeneration {
                status: None,
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamGeneration {
                status: Some(status.as_u16()),
                message: format!("status {}", status.as_u16()),
            });
        }

        let data: GenerationResponse = response.json().await.map_err(|_| AppError::UpstreamGeneration {
            status: Some(status.as_u16()),
            message: "unexpected response format".into(),
        })?;

        data.images
            .into_iter()
            .next()
            .and_then(|img| img.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::UpstreamGeneration {
                status: Some(status.as_u16()),
                message: "unexpected response format".into(),
            })
    }
}
