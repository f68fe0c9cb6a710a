use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;

/// 共享 HTTP 客户端，所有上游调用都有超时
pub fn build_client(config: &Config) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| AppError::Config(format!("failed to build http client: {}", e)))
}

/// 拉取图片，非成功状态视为失败
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Fetch(e.without_url().to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::Fetch(format!("status {}", response.status().as_u16())));
    }

    Ok(response)
}
