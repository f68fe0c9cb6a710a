use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    AppState,
    infrastructure::{
        http::fetch_image,
        image::{Generation, SentinelImage},
    },
    utils::location_with_id,
};

use super::model::RequestParams;

/// 生成流程：预处理提示词，带重试地生图，缓存后重定向或直接返回图片
pub async fn generate(state: &AppState, uri: &Uri, params: RequestParams) -> Response {
    let span = tracing::info_span!(
        "generate",
        request_id = %Uuid::new_v4(),
        size = %params.size,
        optimize = params.optimize
    );
    run(state, uri, params).instrument(span).await
}

async fn run(state: &AppState, uri: &Uri, params: RequestParams) -> Response {
    // 预处理失败时使用原始提示词
    let prompt = match state.prompts.process(&params.prompt, params.optimize).await {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::warn!(error = %e, "prompt processing failed, using original prompt");
            params.prompt.clone()
        }
    };

    let attempts = state.config.generation_attempts.max(1);
    let mut sentinel = SentinelImage::Default;

    for attempt in 1..=attempts {
        match state.generator.generate(&prompt, &params.size).await {
            Generation::Url(url) => {
                tracing::info!(attempt, "image generated");
                return respond_with_image(state, uri, &url).await;
            }
            Generation::Failed(failed) => {
                tracing::warn!(attempt, attempts, sentinel = ?failed, "generation attempt failed");
                sentinel = failed;
                if attempt < attempts {
                    tokio::time::sleep(state.config.retry_backoff()).await;
                }
            }
        }
    }

    tracing::error!(attempts, "all generation attempts failed");
    sentinel_response(state, sentinel).await
}

async fn respond_with_image(state: &AppState, uri: &Uri, url: &str) -> Response {
    match state.cache.store(url).await {
        Some(id) => (StatusCode::FOUND, [(header::LOCATION, location_with_id(uri, &id))]).into_response(),
        None => serve_image(state, url).await,
    }
}

/// 拉取图片并以流的形式返回，失败时返回默认错误图片
pub async fn serve_image(state: &AppState, url: &str) -> Response {
    match fetch_image(&state.http, url).await {
        Ok(upstream) => stream_response(upstream),
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch generated image");
            sentinel_response(state, SentinelImage::Default).await
        }
    }
}

/// 返回错误图片；图片未配置或拉取失败时退回纯文本
pub async fn sentinel_response(state: &AppState, sentinel: SentinelImage) -> Response {
    if let Some(url) = sentinel.url(&state.config) {
        match fetch_image(&state.http, url).await {
            Ok(upstream) => return stream_response(upstream),
            Err(e) => tracing::error!(error = %e, sentinel = ?sentinel, "failed to fetch error image"),
        }
    }

    (sentinel.fallback_status(), sentinel.message()).into_response()
}

fn stream_response(upstream: reqwest::Response) -> Response {
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}
