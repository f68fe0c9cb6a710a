use axum::{
    extract::{OriginalUri, Query, State},
    response::{Html, IntoResponse, Response},
};

use crate::{AppState, error::AppError, routes::pages};

use super::{
    flow::{generate, serve_image},
    model::ImageQuery,
};

#[axum::debug_handler]
pub async fn index(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ImageQuery>,
) -> Response {
    let has_id = query.cache_id().is_some();

    // 命中缓存时跳过预处理和生图
    if let Some(id) = query.cache_id() {
        match state.cache.lookup(id).await {
            Some(url) => {
                tracing::info!(id = %id, "serving cached image");
                return serve_image(&state, &url).await;
            }
            None => tracing::debug!(id = %id, "cache miss, regenerating"),
        }
    }

    if query.prompt().is_none() {
        if has_id {
            return AppError::MissingPrompt.into_response();
        }
        return Html(pages::USAGE_HTML).into_response();
    }

    match query.into_params(&state.config.default_size) {
        Ok(params) => generate(&state, &uri, params).await,
        Err(e) => {
            tracing::info!(error = %e, "rejected invalid request");
            e.into_response()
        }
    }
}

pub async fn gui() -> Html<&'static str> {
    Html(pages::GUI_HTML)
}
