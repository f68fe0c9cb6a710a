use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use cache::{ImageCacheOperations, MemoryStore, RedisStore};
use config::Config;
use error::AppError;
use infrastructure::{ImageGenerator, PromptProcessor, http::build_client, keys::selector_for};
use middleware::{RateLimiter, log_errors, rate_limit};

pub mod cache;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub limiter: Arc<RateLimiter>,
    pub prompts: PromptProcessor,
    pub generator: ImageGenerator,
    pub cache: ImageCacheOperations,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let http = build_client(&config)?;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window(),
            config.rate_limit_requests,
        ));
        let prompts = PromptProcessor::new(http.clone(), &config);
        let generator = ImageGenerator::new(http.clone(), &config, selector_for(config.key_strategy));
        let cache = image_cache(&config);

        Ok(Self {
            config: Arc::new(config),
            http,
            limiter,
            prompts,
            generator,
            cache,
        })
    }
}

// Redis 优先；打不开时关闭缓存而不是启动失败
fn image_cache(config: &Config) -> ImageCacheOperations {
    if let Some(redis_url) = &config.redis_url {
        match RedisStore::open(redis_url) {
            Ok(store) => return ImageCacheOperations::new(Arc::new(store), config.cache_capacity),
            Err(e) => tracing::warn!(error = %e, "invalid redis url, image cache disabled"),
        }
    } else if config.memory_cache {
        return ImageCacheOperations::new(Arc::new(MemoryStore::new()), config.cache_capacity);
    }

    ImageCacheOperations::disabled()
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::image::index))
        .route("/gui", get(routes::image::gui))
        .route("/gui/", get(routes::image::gui))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
