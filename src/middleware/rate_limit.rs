use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    infrastructure::image::SentinelImage,
    routes::image::sentinel_response,
    utils::client_id,
};

/// 按客户端滑动窗口限流
///
/// 状态只保存在进程内存中，重启后清空。
pub struct RateLimiter {
    window: Duration,
    limit: usize,
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window,
            limit: limit as usize,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit(&self, client_id: &str) -> bool {
        self.admit_at(client_id, Instant::now())
    }

    /// 过滤窗口外的时间戳；未超限时记录本次请求
    pub fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let stamps = windows.entry(client_id.to_string()).or_default();
        stamps.retain(|t| now.saturating_duration_since(*t) < self.window);

        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push(now);
        true
    }
}

pub async fn rate_limit(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let client = client_id(&req, state.config.trust_proxy_headers);

    if !state.limiter.admit(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return sentinel_response(&state, SentinelImage::RateLimited).await;
    }

    next.run(req).await
}
