//! 测试用的假上游：生图接口、对话补全接口和图片下载
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{self, post},
};
use imagegen_proxy::config::{Config, KeyPool};
use serde_json::{Value, json};

pub const IMAGE_BYTES: &[u8] = b"\x89PNG-generated";

#[derive(Default)]
pub struct Upstream {
    base: String,
    pub image_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    /// 非零时对话补全接口返回该状态码
    pub chat_status: AtomicU16,
    /// 密钥 → 生图接口返回的错误状态码
    pub failing_keys: Mutex<HashMap<String, u16>>,
    /// 这些密钥得到 200 但响应里没有图片地址
    pub empty_keys: Mutex<HashSet<String>>,
    /// 为真时对话补全接口返回 200 但没有消息内容
    pub chat_empty: AtomicBool,
    pub seen_prompts: Mutex<Vec<String>>,
    pub seen_keys: Mutex<Vec<String>>,
    pub seen_sizes: Mutex<Vec<String>>,
}

impl Upstream {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn fail_key(&self, key: &str, status: u16) {
        self.failing_keys.lock().unwrap().insert(key.to_string(), status);
    }

    pub fn empty_key(&self, key: &str) {
        self.empty_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.image_calls() + self.chat_calls() + self.fetch_calls()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.seen_prompts.lock().unwrap().last().cloned()
    }
}

pub async fn spawn_upstream() -> Arc<Upstream> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let upstream = Arc::new(Upstream {
        base: format!("http://{}", addr),
        ..Upstream::default()
    });

    let router = Router::new()
        .route("/v1/image/generations", post(generations))
        .route("/v1/chat/completions", post(chat))
        .route("/img/{name}", routing::get(image))
        .route("/errors/{name}", routing::get(error_image))
        .with_state(upstream.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    upstream
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

async fn generations(
    State(up): State<Arc<Upstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    up.image_calls.fetch_add(1, Ordering::SeqCst);
    let key = bearer(&headers);
    up.seen_keys.lock().unwrap().push(key.clone());

    if let Some(status) = up.failing_keys.lock().unwrap().get(&key).copied() {
        return (StatusCode::from_u16(status).unwrap(), "upstream failure").into_response();
    }

    if up.empty_keys.lock().unwrap().contains(&key) {
        return Json(json!({ "images": [] })).into_response();
    }

    assert!(body["model"].is_string());
    up.seen_prompts
        .lock()
        .unwrap()
        .push(body["prompt"].as_str().unwrap_or_default().to_string());
    up.seen_sizes
        .lock()
        .unwrap()
        .push(body["image_size"].as_str().unwrap_or_default().to_string());

    Json(json!({ "images": [{ "url": up.url("/img/generated.png") }] })).into_response()
}

async fn chat(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    up.chat_calls.fetch_add(1, Ordering::SeqCst);

    let status = up.chat_status.load(Ordering::SeqCst);
    if status != 0 {
        return (StatusCode::from_u16(status).unwrap(), "chat failure").into_response();
    }

    assert_eq!(body["messages"][0]["role"], "user");
    if up.chat_empty.load(Ordering::SeqCst) {
        return Json(json!({ "choices": [{ "message": {} }] })).into_response();
    }

    Json(json!({ "choices": [{ "message": { "content": "  a cat  " } }] })).into_response()
}

async fn image(State(up): State<Arc<Upstream>>, Path(name): Path<String>) -> Response {
    up.fetch_calls.fetch_add(1, Ordering::SeqCst);
    if name == "missing.png" {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], IMAGE_BYTES).into_response()
}

async fn error_image(Path(name): Path<String>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], format!("error:{}", name)).into_response()
}

/// 指向假上游的配置，重试不等待
pub fn test_config(up: &Upstream) -> Config {
    Config {
        image_api_url: up.url("/v1/image/generations"),
        image_api_keys: KeyPool::parse("sk-good"),
        process_api_url: up.url("/v1/chat/completions"),
        process_api_key: Some("sk-chat".into()),
        retry_backoff_ms: 0,
        error_image_url: Some(up.url("/errors/default.png")),
        rate_limit_image_url: Some(up.url("/errors/rate-limit.png")),
        no_keys_image_url: Some(up.url("/errors/no-keys.png")),
        ..Config::default()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// 模拟来自某个对端地址的连接
pub fn get_from(uri: &str, ip: &str) -> Request<Body> {
    let mut req = get(uri);
    let peer: SocketAddr = format!("{}:40000", ip).parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));
    req
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
