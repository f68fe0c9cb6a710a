use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{Request, Uri},
};
use url::form_urlencoded;

/// 从请求中推导客户端标识
///
/// 默认只使用连接的对端地址，转发头可由任意客户端伪造。
/// `trust_proxy_headers` 为真时依次尝试 `cf-connecting-ip`、`x-real-ip`、
/// `x-forwarded-for` 的第一个非空项，再降级为对端地址。
/// 都没有时返回空串，作为独立的限流桶。
pub fn client_id<B>(req: &Request<B>, trust_proxy_headers: bool) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    if !trust_proxy_headers {
        return remote_ip.unwrap_or_default();
    }

    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-real-ip"))
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        })
        .map(String::from)
        .or(remote_ip)
        .unwrap_or_default()
}

/// 在原请求地址上替换 `id` 参数，用于缓存成功后的重定向
pub fn location_with_id(uri: &Uri, id: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(raw) = uri.query() {
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key != "id" {
                query.append_pair(&key, &value);
            }
        }
    }
    query.append_pair("id", id);

    format!("{}?{}", uri.path(), query.finish())
}
