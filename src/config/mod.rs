use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_IMAGE_API_URL: &str = "https://api.siliconflow.cn/v1/image/generations";
const DEFAULT_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
const DEFAULT_PROCESS_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_PROCESS_MODEL: &str = "GLM-4-Flash";

/// 上游密钥选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    RoundRobin,
    Shuffle,
}

impl FromStr for KeyStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round_robin" | "round-robin" | "roundrobin" => Ok(KeyStrategy::RoundRobin),
            "shuffle" | "random" => Ok(KeyStrategy::Shuffle),
            other => Err(AppError::Config(format!("unknown KEY_STRATEGY: {}", other))),
        }
    }
}

/// 上游凭证池，进程生命周期内只读
#[derive(Clone, Default)]
pub struct KeyPool(Vec<String>);

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self(keys)
    }

    /// 解析逗号分隔的密钥列表，忽略空项
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

// 不打印密钥本身
impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPool({} keys)", self.0.len())
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub image_api_url: String,
    pub image_api_keys: KeyPool,
    pub image_model: String,
    pub process_api_url: String,
    pub process_api_key: Option<String>,
    pub process_model: String,
    pub default_size: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    /// 部署在可信反向代理之后时才读取转发头
    pub trust_proxy_headers: bool,
    pub key_strategy: KeyStrategy,
    pub generation_attempts: u32,
    pub retry_backoff_ms: u64,
    pub upstream_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub memory_cache: bool,
    pub cache_capacity: usize,
    pub error_image_url: Option<String>,
    pub rate_limit_image_url: Option<String>,
    pub no_keys_image_url: Option<String>,
    pub status_image_urls: HashMap<u16, String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("image_api_url", &self.image_api_url)
            .field("image_api_keys", &self.image_api_keys)
            .field("image_model", &self.image_model)
            .field("process_api_url", &self.process_api_url)
            .field("process_api_key", &self.process_api_key.as_ref().map(|_| "<redacted>"))
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("key_strategy", &self.key_strategy)
            .field("generation_attempts", &self.generation_attempts)
            .field("redis_url", &self.redis_url.is_some())
            .field("memory_cache", &self.memory_cache)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 8787,
            image_api_url: DEFAULT_IMAGE_API_URL.into(),
            image_api_keys: KeyPool::default(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
            process_api_url: DEFAULT_PROCESS_API_URL.into(),
            process_api_key: None,
            process_model: DEFAULT_PROCESS_MODEL.into(),
            default_size: "512x512".into(),
            rate_limit_window_ms: 120_000,
            rate_limit_requests: 5,
            trust_proxy_headers: false,
            key_strategy: KeyStrategy::Shuffle,
            generation_attempts: 3,
            retry_backoff_ms: 1_000,
            upstream_timeout_secs: 60,
            redis_url: None,
            memory_cache: false,
            cache_capacity: 1_000,
            error_image_url: None,
            rate_limit_image_url: None,
            no_keys_image_url: None,
            status_image_urls: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();

        // IMAGE_API_KEYS 优先，IMAGE_API_KEY 作为单密钥别名
        let image_api_keys = optional("IMAGE_API_KEYS")
            .or_else(|| optional("IMAGE_API_KEY"))
            .map(|raw| KeyPool::parse(&raw))
            .unwrap_or_default();

        let status_image_urls = match optional("STATUS_IMAGE_URLS") {
            Some(raw) => parse_status_urls(&raw)?,
            None => HashMap::new(),
        };

        Ok(Config {
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed("SERVER_PORT", defaults.server_port)?,
            image_api_url: optional("IMAGE_API_URL").unwrap_or(defaults.image_api_url),
            image_api_keys,
            image_model: optional("IMAGE_MODEL").unwrap_or(defaults.image_model),
            process_api_url: optional("PROCESS_API_URL").unwrap_or(defaults.process_api_url),
            process_api_key: optional("PROCESS_API_KEY"),
            process_model: optional("PROCESS_MODEL").unwrap_or(defaults.process_model),
            default_size: optional("DEFAULT_SIZE").unwrap_or(defaults.default_size),
            rate_limit_window_ms: parsed("RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window_ms)?,
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            trust_proxy_headers: parsed("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers)?,
            key_strategy: parsed("KEY_STRATEGY", defaults.key_strategy)?,
            generation_attempts: parsed("GENERATION_ATTEMPTS", defaults.generation_attempts)?
                .max(1),
            retry_backoff_ms: parsed("RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            upstream_timeout_secs: parsed("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout_secs)?,
            redis_url: optional("REDIS_URL"),
            memory_cache: optional("IMAGE_CACHE").is_some_and(|v| v.eq_ignore_ascii_case("memory")),
            cache_capacity: parsed("CACHE_CAPACITY", defaults.cache_capacity)?.max(1),
            error_image_url: optional("ERROR_IMAGE_URL"),
            rate_limit_image_url: optional("RATE_LIMIT_IMAGE_URL"),
            no_keys_image_url: optional("NO_KEYS_IMAGE_URL"),
            status_image_urls,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// 未设置或为空字符串时返回 None
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {}", name, raw))),
        None => Ok(default),
    }
}

/// 解析 `401=https://a,429=https://b` 形式的状态码图片映射
pub fn parse_status_urls(raw: &str) -> Result<HashMap<u16, String>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(u16, String), AppError> {
            let (status, url) = pair
                .split_once('=')
                .ok_or_else(|| AppError::Config(format!("invalid STATUS_IMAGE_URLS entry: {}", pair)))?;
            let status = status
                .trim()
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("invalid status code: {}", status)))?;
            Ok((status, url.trim().to_string()))
        })
        .collect()
}
