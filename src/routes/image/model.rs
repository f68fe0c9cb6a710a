use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+x[0-9]+$").expect("size pattern is valid"));

/// 生图接口的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub prompt: Option<String>,
    pub size: Option<String>,
    pub optimization: Option<String>,
    pub id: Option<String>,
}

/// 校验后的请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub prompt: String,
    pub size: String,
    pub optimize: bool,
}

impl ImageQuery {
    pub fn prompt(&self) -> Option<&str> {
        non_empty(&self.prompt)
    }

    pub fn cache_id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    /// 校验参数；`size` 缺省时使用配置的默认尺寸
    pub fn into_params(self, default_size: &str) -> Result<RequestParams, AppError> {
        let prompt = self
            .prompt
            .filter(|p| !p.is_empty())
            .ok_or(AppError::MissingPrompt)?;

        let size = self
            .size
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_size.to_string());
        validate_size(&size)?;

        Ok(RequestParams {
            prompt,
            size,
            optimize: self.optimization.as_deref() == Some("1"),
        })
    }
}

/// 尺寸必须是 `宽x高`，均为数字
pub fn validate_size(size: &str) -> Result<(), AppError> {
    if SIZE_PATTERN.is_match(size) {
        Ok(())
    } else {
        Err(AppError::InvalidSize(size.to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
