use serde::{Deserialize, Serialize};

/// 已生成图片的缓存条目，创建后不再修改
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub created_at: i64, // Unix timestamp
}
