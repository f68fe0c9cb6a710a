//! 缓存键
//! 所有缓存图片保存在同一个键下的 JSON 数组中

/// 图片列表缓存键
pub const IMAGE_LIST_KEY: &str = "image:list";
