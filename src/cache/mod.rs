// 结果缓存模块
// id → 图片 URL 的有界 FIFO 缓存，存储后端可选

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

pub use models::CachedImage;
pub use operations::ImageCacheOperations;
pub use store::{CacheStore, MemoryStore, RedisStore};
