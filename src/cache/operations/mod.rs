/// 缓存操作
pub mod image;

pub use image::ImageCacheOperations;
