/// 缓存数据模型
pub mod image;

pub use image::CachedImage;
