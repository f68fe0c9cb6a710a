// 上游服务接入
// 生图接口、对话补全接口以及密钥轮换

pub mod http;
pub mod image;
pub mod keys;
pub mod prompt;

pub use image::{Generation, ImageGenerator, SentinelImage};
pub use keys::{KeySelector, RoundRobin, Shuffle};
pub use prompt::PromptProcessor;
