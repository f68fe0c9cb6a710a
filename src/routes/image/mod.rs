mod flow;
mod handler;
mod model;

pub use flow::{sentinel_response, serve_image};
pub use handler::{gui, index};
pub use model::{ImageQuery, RequestParams, validate_size};
