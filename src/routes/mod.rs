pub mod image;
pub mod pages;
