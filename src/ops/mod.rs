pub mod fill;
pub mod paint;
