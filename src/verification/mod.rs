pub mod engine;
pub mod scoring;

pub use engine::ValidationEngine;
