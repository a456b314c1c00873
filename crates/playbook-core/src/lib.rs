pub mod analyze;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod git;
pub mod render;
pub mod rules;
pub mod types;

pub use error::{PlaybookError, Result};
