pub mod classify;
pub mod config;
pub mod image;
pub mod models;
pub mod utils;

// Re-export main types
pub use classify::{ClassificationResult, EnsembleClassifier, Prediction};
pub use config::Config;
pub use utils::error::WasteError;

pub type Result<T> = std::result::Result<T, WasteError>;
