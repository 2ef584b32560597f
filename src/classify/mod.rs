pub mod ensemble;
pub mod types;

pub use ensemble::EnsembleClassifier;
pub use types::{ClassificationResult, Prediction};
