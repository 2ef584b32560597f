pub mod label;
pub mod open_vocab;

pub use label::LabelClassifier;
pub use open_vocab::OpenVocabClassifier;

use crate::classify::Prediction;
use crate::config::OnnxConfig;
use crate::utils::error::WasteError;
use crate::Result;
use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;

/// Closed-vocabulary backend: best label from a fixed vocabulary.
///
/// The ensemble is generic over this seam so tests can substitute stub
/// backends for the ONNX sessions.
pub trait LabelModel {
    fn predict(&self, image: &Array3<f32>) -> Result<Prediction>;
}

/// Open-vocabulary backend: ranks caller-supplied category descriptions
/// against the image and returns the best match.
pub trait OpenVocabModel {
    fn predict(&self, image: &Array3<f32>, categories: &[String]) -> Result<Prediction>;
}

/// Build an ONNX session with the shared runtime settings.
pub(crate) fn load_session(model_path: &Path, onnx: &OnnxConfig) -> Result<Session> {
    if !model_path.exists() {
        return Err(WasteError::ModelLoad(format!(
            "Model not found: {}",
            model_path.display()
        )));
    }

    tracing::info!("Loading model from: {}", model_path.display());

    let level = match onnx.optimization_level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    };

    let session = Session::builder()?
        .with_optimization_level(level)?
        .with_intra_threads(onnx.intra_threads)?
        .commit_from_file(model_path)?;

    Ok(session)
}

/// Discover the primary input and output tensor names from session metadata.
/// Export pipelines disagree on naming, so nothing is hardcoded.
pub(crate) fn primary_io_names(session: &Session, what: &str) -> Result<(String, String)> {
    let input_name = session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .ok_or_else(|| WasteError::ModelLoad(format!("{} model has no inputs", what)))?;

    let output_name = session
        .outputs
        .first()
        .map(|output| output.name.clone())
        .ok_or_else(|| WasteError::ModelLoad(format!("{} model has no outputs", what)))?;

    tracing::info!("{} model io: '{}' -> '{}'", what, input_name, output_name);

    // Log all available outputs for debugging
    for (i, output) in session.outputs.iter().enumerate() {
        tracing::debug!("{} output[{}]: '{}'", what, i, output.name);
    }

    Ok((input_name, output_name))
}
