use crate::classify::Prediction;
use crate::image::ImageTransforms;
use crate::models::{load_session, primary_io_names, LabelModel};
use crate::utils::error::WasteError;
use crate::utils::math::{argmax, softmax};
use crate::{Config, Result};
use ndarray::{Array3, Axis};
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Shorter side is resized to this before the center crop.
const RESIZE_EDGE: usize = 256;

/// Closed-vocabulary image classifier. The label set is baked into the
/// pretrained model; the vocabulary file maps class indices to the model's
/// human-readable names.
pub struct LabelClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    input_size: (usize, usize, usize), // (C, H, W)
    labels: Vec<String>,
}

impl LabelClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.label_model_path();
        let vocab_path = config.label_vocab_path();

        if !vocab_path.exists() {
            return Err(WasteError::ModelLoad(format!(
                "Label vocabulary not found: {}",
                vocab_path.display()
            )));
        }

        let session = load_session(&model_path, &config.onnx)?;
        let (input_name, output_name) = primary_io_names(&session, "Label")?;

        // One label per line, index order matching the model's class axis
        let vocab_content = fs::read_to_string(&vocab_path)
            .map_err(|e| WasteError::ModelLoad(format!("Failed to read label vocabulary: {}", e)))?;

        let labels: Vec<String> = vocab_content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if labels.is_empty() {
            return Err(WasteError::ModelLoad(
                "Label vocabulary is empty".to_string(),
            ));
        }

        tracing::info!("Loaded label vocabulary with {} entries", labels.len());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            input_size: (3, 224, 224),
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Best label and its softmax probability for one RGB image.
    pub fn predict(&self, image: &Array3<f32>) -> Result<Prediction> {
        let processed = self.preprocess(image)?;

        // Add batch dimension
        let input_tensor = processed.insert_axis(Axis(0));

        let input_tensor = Tensor::from_array(input_tensor)?;
        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(WasteError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        self.decode_logits(&predictions.view())
    }

    /// Fixed preprocessing: shortest edge to 256, center crop 224, ImageNet
    /// normalization, CHW layout.
    fn preprocess(&self, image: &Array3<f32>) -> Result<Array3<f32>> {
        let (target_c, target_h, target_w) = self.input_size;

        if image.shape()[2] != target_c {
            return Err(WasteError::InvalidInput(format!(
                "Expected {} channels, got {}",
                target_c,
                image.shape()[2]
            )));
        }

        let resized = ImageTransforms::resize_shortest_edge(image, RESIZE_EDGE)?;
        let cropped = ImageTransforms::center_crop(&resized, target_h, target_w)?;

        ImageTransforms::to_chw_normalized(&cropped, &IMAGENET_MEAN, &IMAGENET_STD)
    }

    /// Softmax over the logits, argmax, map the class index to its name.
    fn decode_logits(&self, logits: &ndarray::ArrayViewD<f32>) -> Result<Prediction> {
        let shape = logits.shape();
        if shape.len() != 2 {
            return Err(WasteError::Inference(format!(
                "Expected 2D logits tensor, got {}D",
                shape.len()
            )));
        }

        let (batch_size, num_classes) = (shape[0], shape[1]);
        if batch_size != 1 {
            return Err(WasteError::Inference(format!(
                "Expected batch size 1, got {}",
                batch_size
            )));
        }

        if num_classes != self.labels.len() {
            tracing::warn!(
                "Model class count ({}) != vocabulary size ({})",
                num_classes,
                self.labels.len()
            );
        }

        let scores: Vec<f32> = (0..num_classes).map(|i| logits[[0, i]]).collect();
        let probs = softmax(&scores);

        let best = argmax(&probs)
            .ok_or_else(|| WasteError::Inference("Model produced no class scores".to_string()))?;

        let category = self.labels.get(best).ok_or_else(|| {
            WasteError::Inference(format!(
                "Class index {} out of vocabulary bounds ({})",
                best,
                self.labels.len()
            ))
        })?;

        tracing::debug!(
            "Label prediction: class={} '{}' prob={:.4}",
            best,
            category,
            probs[best]
        );

        Ok(Prediction::new(category.clone(), probs[best] * 100.0))
    }
}

impl LabelModel for LabelClassifier {
    fn predict(&self, image: &Array3<f32>) -> Result<Prediction> {
        LabelClassifier::predict(self, image)
    }
}
