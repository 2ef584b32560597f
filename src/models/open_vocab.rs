use crate::classify::Prediction;
use crate::image::ImageTransforms;
use crate::models::{load_session, primary_io_names, OpenVocabModel};
use crate::utils::error::WasteError;
use crate::utils::math::{argmax, l2_normalize, softmax};
use crate::{Config, Result};
use ndarray::{Array2, Array3, Axis};
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::sync::Arc;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Token budget of the text encoder.
const CONTEXT_LENGTH: usize = 77;

/// Derive the short category label from a full description: everything
/// before the first literal `" like "` clause, or the whole description when
/// there is none.
pub fn category_from_description(description: &str) -> &str {
    match description.split_once(" like ") {
        Some((head, _)) => head,
        None => description,
    }
}

/// Open-vocabulary classifier built on a joint image/text embedding model
/// (CLIP-style dual encoder). Ranks caller-supplied natural-language
/// category descriptions against the image.
pub struct OpenVocabClassifier {
    image_session: Arc<Mutex<Session>>,
    text_session: Arc<Mutex<Session>>,
    tokenizer: Tokenizer,
    image_input: String,
    image_output: String,
    text_input: String,
    text_output: String,
    text_wants_mask: bool,
    input_size: (usize, usize, usize), // (C, H, W)
    logit_scale: f32,
}

impl OpenVocabClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let image_session = load_session(&config.clip_image_model_path(), &config.onnx)?;
        let text_session = load_session(&config.clip_text_model_path(), &config.onnx)?;

        let (image_input, image_output) = primary_io_names(&image_session, "Image encoder")?;
        let (first_text_input, text_output) = primary_io_names(&text_session, "Text encoder")?;

        // Some exports take (input_ids, attention_mask), some only input_ids
        let text_input = text_session
            .inputs
            .iter()
            .find(|input| input.name == "input_ids")
            .map(|input| input.name.clone())
            .unwrap_or(first_text_input);
        let text_wants_mask = text_session
            .inputs
            .iter()
            .any(|input| input.name == "attention_mask");

        let tokenizer_path = config.clip_tokenizer_path();
        if !tokenizer_path.exists() {
            return Err(WasteError::ModelLoad(format!(
                "Tokenizer not found: {}",
                tokenizer_path.display()
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| WasteError::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;

        // Fixed-length batches so every description shares one forward pass
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: CONTEXT_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| WasteError::ModelLoad(format!("Invalid truncation params: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(CONTEXT_LENGTH),
            ..Default::default()
        }));

        tracing::info!(
            "Open-vocabulary classifier ready (attention_mask: {})",
            text_wants_mask
        );

        Ok(Self {
            image_session: Arc::new(Mutex::new(image_session)),
            text_session: Arc::new(Mutex::new(text_session)),
            tokenizer,
            image_input,
            image_output,
            text_input,
            text_output,
            text_wants_mask,
            input_size: (3, 224, 224),
            logit_scale: config.clip_logit_scale,
        })
    }

    /// Rank the category descriptions against the image and return the best
    /// match with its softmax probability.
    pub fn predict(&self, image: &Array3<f32>, categories: &[String]) -> Result<Prediction> {
        if categories.is_empty() {
            return Err(WasteError::InvalidInput(
                "category list must not be empty".to_string(),
            ));
        }

        let image_embedding = self.embed_image(image)?;
        let text_embeddings = self.embed_texts(categories)?;

        let mut scores = Vec::with_capacity(text_embeddings.len());
        for text_embedding in &text_embeddings {
            if text_embedding.len() != image_embedding.len() {
                return Err(WasteError::Inference(format!(
                    "Embedding dimensions differ: image={}, text={}",
                    image_embedding.len(),
                    text_embedding.len()
                )));
            }

            let cosine: f32 = image_embedding
                .iter()
                .zip(text_embedding.iter())
                .map(|(a, b)| a * b)
                .sum();
            scores.push(self.logit_scale * cosine);
        }

        let probs = softmax(&scores);
        let best = argmax(&probs)
            .ok_or_else(|| WasteError::Inference("No category scores produced".to_string()))?;

        let category = category_from_description(&categories[best]);

        tracing::debug!(
            "Open-vocab prediction: index={} '{}' prob={:.4}",
            best,
            category,
            probs[best]
        );

        Ok(Prediction::new(category, probs[best] * 100.0))
    }

    /// Embed one RGB image: CLIP preprocessing, image encoder forward pass,
    /// L2-normalized embedding.
    fn embed_image(&self, image: &Array3<f32>) -> Result<Vec<f32>> {
        let processed = self.preprocess(image)?;
        let input_tensor = processed.insert_axis(Axis(0));

        let input_tensor = Tensor::from_array(input_tensor)?;
        let embeddings = {
            let mut session = self.image_session.lock();
            let outputs = session.run(inputs![self.image_input.as_str() => input_tensor])?;

            match outputs.get(&self.image_output) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(WasteError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.image_output, available
                    )));
                }
            }
        };

        let shape = embeddings.shape();
        if shape.len() != 2 || shape[0] != 1 {
            return Err(WasteError::Inference(format!(
                "Expected [1, dim] image embedding, got {:?}",
                shape
            )));
        }

        let mut embedding: Vec<f32> = embeddings.iter().copied().collect();
        l2_normalize(&mut embedding);

        Ok(embedding)
    }

    /// Embed every category description in one batched forward pass,
    /// L2-normalizing each row.
    fn embed_texts(&self, categories: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(categories.to_vec(), true)
            .map_err(|e| WasteError::Tokenizer(e.to_string()))?;

        let batch = categories.len();
        let mut input_ids = Array2::<i64>::zeros((batch, CONTEXT_LENGTH));
        let mut attention_mask = Array2::<i64>::zeros((batch, CONTEXT_LENGTH));

        for (row, encoding) in encodings.iter().enumerate() {
            for (col, &id) in encoding.get_ids().iter().take(CONTEXT_LENGTH).enumerate() {
                input_ids[[row, col]] = id as i64;
            }
            for (col, &mask) in encoding
                .get_attention_mask()
                .iter()
                .take(CONTEXT_LENGTH)
                .enumerate()
            {
                attention_mask[[row, col]] = mask as i64;
            }
        }

        let ids_tensor = Tensor::from_array(input_ids)?;
        let embeddings = {
            let mut session = self.text_session.lock();
            let outputs = if self.text_wants_mask {
                let mask_tensor = Tensor::from_array(attention_mask)?;
                session.run(inputs![
                    self.text_input.as_str() => ids_tensor,
                    "attention_mask" => mask_tensor
                ])?
            } else {
                session.run(inputs![self.text_input.as_str() => ids_tensor])?
            };

            match outputs.get(&self.text_output) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(WasteError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.text_output, available
                    )));
                }
            }
        };

        let shape = embeddings.shape();
        if shape.len() != 2 || shape[0] != batch {
            return Err(WasteError::Inference(format!(
                "Expected [{}, dim] text embeddings, got {:?}",
                batch, shape
            )));
        }

        let dim = shape[1];
        let mut result = Vec::with_capacity(batch);
        for row in 0..batch {
            let mut embedding: Vec<f32> = (0..dim).map(|col| embeddings[[row, col]]).collect();
            l2_normalize(&mut embedding);
            result.push(embedding);
        }

        Ok(result)
    }

    /// CLIP preprocessing: shortest edge to 224, center crop 224, CLIP
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

        let resized = ImageTransforms::resize_shortest_edge(image, target_h)?;
        let cropped = ImageTransforms::center_crop(&resized, target_h, target_w)?;

        ImageTransforms::to_chw_normalized(&cropped, &CLIP_MEAN, &CLIP_STD)
    }
}

impl OpenVocabModel for OpenVocabClassifier {
    fn predict(&self, image: &Array3<f32>, categories: &[String]) -> Result<Prediction> {
        OpenVocabClassifier::predict(self, image, categories)
    }
}
