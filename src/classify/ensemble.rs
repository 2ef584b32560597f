use crate::classify::types::ClassificationResult;
use crate::image::ImageLoader;
use crate::models::{LabelClassifier, LabelModel, OpenVocabClassifier, OpenVocabModel};
use crate::utils::error::WasteError;
use crate::{Config, Result};
use image::DynamicImage;
use ndarray::Array3;
use std::path::Path;
use std::time::Instant;

/// Ensemble coordinator: owns both classifiers and the ordered category
/// list, decodes the input once, and combines both verdicts into one
/// `ClassificationResult`.
///
/// Generic over the backend traits; `from_config` wires the ONNX-backed
/// implementations.
pub struct EnsembleClassifier<L = LabelClassifier, V = OpenVocabClassifier> {
    label: L,
    open_vocab: V,
    categories: Vec<String>,
}

impl EnsembleClassifier {
    /// Load both ONNX backends described by the configuration. Weights load
    /// once here and stay immutable for the process lifetime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let label = LabelClassifier::new(config)?;
        let open_vocab = OpenVocabClassifier::new(config)?;

        Self::new(label, open_vocab, config.categories.clone())
    }
}

impl<L: LabelModel, V: OpenVocabModel> EnsembleClassifier<L, V> {
    pub fn new(label: L, open_vocab: V, categories: Vec<String>) -> Result<Self> {
        if categories.is_empty() {
            return Err(WasteError::InvalidInput(
                "open-vocabulary category list must not be empty".to_string(),
            ));
        }

        Ok(Self {
            label,
            open_vocab,
            categories,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn classify_path(&self, path: impl AsRef<Path>) -> Result<ClassificationResult> {
        let image = ImageLoader::from_path(path)?;
        self.classify_image(&image)
    }

    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        let image = ImageLoader::from_bytes(bytes)?;
        self.classify_image(&image)
    }

    /// Decode once, then dispatch the shared representation to both models.
    pub fn classify_image(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let array = ImageLoader::decode(image)?;
        self.classify_array(&array)
    }

    /// Core path: label model first, then the open-vocabulary model on the
    /// same decoded image. A label failure fails the whole call before the
    /// open-vocabulary model runs; no partial result is ever returned.
    pub fn classify_array(&self, image: &Array3<f32>) -> Result<ClassificationResult> {
        let start = Instant::now();

        let label = self.label.predict(image)?;
        let waste_type = self.open_vocab.predict(image, &self.categories)?;

        tracing::info!(
            "Classification completed: label='{}' ({:.2}%), waste_type='{}' ({:.2}%), total_time={:.3}s",
            label.category,
            label.confidence,
            waste_type.category,
            waste_type.confidence,
            start.elapsed().as_secs_f32()
        );

        Ok(ClassificationResult::new(label, waste_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Prediction;
    use crate::models::open_vocab::category_from_description;
    use std::cell::Cell;
    use std::rc::Rc;

    struct StubLabel {
        category: &'static str,
        confidence: f32,
        fail: bool,
        calls: Rc<Cell<usize>>,
    }

    impl LabelModel for StubLabel {
        fn predict(&self, _image: &Array3<f32>) -> Result<Prediction> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(WasteError::Inference("malformed tensor shape".to_string()));
            }
            Ok(Prediction::new(self.category, self.confidence))
        }
    }

    struct StubOpenVocab {
        winner: usize,
        confidence: f32,
        calls: Rc<Cell<usize>>,
    }

    impl OpenVocabModel for StubOpenVocab {
        fn predict(&self, _image: &Array3<f32>, categories: &[String]) -> Result<Prediction> {
            self.calls.set(self.calls.get() + 1);
            if categories.is_empty() {
                return Err(WasteError::InvalidInput(
                    "category list must not be empty".to_string(),
                ));
            }
            let category = category_from_description(&categories[self.winner]);
            Ok(Prediction::new(category, self.confidence))
        }
    }

    fn stub_ensemble(
        fail_label: bool,
    ) -> (
        EnsembleClassifier<StubLabel, StubOpenVocab>,
        Rc<Cell<usize>>,
        Rc<Cell<usize>>,
    ) {
        let label_calls = Rc::new(Cell::new(0));
        let open_vocab_calls = Rc::new(Cell::new(0));

        let ensemble = EnsembleClassifier::new(
            StubLabel {
                category: "plastic_bottle",
                confidence: 87.43,
                fail: fail_label,
                calls: Rc::clone(&label_calls),
            },
            StubOpenVocab {
                winner: 0,
                confidence: 91.02,
                calls: Rc::clone(&open_vocab_calls),
            },
            Config::default_categories(),
        )
        .unwrap();

        (ensemble, label_calls, open_vocab_calls)
    }

    fn blank_image() -> Array3<f32> {
        Array3::zeros((32, 32, 3))
    }

    #[test]
    fn combined_sentence_embeds_both_predictions() {
        let (ensemble, _, _) = stub_ensemble(false);
        let result = ensemble.classify_array(&blank_image()).unwrap();

        assert_eq!(
            result.summary(),
            "This is plastic_bottle with 87.43% confidence and the waste type is recyclable plastic waste"
        );
        // The open-vocabulary confidence is carried in the structure even
        // though the sentence omits it
        assert_eq!(result.waste_type.confidence, 91.02);
    }

    #[test]
    fn label_failure_fails_the_call_before_open_vocab_runs() {
        let (ensemble, label_calls, open_vocab_calls) = stub_ensemble(true);
        let result = ensemble.classify_array(&blank_image());

        assert!(matches!(result, Err(WasteError::Inference(_))));
        assert_eq!(label_calls.get(), 1);
        assert_eq!(open_vocab_calls.get(), 0);
    }

    #[test]
    fn corrupt_bytes_fail_before_either_model_runs() {
        let (ensemble, label_calls, open_vocab_calls) = stub_ensemble(false);
        let result = ensemble.classify_bytes(b"definitely not an image");

        assert!(result.is_err());
        assert_eq!(label_calls.get(), 0);
        assert_eq!(open_vocab_calls.get(), 0);
    }

    #[test]
    fn undersized_image_fails_before_either_model_runs() {
        let (ensemble, label_calls, open_vocab_calls) = stub_ensemble(false);
        let result = ensemble.classify_image(&DynamicImage::new_rgb8(8, 8));

        assert!(matches!(result, Err(WasteError::InvalidInput(_))));
        assert_eq!(label_calls.get(), 0);
        assert_eq!(open_vocab_calls.get(), 0);
    }

    #[test]
    fn empty_category_list_is_rejected_at_construction() {
        let calls = Rc::new(Cell::new(0));
        let result = EnsembleClassifier::new(
            StubLabel {
                category: "x",
                confidence: 1.0,
                fail: false,
                calls: Rc::clone(&calls),
            },
            StubOpenVocab {
                winner: 0,
                confidence: 1.0,
                calls,
            },
            Vec::new(),
        );

        assert!(matches!(result, Err(WasteError::InvalidInput(_))));
    }

    #[test]
    fn same_input_classified_twice_is_identical() {
        let (ensemble, _, _) = stub_ensemble(false);
        let image = blank_image();

        let first = ensemble.classify_array(&image).unwrap();
        let second = ensemble.classify_array(&image).unwrap();

        assert_eq!(first, second);
    }
}
