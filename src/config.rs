use crate::utils::error::WasteError;
use crate::Result;
use std::path::PathBuf;

/// Default open-vocabulary category descriptions, ordered. The order is part
/// of the contract: argmax ties resolve to the earliest entry.
const DEFAULT_CATEGORIES: [&str; 8] = [
    "recyclable plastic waste like plastic bottles and containers",
    "paper waste like newspapers and cardboard",
    "organic waste like food scraps and plant materials",
    "electronic waste like old phones and computers",
    "glass waste like bottles and jars",
    "metal waste like cans and foil",
    "hazardous waste like batteries and chemicals",
    "general non-recyclable waste",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Model file directory
    pub models_dir: PathBuf,

    /// Ordered open-vocabulary category descriptions
    pub categories: Vec<String>,

    /// ONNX Runtime settings
    pub onnx: OnnxConfig,

    /// Scale applied to cosine similarities before softmax. Matches the
    /// temperature the joint embedding model was trained with.
    pub clip_logit_scale: f32,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// Intra-op CPU threads per session
    pub intra_threads: usize,

    /// Graph optimization level (0-3)
    pub optimization_level: u8,
}

impl Config {
    pub fn new(models_dir: impl Into<PathBuf>, intra_threads: Option<usize>) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let onnx = OnnxConfig {
            // Use 75% of the cores unless overridden
            intra_threads: intra_threads.unwrap_or((cpu_cores * 3 / 4).max(1)),
            optimization_level: 3,
        };

        Ok(Self {
            models_dir: models_dir.into(),
            categories: Self::default_categories(),
            onnx,
            clip_logit_scale: 100.0,
        })
    }

    /// Replace the category list. The list is configuration data so wording
    /// changes never require touching classifier code.
    pub fn with_categories(mut self, categories: Vec<String>) -> Result<Self> {
        if categories.is_empty() {
            return Err(WasteError::Config(
                "category list must not be empty".to_string(),
            ));
        }
        self.categories = categories;
        Ok(self)
    }

    pub fn default_categories() -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
    }

    /// Closed-vocabulary classification model
    pub fn label_model_path(&self) -> PathBuf {
        self.models_dir.join("resnet50/model.onnx")
    }

    /// Label vocabulary file, one label per line, index order
    pub fn label_vocab_path(&self) -> PathBuf {
        self.models_dir.join("resnet50/labels.txt")
    }

    /// Joint embedding image encoder
    pub fn clip_image_model_path(&self) -> PathBuf {
        self.models_dir.join("clip/image_encoder.onnx")
    }

    /// Joint embedding text encoder
    pub fn clip_text_model_path(&self) -> PathBuf {
        self.models_dir.join("clip/text_encoder.onnx")
    }

    /// Tokenizer definition for the text encoder
    pub fn clip_tokenizer_path(&self) -> PathBuf {
        self.models_dir.join("clip/tokenizer.json")
    }
}
