use thiserror::Error;

#[derive(Error, Debug)]
pub enum WasteError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WasteError {
    /// Stable code for diagnostics and structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            WasteError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            WasteError::InvalidInput(_) => "INVALID_INPUT",
            WasteError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            WasteError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            WasteError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            WasteError::Inference(_) => "INFERENCE_ERROR",
            WasteError::Ort(_) => "ORT_ERROR",
            WasteError::Tokenizer(_) => "TOKENIZER_ERROR",
            WasteError::Config(_) => "CONFIG_ERROR",
            WasteError::Io(_) => "IO_ERROR",
        }
    }

    /// True when the caller can retry with corrected input, false when the
    /// process owner has to intervene (missing weights, backend failure).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            WasteError::InvalidInput(_)
                | WasteError::ImageDecode(_)
                | WasteError::FileTooLarge(_, _)
                | WasteError::UnsupportedFormat(_)
        )
    }
}
