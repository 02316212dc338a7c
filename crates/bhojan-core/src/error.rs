use thiserror::Error;

use crate::provider::Provider;

/// Everything that can go wrong between an attached image and a decoded analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("request to model endpoint failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response from model endpoint: {0}")]
    InvalidResponse(String),

    #[error("model did not return valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("no API key configured for {}", .0.display_name())]
    MissingApiKey(Provider),

    #[error("analysis is missing inferred_intent")]
    MissingIntent,
}
