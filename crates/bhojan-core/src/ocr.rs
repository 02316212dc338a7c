//! Optical character recognition for food-label photos
//!
//! Text extraction is delegated to the `tesseract` command-line engine. The
//! locale is fixed; there is no retry and no confidence filtering.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::info;

use crate::error::AnalyzeError;

/// Language pack passed to the OCR engine
pub const OCR_LANGUAGE: &str = "eng";

/// Extracts text from an image file
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &Path) -> impl Future<Output = Result<String, AnalyzeError>> + Send;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

impl TextRecognizer for TesseractOcr {
    async fn recognize(&self, image: &Path) -> Result<String, AnalyzeError> {
        if !image.is_file() {
            return Err(AnalyzeError::Ocr(format!("image not found: {}", image.display())));
        }

        info!("Running OCR on image file: {}", image.display());

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", OCR_LANGUAGE])
            .output()
            .await
            .map_err(|e| AnalyzeError::Ocr(format!("failed to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalyzeError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| AnalyzeError::Ocr(format!("engine produced non-UTF-8 text: {}", e)))
    }
}
