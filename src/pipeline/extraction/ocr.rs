use async_trait::async_trait;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: std::path::PathBuf,
    lang: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with a tessdata directory containing `eng.traineddata`.
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::OcrInit(format!(
                "eng.traineddata not found in {}",
                tessdata_dir.display()
            )));
        }

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            lang: "eng".to_string(),
        })
    }

    /// Locate tessdata from `TESSDATA_PREFIX` or common system paths.
    pub fn locate() -> Result<Self, ExtractionError> {
        if let Ok(path) = std::env::var("TESSDATA_PREFIX") {
            let p = std::path::PathBuf::from(&path);
            if p.join("eng.traineddata").exists() {
                return Self::new(&p);
            }
        }

        let candidates = [
            "/usr/share/tesseract-ocr/5/tessdata",
            "/usr/share/tesseract-ocr/4.00/tessdata",
            "/usr/share/tessdata",
            "/usr/local/share/tessdata",
            "/opt/homebrew/share/tessdata",
        ];

        candidates
            .iter()
            .map(std::path::PathBuf::from)
            .find(|p| p.join("eng.traineddata").exists())
            .ok_or_else(|| {
                ExtractionError::OcrInit(
                    "Tesseract data directory not found. Set TESSDATA_PREFIX or install tesseract-ocr-eng"
                        .into(),
                )
            })
            .and_then(|p| Self::new(&p))
    }

    fn recognize(
        tessdata_dir: &std::path::Path,
        lang: &str,
        image_bytes: &[u8],
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_str = tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata_str), Some(lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult { text, confidence })
    }
}

#[cfg(feature = "ocr")]
#[async_trait]
impl OcrEngine for BundledTesseract {
    async fn ocr_image(
        &self,
        image_bytes: &[u8],
        _media_type: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let tessdata_dir = self.tessdata_dir.clone();
        let lang = self.lang.clone();
        let bytes = image_bytes.to_vec();

        tokio::task::spawn_blocking(move || Self::recognize(&tessdata_dir, &lang, &bytes))
            .await
            .map_err(|e| ExtractionError::TaskFailed(e.to_string()))?
    }

    fn engine_name(&self) -> &'static str {
        "tesseract"
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn ocr_image(
        &self,
        _image_bytes: &[u8],
        _media_type: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }

    fn engine_name(&self) -> &'static str {
        "mock"
    }
}

/// Stand-in used when no OCR backend is configured. Images fail with a clear error.
pub struct UnavailableOcrEngine {
    reason: String,
}

impl UnavailableOcrEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for UnavailableOcrEngine {
    async fn ocr_image(
        &self,
        _image_bytes: &[u8],
        _media_type: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::OcrUnavailable(self.reason.clone()))
    }

    fn engine_name(&self) -> &'static str {
        "unavailable"
    }
}
