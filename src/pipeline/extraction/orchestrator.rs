use std::sync::Arc;

use async_trait::async_trait;

use super::sanitize::sanitize_extracted_text;
use super::types::{
    ExtractionMethod, ExtractionResult, OcrEngine, PageExtraction, PdfExtractor, TextExtractor,
};
use super::ExtractionError;
use crate::pipeline::import::{resolve_media_type, FileCategory, Upload};

/// Concrete implementation of the text extractor.
/// Uses trait objects for OCR and PDF extraction, enabling dependency injection.
pub struct DocumentExtractor {
    ocr_engine: Arc<dyn OcrEngine>,
    pdf_extractor: Arc<dyn PdfExtractor>,
}

impl DocumentExtractor {
    pub fn new(ocr_engine: Arc<dyn OcrEngine>, pdf_extractor: Arc<dyn PdfExtractor>) -> Self {
        Self {
            ocr_engine,
            pdf_extractor,
        }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(
        &self,
        upload: &Upload,
        category: FileCategory,
    ) -> Result<ExtractionResult, ExtractionError> {
        tracing::info!(
            category = category.as_str(),
            size_bytes = upload.size_bytes(),
            "Starting text extraction"
        );

        let (method, pages) = match category {
            FileCategory::Pdf => {
                let extractor = Arc::clone(&self.pdf_extractor);
                let bytes = upload.bytes.clone();
                let pages = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
                    .await
                    .map_err(|e| ExtractionError::TaskFailed(e.to_string()))??;
                (ExtractionMethod::PdfTextLayer, pages)
            }
            FileCategory::Image => {
                let media_type = resolve_media_type(upload);
                let ocr = self.ocr_engine.ocr_image(&upload.bytes, &media_type).await?;
                tracing::debug!(
                    engine = self.ocr_engine.engine_name(),
                    confidence = ocr.confidence,
                    "OCR page recognized"
                );
                let page = PageExtraction {
                    page_number: 1,
                    text: ocr.text,
                };
                (ExtractionMethod::Ocr, vec![page])
            }
            FileCategory::Unsupported => {
                return Err(ExtractionError::UnsupportedFormat(resolve_media_type(upload)));
            }
        };

        let full_text = sanitize_extracted_text(&join_pages(&pages));
        let page_count = pages.len();

        tracing::info!(
            method = ?method,
            page_count,
            text_length = full_text.len(),
            "Text extraction complete"
        );

        Ok(ExtractionResult {
            method,
            pages,
            full_text,
            page_count,
        })
    }
}

/// Concatenate pages, each followed by a newline.
fn join_pages(pages: &[PageExtraction]) -> String {
    pages.iter().fold(String::new(), |mut acc, page| {
        acc.push_str(&page.text);
        acc.push('\n');
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ocr::{MockOcrEngine, UnavailableOcrEngine};

    struct StubPdfExtractor {
        pages: Vec<&'static str>,
    }

    impl PdfExtractor for StubPdfExtractor {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, t)| PageExtraction {
                    page_number: i + 1,
                    text: t.to_string(),
                })
                .collect())
        }
    }

    struct FailingPdfExtractor;

    impl PdfExtractor for FailingPdfExtractor {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            Err(ExtractionError::PdfParsing("broken xref".into()))
        }
    }

    fn extractor_with(pdf: Arc<dyn PdfExtractor>) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(MockOcrEngine::new("Hemoglobin 13.5 g/dL", 0.9)), pdf)
    }

    #[tokio::test]
    async fn image_goes_through_ocr() {
        let extractor = extractor_with(Arc::new(StubPdfExtractor { pages: vec![] }));
        let upload = Upload::new("scan.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]);

        let result = extractor.extract(&upload, FileCategory::Image).await.unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.page_count, 1);
        assert_eq!(result.full_text, "Hemoglobin 13.5 g/dL");
    }

    #[tokio::test]
    async fn pdf_pages_are_joined_in_order() {
        let extractor = extractor_with(Arc::new(StubPdfExtractor {
            pages: vec!["Glucose 125 mg/dL", "Sodium 140 mmol/L"],
        }));
        let upload = Upload::new("report.pdf", "application/pdf", b"%PDF-1.4".to_vec());

        let result = extractor.extract(&upload, FileCategory::Pdf).await.unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfTextLayer);
        assert_eq!(result.page_count, 2);
        assert_eq!(result.full_text, "Glucose 125 mg/dL\nSodium 140 mmol/L");
    }

    #[tokio::test]
    async fn pdf_failure_propagates() {
        let extractor = extractor_with(Arc::new(FailingPdfExtractor));
        let upload = Upload::new("report.pdf", "application/pdf", b"%PDF-1.4".to_vec());

        let err = extractor.extract(&upload, FileCategory::Pdf).await.unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParsing(_)));
    }

    #[tokio::test]
    async fn unavailable_ocr_fails_images_only() {
        let extractor = DocumentExtractor::new(
            Arc::new(UnavailableOcrEngine::new("no OCR backend")),
            Arc::new(StubPdfExtractor {
                pages: vec!["Potassium 4.1"],
            }),
        );

        let image = Upload::new("scan.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        assert!(extractor.extract(&image, FileCategory::Image).await.is_err());

        let pdf = Upload::new("r.pdf", "application/pdf", b"%PDF".to_vec());
        let result = extractor.extract(&pdf, FileCategory::Pdf).await.unwrap();
        assert_eq!(result.full_text, "Potassium 4.1");
    }

    #[tokio::test]
    async fn unsupported_category_is_rejected() {
        let extractor = extractor_with(Arc::new(StubPdfExtractor { pages: vec![] }));
        let upload = Upload::new("notes.txt", "text/plain", b"hello".to_vec());

        let err = extractor.extract(&upload, FileCategory::Unsupported).await.unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn real_pdf_extractor_end_to_end() {
        let extractor = DocumentExtractor::new(
            Arc::new(MockOcrEngine::new("", 0.0)),
            Arc::new(crate::pipeline::extraction::pdf::PdfTextExtractor),
        );
        let bytes = crate::pipeline::extraction::pdf::tests::make_test_pdf(&["Albumin 4.2 g/dL"]);
        let upload = Upload::new("r.pdf", "application/pdf", bytes);

        let result = extractor.extract(&upload, FileCategory::Pdf).await.unwrap();
        assert!(result.full_text.contains("Albumin"));
    }
}
