//! Analyzer page endpoints: bootstrap data, one-shot analysis, and the
//! streaming variant that reports cosmetic progress before the outcome.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use futures_util::stream::Stream;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthenticatedUser};
use crate::config::{ACCEPTED_MEDIA_TYPES, MAX_UPLOAD_BYTES};
use crate::pipeline::import::Upload;
use crate::pipeline::processor::{
    AnalysisOutcome, Dialog, LabReportAnalyzer, PROCESSING_ERROR_TITLE,
};
use crate::progress::ProgressIndicator;

/// Multipart field holding the report.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct AnalyzerPage {
    pub user_id: String,
    pub accepted_media_types: &'static [&'static str],
    pub max_upload_bytes: u64,
    pub disclaimer: Dialog,
    pub model_configured: bool,
}

/// `GET /analyzer`
pub async fn page(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<AnalyzerPage> {
    Json(AnalyzerPage {
        user_id: user.user_id,
        accepted_media_types: ACCEPTED_MEDIA_TYPES,
        max_upload_bytes: MAX_UPLOAD_BYTES,
        disclaimer: Dialog::disclaimer(),
        model_configured: ctx.llm.is_some(),
    })
}

/// `POST /analyzer/analyze`
///
/// Always 200 once a file was received; rejections and failures travel as
/// dialog-bearing outcomes. The analysis keeps running if the client goes away.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        user_id = %user.user_id,
        file = %upload.file_name,
        size_bytes = upload.size_bytes(),
        "Analysis requested"
    );
    let analysis = spawn_analysis(ctx.analyzer.clone(), upload);
    Ok(Json(join_analysis(analysis).await))
}

/// `POST /analyzer/analyze/stream`
///
/// Server-sent events: `progress` (`{ phase, percent }`) while the analysis
/// runs, a final `progress` at 100, then one `outcome`. A disconnect stops
/// the events, not the analysis.
pub async fn analyze_stream(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        user_id = %user.user_id,
        file = %upload.file_name,
        size_bytes = upload.size_bytes(),
        "Streaming analysis requested"
    );

    let analysis = spawn_analysis(ctx.analyzer.clone(), upload);
    let interval = ctx.progress_interval;

    let stream = async_stream::stream! {
        let progress = ProgressIndicator::with_interval(interval);
        let mut updates = progress.subscribe();
        progress.start();
        let initial = *updates.borrow_and_update();
        yield Ok(json_event("progress", &initial));

        let analysis = join_analysis(analysis);
        tokio::pin!(analysis);

        let outcome = loop {
            tokio::select! {
                outcome = &mut analysis => break outcome,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break (&mut analysis).await;
                    }
                    let snapshot = *updates.borrow_and_update();
                    yield Ok(json_event("progress", &snapshot));
                }
            }
        };

        progress.complete();
        yield Ok(json_event("progress", &progress.snapshot()));
        yield Ok(json_event("outcome", &outcome));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Run the analysis on its own task. Dropping the handle does not cancel it.
fn spawn_analysis(analyzer: Arc<LabReportAnalyzer>, upload: Upload) -> JoinHandle<AnalysisOutcome> {
    tokio::spawn(async move { analyzer.analyze(&upload).await })
}

async fn join_analysis(analysis: JoinHandle<AnalysisOutcome>) -> AnalysisOutcome {
    match analysis.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Analysis task failed");
            AnalysisOutcome::Failed {
                dialog: Dialog::new(PROCESSING_ERROR_TITLE, format!("Analysis task failed: {e}")),
            }
        }
    }
}

fn json_event<T: Serialize>(name: &'static str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(event = name, error = %e, "Failed to serialize SSE event");
            Event::default().event(name).data("{}")
        }
    }
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let media_type = field.content_type().unwrap_or("").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload::new(file_name, media_type, bytes.to_vec()));
    }
    Err(ApiError::BadRequest("No file provided.".into()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Failed to read file data: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::test_support::context_with;
    use crate::pipeline::interpretation::gemini::MockLlmClient;
    use std::time::Duration;

    fn pdf_upload() -> Upload {
        Upload::new("report.pdf", "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[tokio::test]
    async fn analysis_survives_dropped_request() {
        let llm = Arc::new(MockLlmClient::new("[]"));
        let ctx = context_with(Some(llm.clone()));

        let joined = join_analysis(spawn_analysis(ctx.analyzer.clone(), pdf_upload()));
        drop(joined);

        for _ in 0..100 {
            if !llm.prompts().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn joined_analysis_returns_outcome() {
        let ctx = context_with(Some(Arc::new(MockLlmClient::new("[]"))));
        let outcome = join_analysis(spawn_analysis(ctx.analyzer.clone(), pdf_upload())).await;
        assert_eq!(outcome.kind(), "completed");
    }
}
