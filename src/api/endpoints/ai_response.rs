//! Completion endpoint: extracted report text in, lab results out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::interpretation::orchestrator::ReportInterpreter;
use crate::pipeline::interpretation::InterpretationError;

/// Set to `failed` when the model answered but its output could not be read.
pub const PARSE_STATUS_HEADER: &str = "x-parse-status";

/// `POST /api/AI_response`
///
/// Body `{ "text": string }`. Responds with the result array, or the string
/// `"NOT_LAB_REPORT"`. Checks run in order: body parse, API key, `text`.
pub async fn generate(State(ctx): State<ApiContext>, body: Bytes) -> Result<Response, ApiError> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::Internal(e.to_string()))?;

    let llm = ctx.llm.clone().ok_or(ApiError::MissingApiKey)?;

    let text = payload
        .get("text")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::from(InterpretationError::MissingText))?;

    let parsed = ReportInterpreter::new(llm).interpret(text).await?;

    let mut response = Json(&parsed.report).into_response();
    if parsed.parse_failed() {
        response
            .headers_mut()
            .insert(PARSE_STATUS_HEADER, HeaderValue::from_static("failed"));
    }
    Ok(response)
}
