use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{LlmClient, VisionClient};
use super::InterpretationError;
use crate::config::{ServerConfig, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client over the public REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, InterpretationError> {
        // No request timeout: the upstream API's own limits apply.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| InterpretationError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Client configured from the server settings. Fails when no API key is set.
    pub fn from_config(config: &ServerConfig) -> Result<Self, InterpretationError> {
        let api_key = config
            .gemini_api_key
            .as_deref()
            .ok_or(InterpretationError::MissingApiKey)?;
        Ok(Self::new(api_key, &config.model)?
            .with_generation(config.max_output_tokens, config.temperature))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_generation(mut self, max_output_tokens: u32, temperature: f32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request<'a>(
        &self,
        parts: Vec<RequestPart<'a>>,
        response_mime_type: &'static str,
    ) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type,
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    async fn generate(&self, body: &GenerateContentRequest<'_>) -> Result<String, InterpretationError> {
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InterpretationError::HttpClient("Request to Gemini API timed out".into())
                } else {
                    InterpretationError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %self.model, "Gemini API returned error");
            return Err(InterpretationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InterpretationError::ResponseParsing(e.to_string()))?;

        let text = extract_candidate_text(&parsed)?;

        tracing::info!(
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            response_len = text.len(),
            "Gemini completion received"
        );

        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, InterpretationError> {
        let body = self.build_request(vec![RequestPart::Text { text: prompt }], "application/json");
        self.generate(&body).await
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn transcribe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, InterpretationError> {
        let parts = vec![
            RequestPart::Text { text: prompt },
            RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: image_base64,
                },
            },
        ];
        let body = self.build_request(parts, "text/plain");
        self.generate(&body).await
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Pull the answer text out of the first candidate.
///
/// A `MAX_TOKENS` finish is an error even if partial text came back: a
/// truncated JSON array is worse than none.
fn extract_candidate_text(response: &GenerateContentResponse) -> Result<String, InterpretationError> {
    let Some(candidate) = response.candidates.first() else {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
        }
        return Err(InterpretationError::NoResponse);
    };

    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        return Err(InterpretationError::ResponseTooLong);
    }

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        tracing::warn!(
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("none"),
            "Gemini returned no text"
        );
        return Err(InterpretationError::NoResponse);
    }

    Ok(text)
}

// ──────────────────────────────────────────────
// Mocks
// ──────────────────────────────────────────────

/// Mock LLM client for testing. Returns a configurable response and records prompts.
pub struct MockLlmClient {
    response: Result<String, InterpretationError>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: InterpretationError) -> Self {
        Self {
            response: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, InterpretationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.response.clone()
    }
}

/// One recorded call to [`MockVisionClient`].
#[derive(Debug, Clone)]
pub struct VisionCall {
    pub prompt: String,
    pub image_base64: String,
    pub mime_type: String,
}

/// Mock vision client for testing.
pub struct MockVisionClient {
    response: Result<String, InterpretationError>,
    calls: Mutex<Vec<VisionCall>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(InterpretationError::HttpClient(message.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<VisionCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn transcribe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, InterpretationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(VisionCall {
                prompt: prompt.to_string(),
                image_base64: image_base64.to_string(),
                mime_type: mime_type.to_string(),
            });
        }
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    fn response_from(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn request_body_matches_generate_content_schema() {
        let client = GeminiClient::new("key", "gemini-2.5-flash")
            .unwrap()
            .with_generation(1024, 0.5);
        let body = client.build_request(vec![RequestPart::Text { text: "hello" }], "application/json");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn inline_image_part_serializes_camel_case() {
        let client = GeminiClient::new("key", "m").unwrap();
        let parts = vec![RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: "image/png",
                data: "AAAA",
            },
        }];
        let json = serde_json::to_value(client.build_request(parts, "text/plain")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["data"], "AAAA");
    }

    #[test]
    fn endpoint_uses_model_name() {
        let client = GeminiClient::new("key", "gemini-2.5-flash")
            .unwrap()
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = ServerConfig::default();
        assert_eq!(
            GeminiClient::from_config(&config).err(),
            Some(InterpretationError::MissingApiKey)
        );

        let config = ServerConfig {
            gemini_api_key: Some("k".into()),
            ..ServerConfig::default()
        };
        assert_eq!(GeminiClient::from_config(&config).unwrap().model(), DEFAULT_MODEL);
    }

    #[test]
    fn extracts_text_from_first_candidate() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "[{\"parameter\":"}, {"text": "\"ALT\"}]"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_candidate_text(&response).unwrap(), "[{\"parameter\":\"ALT\"}]");
    }

    #[test]
    fn thought_parts_are_skipped() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "thinking...", "thought": true}, {"text": "[]"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_candidate_text(&response).unwrap(), "[]");
    }

    #[test]
    fn max_tokens_is_too_long_error() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "[{\"parameter\": \"Gluc"}]},
                "finishReason": "MAX_TOKENS"
            }]
        }));
        let err = extract_candidate_text(&response).unwrap_err();
        assert_eq!(err, InterpretationError::ResponseTooLong);
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn empty_or_missing_text_is_no_response() {
        let empty = response_from(serde_json::json!({"candidates": []}));
        assert_eq!(extract_candidate_text(&empty), Err(InterpretationError::NoResponse));

        let blocked = response_from(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        assert_eq!(extract_candidate_text(&blocked), Err(InterpretationError::NoResponse));

        let no_parts = response_from(serde_json::json!({
            "candidates": [{"finishReason": "STOP"}]
        }));
        assert_eq!(extract_candidate_text(&no_parts), Err(InterpretationError::NoResponse));
    }

    async fn fake_gemini(
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("good-key") {
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": {"message": "API key not valid"}})),
            );
        }
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("");
        let echo = format!("{call}|{}", prompt.len());
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": echo}]}, "finishReason": "STOP"}]
            })),
        )
    }

    async fn spawn_fake_gemini() -> String {
        let app = Router::new().route("/v1beta/models/:call", post(fake_gemini));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    #[tokio::test]
    async fn completes_against_http_endpoint() {
        let base = spawn_fake_gemini().await;
        let client = GeminiClient::new("good-key", "gemini-2.5-flash")
            .unwrap()
            .with_base_url(&base);

        let text = client.complete("abcd").await.unwrap();
        assert_eq!(text, "gemini-2.5-flash:generateContent|4");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let base = spawn_fake_gemini().await;
        let client = GeminiClient::new("bad-key", "gemini-2.5-flash")
            .unwrap()
            .with_base_url(&base);

        match client.complete("abcd").await {
            Err(InterpretationError::Upstream { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("API key not valid"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_client_records_prompts() {
        let client = MockLlmClient::new("[]");
        assert_eq!(client.complete("p1").await.unwrap(), "[]");
        assert_eq!(client.prompts(), vec!["p1".to_string()]);

        let failing = MockLlmClient::failing(InterpretationError::NoResponse);
        assert_eq!(failing.complete("p").await, Err(InterpretationError::NoResponse));
    }
}
