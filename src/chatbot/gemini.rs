//! Gemini API client for text generation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chatbot::adapter::{
    Candidate, CompletionResponse, CompletionSettings, CompletionTransport, FinishReason,
    PromptRequest, TransportError,
};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base pause between attempts; multiplied by the attempt number.
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct GeminiClient {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    max_retries: u32,
    generation_config: Option<GenerationConfig>,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<&'a GenerationConfig>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &CompletionSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let generation_config = if settings.temperature.is_some() || settings.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
            })
        } else {
            None
        };

        Ok(Self {
            api_key: settings.api_key.clone(),
            endpoint: endpoint_url(&settings.api_base_url, &settings.model),
            timeout: settings.request_timeout,
            max_retries: settings.max_retries,
            generation_config,
            client,
        })
    }

    /// One HTTP round-trip, no retries.
    async fn attempt(&self, body: &str) -> Result<CompletionResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            let message = serde_json::from_str::<GenerateResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or_else(|| truncate(&body, 200));
            return Err(TransportError::Api { status: status.as_u16(), message });
        }

        parse_response(&body)
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

impl CompletionTransport for GeminiClient {
    async fn complete(&self, request: &PromptRequest) -> Result<CompletionResponse, TransportError> {
        let body = serde_json::to_string(&build_request(request, self.generation_config.as_ref()))
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        info!("🤖 Asking Gemini ({} chars)", request.user_text.chars().count());

        let mut attempt = 0;
        loop {
            match self.attempt(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Gemini attempt {attempt} failed, retrying: {e}");
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn endpoint_url(base_url: &str, model: &str) -> String {
    let model = model.trim_start_matches("models/");
    format!("{}/v1beta/models/{}:generateContent", base_url.trim_end_matches('/'), model)
}

fn build_request<'a>(
    request: &'a PromptRequest,
    generation_config: Option<&'a GenerationConfig>,
) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: SystemInstruction {
            parts: vec![Part { text: &request.system_prompt }],
        },
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: &request.user_text }],
        }],
        generation_config,
    }
}

fn parse_response(body: &str) -> Result<CompletionResponse, TransportError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(TransportError::Api { status: 200, message: error.message });
    }

    let prompt_blocked = parsed
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .is_some_and(|reason| !reason.is_empty() && reason != "BLOCK_REASON_UNSPECIFIED");

    let candidates = parsed
        .candidates
        .into_iter()
        .map(|c| {
            let parts: Vec<String> = c
                .content
                .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
                .unwrap_or_default();
            Candidate {
                text: if parts.is_empty() { None } else { Some(parts.concat()) },
                finish_reason: FinishReason::parse(c.finish_reason.as_deref().unwrap_or("")),
            }
        })
        .collect();

    Ok(CompletionResponse { candidates, prompt_blocked })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
