//! Completion adapter - turns user text into a persona-steered model reply.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chatbot::gemini::GeminiClient;

/// Failure detail returned by a disabled adapter.
pub const MISSING_CREDENTIALS: &str = "missing credentials";

/// Failure detail when the model answered with nothing usable.
pub const EMPTY_RESPONSE: &str = "empty response";

/// Outcome of a single `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Success(String),
    SafetyBlocked,
    Failure(String),
}

/// One request to the completion backend: the persona turn, then the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub system_prompt: String,
    pub user_text: String,
}

/// Why a candidate stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Unspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Blocklist,
    ProhibitedContent,
    Spii,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" | "FINISH_REASON_UNSPECIFIED" => Self::Unspecified,
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            other => Self::Other(other.to_string()),
        }
    }

    /// True for every reason that means the content policy refused the answer.
    pub fn is_safety_block(&self) -> bool {
        matches!(
            self,
            Self::Safety | Self::Blocklist | Self::ProhibitedContent | Self::Spii
        )
    }
}

/// A single candidate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Concatenated text parts, `None` when the candidate carried no text.
    pub text: Option<String>,
    pub finish_reason: FinishReason,
}

/// Vendor-neutral view of a completion response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResponse {
    pub candidates: Vec<Candidate>,
    /// The prompt itself was refused before any candidate was produced.
    pub prompt_blocked: bool,
}

/// Errors raised by a completion transport.
#[derive(Debug)]
pub enum TransportError {
    Timeout(Duration),
    Connect(String),
    Http(String),
    Api { status: u16, message: String },
    Parse(String),
    Build(String),
}

impl TransportError {
    /// Whether another attempt has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(_) | Self::Parse(_) | Self::Build(_) => false,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "request timed out after {}s", after.as_secs()),
            Self::Connect(e) => write!(f, "connection failed: {e}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api { status, message } => write!(f, "API error {status}: {message}"),
            Self::Parse(e) => write!(f, "malformed response: {e}"),
            Self::Build(e) => write!(f, "failed to build HTTP client: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Anything that can carry a `PromptRequest` to a model and bring back candidates.
pub trait CompletionTransport: Send + Sync {
    fn complete(
        &self,
        request: &PromptRequest,
    ) -> impl Future<Output = Result<CompletionResponse, TransportError>> + Send;
}

/// Settings for the completion backend, fixed at startup.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub system_prompt: String,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

enum AdapterState<T> {
    Disabled(String),
    Enabled(T),
}

/// Wraps a completion transport behind a text-in, result-out contract.
///
/// An adapter built without an API key stays disabled for its whole life and
/// answers every call with `Failure("missing credentials")`.
pub struct CompletionAdapter<T = GeminiClient> {
    system_prompt: String,
    state: AdapterState<T>,
}

impl CompletionAdapter<GeminiClient> {
    /// Build an adapter backed by the Gemini API.
    pub fn gemini(settings: &CompletionSettings) -> Self {
        if settings.api_key.trim().is_empty() {
            return Self::disabled(&settings.system_prompt, MISSING_CREDENTIALS);
        }
        match GeminiClient::new(settings) {
            Ok(client) => Self::new(settings, client),
            Err(e) => {
                warn!("Completion adapter disabled: {e}");
                Self::disabled(&settings.system_prompt, &e.to_string())
            }
        }
    }
}

impl<T: CompletionTransport> CompletionAdapter<T> {
    pub fn new(settings: &CompletionSettings, transport: T) -> Self {
        if settings.api_key.trim().is_empty() {
            return Self::disabled(&settings.system_prompt, MISSING_CREDENTIALS);
        }
        Self {
            system_prompt: settings.system_prompt.clone(),
            state: AdapterState::Enabled(transport),
        }
    }

    fn disabled(system_prompt: &str, reason: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            state: AdapterState::Disabled(reason.to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, AdapterState::Enabled(_))
    }

    /// Reason the adapter refuses to call out, if it is disabled.
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.state {
            AdapterState::Disabled(reason) => Some(reason),
            AdapterState::Enabled(_) => None,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Generate a reply for `user_text`.
    ///
    /// Empty input is the caller's business; it is passed through as-is.
    pub async fn generate(&self, user_text: &str) -> CompletionResult {
        let transport = match &self.state {
            AdapterState::Disabled(reason) => return CompletionResult::Failure(reason.clone()),
            AdapterState::Enabled(transport) => transport,
        };

        let request = PromptRequest {
            system_prompt: self.system_prompt.clone(),
            user_text: user_text.to_string(),
        };

        let response = match transport.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Completion failed: {e}");
                return CompletionResult::Failure(e.to_string());
            }
        };

        let result = interpret(response);
        match &result {
            CompletionResult::Success(text) => {
                debug!("Completion succeeded ({} chars)", text.chars().count())
            }
            CompletionResult::SafetyBlocked => info!("🛡️ Completion blocked by safety policy"),
            CompletionResult::Failure(detail) => warn!("Completion unusable: {detail}"),
        }
        result
    }
}

/// Map a raw response onto the three outcomes.
fn interpret(response: CompletionResponse) -> CompletionResult {
    if response.prompt_blocked {
        return CompletionResult::SafetyBlocked;
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return CompletionResult::Failure(EMPTY_RESPONSE.to_string());
    };

    if candidate.finish_reason.is_safety_block() {
        return CompletionResult::SafetyBlocked;
    }

    match candidate.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => CompletionResult::Success(text.to_string()),
        _ => CompletionResult::Failure(EMPTY_RESPONSE.to_string()),
    }
}
