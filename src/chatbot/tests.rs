//! Behaviour tests for the completion adapter against scripted transports.
//!
//! Run with: cargo test chatbot

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::adapter::{
    Candidate, CompletionResponse, CompletionTransport, FinishReason, TransportError,
    EMPTY_RESPONSE, MISSING_CREDENTIALS,
};
use super::persona::{reply_text, SAFETY_REFUSAL, TRY_AGAIN_LATER};
use super::*;

/// What the mock should do on its next call.
enum Scripted {
    Respond(CompletionResponse),
    Fail(TransportError),
}

/// Transport that replays scripted outcomes and records every request.
struct MockTransport {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<PromptRequest>>>,
    script: Mutex<VecDeque<Scripted>>,
    /// Returned once the script runs out.
    fallback: Option<CompletionResponse>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// Always answer with the same response.
    fn fixed(response: CompletionResponse) -> Self {
        Self { fallback: Some(response), ..Self::new() }
    }

    fn queue(self, outcome: Scripted) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    fn request_log(&self) -> Arc<Mutex<Vec<PromptRequest>>> {
        self.requests.clone()
    }
}

impl CompletionTransport for MockTransport {
    async fn complete(&self, request: &PromptRequest) -> Result<CompletionResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(e)) => Err(e),
            None => match &self.fallback {
                Some(response) => Ok(response.clone()),
                None => Err(TransportError::Http("mock script exhausted".to_string())),
            },
        }
    }
}

fn settings(api_key: &str) -> CompletionSettings {
    CompletionSettings {
        api_key: api_key.to_string(),
        system_prompt: "You are a helpful study assistant.".to_string(),
        model: "gemini-test".to_string(),
        api_base_url: "http://localhost".to_string(),
        request_timeout: Duration::from_secs(5),
        max_retries: 0,
        temperature: None,
        max_output_tokens: None,
    }
}

fn text_response(text: &str, finish_reason: FinishReason) -> CompletionResponse {
    CompletionResponse {
        candidates: vec![Candidate {
            text: Some(text.to_string()),
            finish_reason,
        }],
        prompt_blocked: false,
    }
}

// =============================================================================
// SUCCESS PATH
// =============================================================================

mod success {
    use super::*;

    #[tokio::test]
    async fn test_persian_greeting_scenario() {
        let transport = MockTransport::fixed(text_response(
            "سلام! چطور می‌توانم کمک کنم؟",
            FinishReason::Stop,
        ));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        let result = adapter.generate("سلام").await;

        assert_eq!(
            result,
            CompletionResult::Success("سلام! چطور می‌توانم کمک کنم؟".to_string())
        );
    }

    #[tokio::test]
    async fn test_success_text_is_trimmed() {
        let transport = MockTransport::fixed(text_response("\n\n  answer body \t\n", FinishReason::Stop));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(
            adapter.generate("q").await,
            CompletionResult::Success("answer body".to_string())
        );
    }

    #[tokio::test]
    async fn test_inner_whitespace_preserved() {
        let transport = MockTransport::fixed(text_response(" line one\n\nline two ", FinishReason::Stop));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(
            adapter.generate("q").await,
            CompletionResult::Success("line one\n\nline two".to_string())
        );
    }

    #[tokio::test]
    async fn test_exactly_one_transport_call() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let calls = transport.call_counter();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("q").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// =============================================================================
// REQUEST SHAPE
// =============================================================================

mod request_shape {
    use super::*;

    #[tokio::test]
    async fn test_system_prompt_then_user_text() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let log = transport.request_log();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("what is a monad?").await;

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt, "You are a helpful study assistant.");
        assert_eq!(requests[0].user_text, "what is a monad?");
    }

    #[tokio::test]
    async fn test_no_history_between_calls() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let log = transport.request_log();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("first question").await;
        adapter.generate("second question").await;

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].user_text, "second question");
        assert!(!requests[1].system_prompt.contains("first question"));
    }

    #[tokio::test]
    async fn test_user_text_passed_through_untouched() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let log = transport.request_log();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("  padded\n").await;

        assert_eq!(log.lock().unwrap()[0].user_text, "  padded\n");
    }

    #[tokio::test]
    async fn test_exposed_persona_is_the_one_sent() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let log = transport.request_log();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("q").await;

        assert_eq!(adapter.system_prompt(), "You are a helpful study assistant.");
        assert_eq!(log.lock().unwrap()[0].system_prompt, adapter.system_prompt());
    }

    #[test]
    fn test_disabled_adapter_keeps_persona() {
        let adapter = CompletionAdapter::gemini(&settings(""));
        assert_eq!(adapter.system_prompt(), "You are a helpful study assistant.");
    }
}

// =============================================================================
// SAFETY HANDLING
// =============================================================================

mod safety {
    use super::*;

    #[tokio::test]
    async fn test_safety_flag_wins_over_text() {
        let transport = MockTransport::fixed(text_response("some text anyway", FinishReason::Safety));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(adapter.generate("q").await, CompletionResult::SafetyBlocked);
    }

    #[tokio::test]
    async fn test_safety_without_content() {
        let transport = MockTransport::fixed(CompletionResponse {
            candidates: vec![Candidate { text: None, finish_reason: FinishReason::Safety }],
            prompt_blocked: false,
        });
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(adapter.generate("q").await, CompletionResult::SafetyBlocked);
    }

    #[tokio::test]
    async fn test_prohibited_content_is_safety_block() {
        let transport = MockTransport::fixed(text_response("", FinishReason::ProhibitedContent));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(adapter.generate("q").await, CompletionResult::SafetyBlocked);
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let transport = MockTransport::fixed(CompletionResponse {
            candidates: vec![],
            prompt_blocked: true,
        });
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        let result = adapter.generate("q").await;

        assert_eq!(result, CompletionResult::SafetyBlocked);
        assert_eq!(reply_text(&result), SAFETY_REFUSAL);
    }

    #[tokio::test]
    async fn test_safety_block_not_retried() {
        let transport = MockTransport::fixed(text_response("", FinishReason::Safety));
        let calls = transport.call_counter();
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        adapter.generate("q").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// =============================================================================
// FAILURES
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let transport = MockTransport::new()
            .queue(Scripted::Fail(TransportError::Timeout(Duration::from_secs(60))));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        let result = adapter.generate("q").await;

        assert_eq!(
            result,
            CompletionResult::Failure("request timed out after 60s".to_string())
        );
        assert_eq!(reply_text(&result), TRY_AGAIN_LATER);
    }

    #[tokio::test]
    async fn test_quota_error_becomes_failure() {
        let transport = MockTransport::new().queue(Scripted::Fail(TransportError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        }));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        match adapter.generate("q").await {
            CompletionResult::Failure(detail) => assert!(detail.contains("429")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_response_becomes_failure() {
        let transport =
            MockTransport::new().queue(Scripted::Fail(TransportError::Parse("expected value".to_string())));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert!(matches!(adapter.generate("q").await, CompletionResult::Failure(_)));
    }

    #[tokio::test]
    async fn test_no_candidates_is_failure() {
        let transport = MockTransport::fixed(CompletionResponse::default());
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert_eq!(
            adapter.generate("q").await,
            CompletionResult::Failure(EMPTY_RESPONSE.to_string())
        );
    }

    #[tokio::test]
    async fn test_adapter_keeps_working_after_failure() {
        let transport = MockTransport::fixed(text_response("recovered", FinishReason::Stop))
            .queue(Scripted::Fail(TransportError::Connect("refused".to_string())));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        assert!(matches!(adapter.generate("q").await, CompletionResult::Failure(_)));
        assert_eq!(
            adapter.generate("q").await,
            CompletionResult::Success("recovered".to_string())
        );
    }
}

// =============================================================================
// DISABLED ADAPTER
// =============================================================================

mod disabled {
    use super::*;

    #[tokio::test]
    async fn test_empty_key_never_calls_transport() {
        let transport = MockTransport::fixed(text_response("should not be seen", FinishReason::Stop));
        let calls = transport.call_counter();
        let adapter = CompletionAdapter::new(&settings(""), transport);

        for _ in 0..3 {
            assert_eq!(
                adapter.generate("q").await,
                CompletionResult::Failure(MISSING_CREDENTIALS.to_string())
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!adapter.is_enabled());
    }

    #[tokio::test]
    async fn test_whitespace_key_is_missing() {
        let transport = MockTransport::fixed(text_response("x", FinishReason::Stop));
        let calls = transport.call_counter();
        let adapter = CompletionAdapter::new(&settings("   "), transport);

        adapter.generate("q").await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(adapter.disabled_reason(), Some(MISSING_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_gemini_constructor_without_key() {
        let adapter = CompletionAdapter::gemini(&settings(""));

        assert!(!adapter.is_enabled());
        assert_eq!(
            adapter.generate("سلام").await,
            CompletionResult::Failure(MISSING_CREDENTIALS.to_string())
        );
    }

    #[test]
    fn test_gemini_constructor_with_key_is_enabled() {
        let adapter = CompletionAdapter::gemini(&settings("key"));
        assert!(adapter.is_enabled());
        assert_eq!(adapter.disabled_reason(), None);
    }
}

// =============================================================================
// STATELESSNESS
// =============================================================================

mod statelessness {
    use super::*;

    #[tokio::test]
    async fn test_same_input_same_result() {
        let transport = MockTransport::fixed(text_response(" fixed answer ", FinishReason::Stop));
        let adapter = CompletionAdapter::new(&settings("key"), transport);

        let first = adapter.generate("same question").await;
        let second = adapter.generate("same question").await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let transport = MockTransport::fixed(text_response("ok", FinishReason::Stop));
        let calls = transport.call_counter();
        let adapter = Arc::new(CompletionAdapter::new(&settings("key"), transport));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let adapter = adapter.clone();
                tokio::spawn(async move { adapter.generate(&format!("question {i}")).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), CompletionResult::Success("ok".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}
