//! OpenAI API provider implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use edutest_core::model::{GeneratedTest, TestRequest};
use edutest_core::parser::parse_generated_payload;
use edutest_core::traits::{FeedbackRequest, FeedbackRequester, TestGenerator};
use edutest_core::ServiceError;

use crate::error::{check_status, read_json, transport_error};
use crate::prompt::{feedback_prompt, test_generation_prompt, SYSTEM_PROMPT};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible chat completions provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    model: String,
    feedback_model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            model: DEFAULT_MODEL.to_string(),
            feedback_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self.feedback_model = model.to_string();
        self
    }

    pub fn with_feedback_model(mut self, model: &str) -> Self {
        self.feedback_model = model.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self.client = build_client(timeout_secs);
        self
    }

    async fn complete(&self, body: &OpenAiRequest) -> Result<String, ServiceError> {
        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        let response = check_status(response).await?;
        let api_response: OpenAiResponse = read_json(response).await?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(content)
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiRequest {
    fn new(model: &str, prompt: String, json_mode: bool) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[async_trait]
impl TestGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model, grade = request.grade))]
    async fn generate_test(&self, request: &TestRequest) -> Result<GeneratedTest, ServiceError> {
        let start = Instant::now();
        let body = OpenAiRequest::new(&self.model, test_generation_prompt(request), true);
        let content = self.complete(&body).await?;
        let payload = parse_generated_payload(&content)?;
        tracing::info!(
            questions = payload.questions.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "test generated"
        );
        Ok(payload)
    }
}

#[async_trait]
impl FeedbackRequester for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.feedback_model, score = request.score))]
    async fn request_feedback(&self, request: &FeedbackRequest) -> Result<String, ServiceError> {
        let body = OpenAiRequest::new(&self.feedback_model, feedback_prompt(request), false);
        let content = self.complete(&body).await?;
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutest_core::model::Answers;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 30, "total_tokens": 80}
        })
    }

    fn feedback_request() -> FeedbackRequest {
        FeedbackRequest {
            score: 4.0,
            answers: Answers::new(),
            questions: vec![],
        }
    }

    #[tokio::test]
    async fn generation_requests_json_mode() {
        let server = MockServer::start().await;
        let payload = json!({
            "title": "Hobbies",
            "questions": [{
                "id": "1",
                "type": "Stress",
                "difficulty": "application",
                "content": "Pick the odd one out.",
                "options": {"A": "hobby", "B": "collect", "C": "garden", "D": "climbing"},
                "correctAnswer": "B",
                "explanation": "collect is stressed on the second syllable"
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("OpenAI-Organization", "org-1"))
            .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&payload.to_string())))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", Some(server.uri()), Some("org-1".into()));
        let generated = provider
            .generate_test(&TestRequest::default())
            .await
            .unwrap();
        assert_eq!(generated.title, "Hobbies");
        assert_eq!(generated.questions[0].correct_answer, "B");
    }

    #[tokio::test]
    async fn feedback_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Keep practising.\n")))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).with_model("gpt-4o");
        let text = provider.request_feedback(&feedback_request()).await.unwrap();
        assert_eq!(text, "Keep practising.");
    }

    #[tokio::test]
    async fn missing_content_is_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None);
        let err = provider.request_feedback(&feedback_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyResponse));
    }

    #[tokio::test]
    async fn unknown_model_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model gpt-9 does not exist"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).with_model("gpt-9");
        let err = provider
            .generate_test(&TestRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None);
        let err = provider.request_feedback(&feedback_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }
}
