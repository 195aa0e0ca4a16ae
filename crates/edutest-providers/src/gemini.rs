//! Google Gemini API provider implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use edutest_core::model::{GeneratedTest, TestRequest};
use edutest_core::parser::parse_generated_payload;
use edutest_core::traits::{FeedbackRequest, FeedbackRequester, TestGenerator};
use edutest_core::ServiceError;

use crate::error::{check_status, read_json, transport_error};
use crate::prompt::{feedback_prompt, test_generation_prompt, SYSTEM_PROMPT};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
    feedback_model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: DEFAULT_MODEL.to_string(),
            feedback_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use `model` for both generation and feedback.
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

    async fn generate_content(&self, model: &str, body: &GeminiRequest) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let response = check_status(response).await?;
        let api_response: GeminiResponse = read_json(response).await?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(text)
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
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    // Absent when the candidate was blocked
    #[serde(default)]
    content: GeminiCandidateContent,
}

#[derive(Deserialize, Default)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiRequest {
    fn new(prompt: String, generation_config: Option<serde_json::Value>) -> Self {
        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config,
        }
    }
}

/// JSON-mode config constraining the reply to the test payload shape.
fn test_payload_config() -> serde_json::Value {
    let option_props = json!({
        "A": {"type": "STRING"},
        "B": {"type": "STRING"},
        "C": {"type": "STRING"},
        "D": {"type": "STRING"}
    });
    json!({
        "responseMimeType": "application/json",
        "responseSchema": {
            "type": "OBJECT",
            "properties": {
                "title": {"type": "STRING"},
                "questions": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "id": {"type": "STRING"},
                            "type": {"type": "STRING"},
                            "difficulty": {"type": "STRING"},
                            "content": {"type": "STRING"},
                            "passage": {"type": "STRING"},
                            "options": {
                                "type": "OBJECT",
                                "properties": option_props,
                                "required": ["A", "B", "C", "D"]
                            },
                            "correctAnswer": {"type": "STRING"},
                            "explanation": {"type": "STRING"}
                        },
                        "required": ["id", "type", "difficulty", "content", "options", "correctAnswer", "explanation"]
                    }
                }
            },
            "required": ["title", "questions"]
        }
    })
}

#[async_trait]
impl TestGenerator for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %self.model, grade = request.grade))]
    async fn generate_test(&self, request: &TestRequest) -> Result<GeneratedTest, ServiceError> {
        let start = Instant::now();
        let body = GeminiRequest::new(test_generation_prompt(request), Some(test_payload_config()));
        let text = self.generate_content(&self.model, &body).await?;
        let payload = parse_generated_payload(&text)?;
        tracing::info!(
            questions = payload.questions.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "test generated"
        );
        Ok(payload)
    }
}

#[async_trait]
impl FeedbackRequester for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %self.feedback_model, score = request.score))]
    async fn request_feedback(&self, request: &FeedbackRequest) -> Result<String, ServiceError> {
        let body = GeminiRequest::new(feedback_prompt(request), None);
        let text = self.generate_content(&self.feedback_model, &body).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutest_core::model::Answers;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 80}
        })
    }

    fn payload_text() -> String {
        json!({
            "title": "Unit 1 test",
            "questions": [{
                "id": "q1",
                "type": "Pronunciation",
                "difficulty": "Nhận biết",
                "content": "Choose the odd one out.",
                "options": {"A": "school", "B": "chair", "C": "teacher", "D": "lunch"},
                "correctAnswer": "A",
                "explanation": "/k/"
            }]
        })
        .to_string()
    }

    fn feedback_request() -> FeedbackRequest {
        FeedbackRequest {
            score: 7.5,
            answers: Answers::new(),
            questions: vec![],
        }
    }

    #[tokio::test]
    async fn generates_test_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(&payload_text())))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", Some(server.uri()));
        let payload = provider
            .generate_test(&TestRequest::default())
            .await
            .unwrap();
        assert_eq!(payload.title, "Unit 1 test");
        assert_eq!(payload.questions.len(), 1);
        assert_eq!(payload.questions[0].correct_answer, "A");
    }

    #[tokio::test]
    async fn feedback_uses_feedback_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-lite:generateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(reply("  Solid grammar; revise stress.  ")),
            )
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", Some(server.uri())).with_feedback_model("gemini-lite");
        let text = provider.request_feedback(&feedback_request()).await.unwrap();
        assert_eq!(text, "Solid grammar; revise stress.");
    }

    #[tokio::test]
    async fn unparseable_payload_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Sorry, I can't help.")))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", Some(server.uri()));
        let err = provider
            .generate_test(&TestRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_candidates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", Some(server.uri()));
        let err = provider.request_feedback(&feedback_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyResponse));
    }

    #[tokio::test]
    async fn blocked_candidate_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("key", Some(server.uri()));
        let err = provider.request_feedback(&feedback_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyResponse));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/quota:generateContent"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/locked:generateContent"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/broken:generateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let base = Some(server.uri());
        let err = GeminiProvider::new("key", base.clone())
            .with_model("quota")
            .request_feedback(&feedback_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { retry_after_ms: 30_000 }));

        let err = GeminiProvider::new("key", base.clone())
            .with_model("locked")
            .request_feedback(&feedback_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthenticationFailed(ref body) if body.contains("not valid")));
        assert!(err.is_permanent());

        let err = GeminiProvider::new("key", base)
            .with_model("broken")
            .request_feedback(&feedback_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let provider = GeminiProvider::new("key", Some("http://127.0.0.1:9".into())).with_timeout(5);
        let err = provider.request_feedback(&feedback_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Network(_) | ServiceError::Timeout(5)));
    }
}
