//! Car-care assistant backed by the Gemini `generateContent` REST API.

use crate::config::GeminiSettings;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Anything that can answer a chat message. Handlers only see this trait.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, message: &str) -> AppResult<String>;

    /// Model names the provider can serve; used by the health check.
    async fn list_models(&self) -> AppResult<Vec<String>>;
}

// ==================== WIRE FORMAT ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

pub fn build_request(message: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(message.to_string()),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 2048,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_MEDIUM_AND_ABOVE",
            })
            .collect(),
    }
}

/// Text of the first candidate; blocked or empty answers are an error.
pub fn extract_text(response: &GenerateContentResponse) -> AppResult<String> {
    let text: String = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Internal("Invalid response from Gemini".to_string()));
    }
    Ok(text)
}

pub fn status_error(status: StatusCode, detail: &str) -> AppError {
    match status.as_u16() {
        400 => AppError::BadRequest("Invalid request".to_string()),
        429 => AppError::RateLimited("Rate limit exceeded. Please try again later.".to_string()),
        500 => AppError::Internal("Internal server error. Please try again later.".to_string()),
        503 => AppError::Unavailable(
            "Service temporarily unavailable. Please try again later.".to_string(),
        ),
        _ => AppError::Internal(format!("Failed to get response: {} {}", status, detail)),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ==================== CLIENT ====================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> AppResult<Self> {
        if settings.api_key.is_none() {
            log::warn!("⚠️  GEMINI_API_KEY not set. Chat requests will return 503.");
        } else {
            log::info!("🤖 Gemini client ready (model: {})", settings.model);
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("Gemini API key not configured".to_string()))
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn chat(&self, message: &str) -> AppResult<String> {
        let key = self.api_key()?;
        let url = format!("{}/{}:generateContent", self.api_base, self.model_path());
        let body = build_request(message);

        let mut attempt = 1;
        loop {
            let outcome = self
                .http
                .post(&url)
                .query(&[("key", key)])
                .json(&body)
                .send()
                .await;

            match outcome {
                Ok(response) if response.status().is_success() => {
                    let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
                        AppError::Internal(format!("Failed to get response: {}", e))
                    })?;
                    return extract_text(&parsed);
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    if attempt < MAX_ATTEMPTS && is_retryable(status) {
                        log::warn!(
                            "⚠️  Gemini returned {} (attempt {}/{}), retrying",
                            status,
                            attempt,
                            MAX_ATTEMPTS
                        );
                    } else {
                        log::error!("❌ Gemini returned {}: {}", status, detail);
                        return Err(status_error(status, &detail));
                    }
                }
                Err(e) => {
                    if attempt < MAX_ATTEMPTS {
                        log::warn!(
                            "⚠️  Gemini request failed (attempt {}/{}): {}",
                            attempt,
                            MAX_ATTEMPTS,
                            e
                        );
                    } else {
                        log::error!("❌ Gemini request failed: {}", e);
                        return Err(AppError::Internal(format!("Failed to get response: {}", e)));
                    }
                }
            }

            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            attempt += 1;
        }
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        let key = self.api_key()?;
        let url = format!("{}/models", self.api_base);

        let response = self.http.get(&url).query(&[("key", key)]).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        let list: ModelList = response.json().await?;
        Ok(list
            .models
            .into_iter()
            .map(|m| m.name)
            .filter(|name| name.to_lowercase().contains("gemini"))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn request_carries_generation_and_safety_settings() {
        let json = serde_json::to_value(build_request("When should I rotate my tires?")).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "When should I rotate my tires?");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);

        let safety = json["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety
            .iter()
            .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[test]
    fn joins_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Every " }, { "text": "5,000 miles." }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(&response).unwrap(), "Every 5,000 miles.");
    }

    #[test]
    fn blocked_answer_is_invalid() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = extract_text(&response).unwrap_err();
        assert_eq!(err.to_string(), "Invalid response from Gemini");

        assert!(extract_text(&GenerateContentResponse::default()).is_err());
    }

    #[test]
    fn upstream_statuses_map_to_client_errors() {
        use actix_web::ResponseError;

        let cases = [
            (StatusCode::BAD_REQUEST, 400),
            (StatusCode::TOO_MANY_REQUESTS, 429),
            (StatusCode::INTERNAL_SERVER_ERROR, 500),
            (StatusCode::SERVICE_UNAVAILABLE, 503),
            (StatusCode::FORBIDDEN, 500),
        ];
        for (upstream, expected) in cases {
            assert_eq!(status_error(upstream, "").status_code().as_u16(), expected);
        }
        assert_eq!(status_error(StatusCode::BAD_REQUEST, "").to_string(), "Invalid request");
        assert!(status_error(StatusCode::FORBIDDEN, "denied")
            .to_string()
            .starts_with("Failed to get response"));
    }

    #[test]
    fn only_throttling_and_server_errors_retry() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let client = GeminiClient::new(&Settings::for_tests().gemini).unwrap();
        assert!(matches!(client.chat("hi").await, Err(AppError::Unavailable(_))));
        assert!(matches!(client.list_models().await, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn unreachable_upstream_fails_after_retries() {
        let mut settings = Settings::for_tests().gemini;
        settings.api_key = Some("test-key".into());
        let client = GeminiClient::new(&settings).unwrap();

        let err = client.chat("hi").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to get response"));
    }

    #[test]
    fn model_path_accepts_both_forms() {
        let mut settings = Settings::for_tests().gemini;
        let client = GeminiClient::new(&settings).unwrap();
        assert_eq!(client.model_path(), "models/gemini-1.5-pro");

        settings.model = "models/gemini-1.5-flash".into();
        let client = GeminiClient::new(&settings).unwrap();
        assert_eq!(client.model_path(), "models/gemini-1.5-flash");
    }
}
