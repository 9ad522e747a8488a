//! Generative-AI client abstraction
//!
//! Provides a unified interface over text-generation providers:
//! - Google Gemini (`generateContent` REST endpoint)
//! - Mock generator for tests and offline runs

use crate::config::AiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Trait for prompt completion
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Complete a prompt, returning the raw model text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AppError::AiError {
                message: format!("Prompt blocked: {}", reason),
            });
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| AppError::AiError {
            message: "Empty response: no candidates".to_string(),
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::AiError {
                message: "Empty response text".to_string(),
            });
        }
        Ok(text)
    }
}

impl GeminiClient {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    async fn make_request(&self, prompt: &str) -> std::result::Result<String, backoff::Error<AppError>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    backoff::Error::transient(AppError::AiTimeout {
                        timeout_secs: self.timeout_secs,
                    })
                } else {
                    // Error text must not carry the request URL
                    backoff::Error::transient(AppError::AiError {
                        message: format!("Request failed: {}", e.without_url()),
                    })
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::AiError {
                message: format!("API error {}: {}", status, body),
            };
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::AiError {
                message: format!("Failed to parse response: {}", e.without_url()),
            })
        })?;

        parsed.into_text().map_err(backoff::Error::permanent)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(4))
            .with_max_elapsed_time(Some(Duration::from_secs(self.timeout_secs)))
            .build();

        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result = backoff::future::retry(policy, || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            match self.make_request(prompt).await {
                Ok(text) => Ok(text),
                Err(backoff::Error::Transient { err, .. }) if attempt < self.max_retries => {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %err,
                        "Generation request failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err(backoff::Error::Transient { err, .. }) => Err(backoff::Error::permanent(err)),
                Err(permanent) => Err(permanent),
            }
        })
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::record_ai_request(&self.model, outcome, start.elapsed());
        debug!(model = %self.model, outcome, attempts = attempts.load(Ordering::SeqCst), "Generation finished");

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Canned analysis used by the mock generator
pub const MOCK_ANALYSIS_JSON: &str = r#"{
  "summary": "Mutual non-disclosure agreement between two companies.",
  "risks": [
    {"risk": "Broad definition of confidential information", "explanation": "Covers oral disclosures without marking.", "severity": "high"},
    {"risk": "No return-of-materials deadline", "explanation": "Materials may be retained indefinitely.", "severity": "low"}
  ],
  "opportunities": [
    {"opportunity": "Mutual obligations", "explanation": "Both parties are equally bound.", "impact": "medium"}
  ],
  "recommendations": ["Narrow the confidentiality definition"],
  "keyClauses": ["Definition of Confidential Information", "Term"],
  "legalCompliance": "No obvious compliance issues.",
  "negotiationPoints": ["Shorten the survival period"],
  "contractDuration": "2 years",
  "terminationConditions": "Either party with 30 days notice.",
  "overallScore": 72,
  "financialTerms": {"description": "No payments", "details": []},
  "performanceMetrics": [],
  "specificClauses": "Governing law: Delaware."
}"#;

/// Mock generator for testing
pub struct MockGenerator {
    scripted: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Answers detection prompts with a contract type and analysis prompts with a fenced report
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order; falls back to canned output once exhausted
    pub fn scripted(replies: Vec<Result<String>>) -> Self {
        Self {
            scripted: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.scripted.lock().ok().and_then(|mut q| q.pop_front());
        if let Some(reply) = next {
            return reply;
        }

        if prompt.contains("JSON") {
            Ok(format!("```json\n{}\n```", MOCK_ANALYSIS_JSON))
        } else {
            Ok("Non-Disclosure Agreement".to_string())
        }
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &AiConfig) -> Result<Arc<dyn ContentGenerator>> {
    match (config.provider.as_str(), config.api_key.clone()) {
        ("gemini", Some(key)) if !key.trim().is_empty() => {
            Ok(Arc::new(GeminiClient::new(config, key)?))
        }
        ("gemini", _) => {
            warn!("No AI API key configured, using mock generator");
            Ok(Arc::new(MockGenerator::new()))
        }
        ("mock", _) => Ok(Arc::new(MockGenerator::new())),
        (other, _) => {
            warn!(provider = other, "Unknown AI provider, using mock");
            Ok(Arc::new(MockGenerator::new()))
        }
    }
}
