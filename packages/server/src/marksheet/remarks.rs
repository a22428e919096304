//! Report-card remarks.
//!
//! Remarks are phrased by an external text-generation service when one is
//! configured. Any failure there (network error, non-2xx status, empty body or
//! time-out) falls back to a fixed phrase keyed on the overall grade, so the
//! pipeline always has a remark to store.

use std::time::Duration;

use async_trait::async_trait;
use common::Grade;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemarksConfig;

use super::aggregate::AggregateResult;

const SYSTEM_PROMPT: &str =
    "You are a kind, concise, and experienced school teacher providing feedback.";

/// Remark generation errors
#[derive(Debug, Error)]
pub enum RemarkError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// The service did not answer within the configured budget
    #[error("Remark request timed out after {0:?}")]
    Timeout(Duration),

    /// The service returned a non-success status
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// The response carried no usable text
    #[error("Empty remark in response")]
    EmptyResponse,
}

/// One subject line of the prompt.
#[derive(Clone, Debug, PartialEq)]
pub struct SubjectLine {
    pub name: String,
    pub obtained: f64,
    pub total: f64,
    pub grade: Grade,
}

/// Prompt material for one marksheet.
#[derive(Clone, Debug, PartialEq)]
pub struct RemarkRequest {
    pub student_name: String,
    pub subjects: Vec<SubjectLine>,
    pub overall_grade: Grade,
}

impl RemarkRequest {
    pub fn new(student_name: &str, result: &AggregateResult) -> Self {
        let student_name = if student_name.trim().is_empty() {
            "Unknown Student".to_string()
        } else {
            student_name.to_string()
        };
        Self {
            student_name,
            subjects: result
                .subjects
                .iter()
                .map(|s| SubjectLine {
                    name: s.subject_name.clone(),
                    obtained: s.marks_obtained,
                    total: s.total_marks,
                    grade: s.grade,
                })
                .collect(),
            overall_grade: result.overall_grade,
        }
    }

    pub fn prompt(&self) -> String {
        let lines: Vec<String> = self
            .subjects
            .iter()
            .map(|s| format!("• {}: {}/{} ({})", s.name, s.obtained, s.total, s.grade))
            .collect();
        format!(
            "You are a teacher writing brief report card feedback.\n\
             Analyze the student's performance based on subjects and grades.\n\n\
             Student: {}\n\n\
             Subjects and marks:\n{}\n\n\
             Write a short, 1-2 sentence remark focusing on strengths and improvement areas.\n\
             Keep it encouraging and personalized.",
            self.student_name,
            lines.join("\n")
        )
    }
}

/// Produces the free-text remark stored on a marksheet.
#[async_trait]
pub trait RemarkGenerator: Send + Sync {
    async fn generate(&self, request: &RemarkRequest) -> Result<String, RemarkError>;
}

/// Fixed phrase for a grade, used whenever generation is unavailable.
pub fn fallback_remark(grade: Grade) -> &'static str {
    match grade {
        Grade::APlus | Grade::A => "Excellent",
        Grade::B => "Very Good",
        Grade::C => "Good",
        Grade::D => "Fair",
        Grade::F => "Needs Improvement",
    }
}

/// Ask `generator` for a remark within `budget`, falling back to the grade
/// phrase on any failure. Never fails.
pub async fn synthesize(
    generator: &dyn RemarkGenerator,
    request: &RemarkRequest,
    budget: Duration,
) -> String {
    let outcome = match tokio::time::timeout(budget, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(RemarkError::Timeout(budget)),
    };

    match outcome {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!("Remark generation returned empty text, using fallback");
            fallback_remark(request.overall_grade).to_string()
        }
        Err(e) => {
            warn!(error = %e, "Remark generation failed, using fallback");
            fallback_remark(request.overall_grade).to_string()
        }
    }
}

/// Generator used when no text-generation service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackRemarks;

#[async_trait]
impl RemarkGenerator for FallbackRemarks {
    async fn generate(&self, request: &RemarkRequest) -> Result<String, RemarkError> {
        Ok(fallback_remark(request.overall_grade).to_string())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionRemarks {
    http_client: reqwest::Client,
    config: RemarksConfig,
}

impl ChatCompletionRemarks {
    pub fn new(config: RemarksConfig) -> Result<Self, RemarkError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemarkError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl RemarkGenerator for ChatCompletionRemarks {
    async fn generate(&self, request: &RemarkRequest) -> Result<String, RemarkError> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model, "Requesting remark");

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemarkError::Timeout(Duration::from_secs(self.config.timeout_secs))
                } else {
                    RemarkError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemarkError::Status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RemarkError::Network(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(RemarkError::EmptyResponse)
    }
}
