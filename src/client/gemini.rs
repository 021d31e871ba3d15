use std::fmt::Write as FmtWrite;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AnswerRequest, AnswerSynthesizer, ImageSummarizer};
use crate::error::UpstreamError;
use crate::models::{GeminiConfig, ImageInput};

const SUMMARY_PROMPT: &str = "You are an expert at analyzing images and charts. \
Provide a detailed, objective summary of the contents of this image. \
Describe the key elements, data points, and overall conclusion the image conveys.";

const ANSWER_PROMPT: &str = "You are an expert analyst. Answer the user's question based ONLY \
on the following context. If the context does not contain the answer, state that you don't know.";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, api_key: Option<String>) -> Result<Self, UpstreamError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(UpstreamError::MissingApiKey)?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.trim().to_string(),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate(&self, parts: Vec<Part<'_>>) -> Result<String, UpstreamError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.timeout)
                } else {
                    UpstreamError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        parsed.into_text()
    }
}

#[async_trait]
impl ImageSummarizer for GeminiClient {
    async fn summarize(&self, image: &ImageInput) -> Result<String, UpstreamError> {
        tracing::debug!(model = %self.model, bytes = image.len(), "summarizing image");
        self.generate(vec![Part::text(SUMMARY_PROMPT), Part::image(image)])
            .await
    }
}

#[async_trait]
impl AnswerSynthesizer for GeminiClient {
    async fn answer(&self, request: AnswerRequest<'_>) -> Result<String, UpstreamError> {
        tracing::debug!(
            model = %self.model,
            context_chunks = request.context.len(),
            with_image = request.image.is_some(),
            "requesting answer"
        );
        self.generate(answer_parts(&request)).await
    }
}

/// Prompt parts for an answer: instructions and retrieved chunks, the
/// original image between markers when present, then the question.
fn answer_parts<'a>(request: &AnswerRequest<'a>) -> Vec<Part<'a>> {
    let mut context = String::from(ANSWER_PROMPT);
    context.push_str("\n--- CONTEXT START ---\n");
    for hit in request.context {
        let _ = writeln!(context, "[{}]\n{}\n", hit.chunk.location(), hit.chunk.text);
    }

    let mut parts = vec![Part::text(context)];
    if let Some(image) = request.image {
        parts.push(Part::text("\n[Image context below]\n"));
        parts.push(Part::image(image));
        parts.push(Part::text("\n[End of image context]\n"));
    }
    parts.push(Part::text(format!(
        "\n--- CONTEXT END ---\n\nQuestion: {}\n\nAnswer:",
        request.question
    )));
    parts
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: std::borrow::Cow<'a, str>,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

impl<'a> Part<'a> {
    fn text(text: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Part::Text { text: text.into() }
    }

    fn image(image: &'a ImageInput) -> Self {
        Part::Inline {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: STANDARD.encode(&image.bytes),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
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
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, UpstreamError> {
        let text: String = self
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if !text.trim().is_empty() {
            return Ok(text);
        }

        let reason = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("blocked: {}", r))
            .unwrap_or_else(|| "response contained no text".to_string());
        Err(UpstreamError::InvalidResponse(reason))
    }
}
