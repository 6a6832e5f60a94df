/// LLM Client: the single point of entry for all text-completion calls in reportgen.
///
/// CV extraction and report translation both go through this module; no other
/// module talks to the completion API directly. Each caller picks a
/// [`CallProfile`], which fixes sampling, output length and how hard to retry.
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP: Duration = Duration::from_secs(8);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Connection settings shared by every call.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub extract_max_tokens: u32,
}

impl LlmSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.anthropic_api_key.clone(),
            model: config.llm_model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            extract_max_tokens: config.extract_max_tokens,
        }
    }
}

/// Sampling and retry policy for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallProfile {
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
}

impl CallProfile {
    /// A whole CV transcribed into the candidate schema. Deterministic, long output,
    /// most attempts.
    pub fn extraction(max_tokens: u32) -> Self {
        Self {
            temperature: 0.0,
            max_tokens,
            max_attempts: 4,
        }
    }

    /// A single field. The caller keeps the original text on failure.
    pub const TRANSLATION: Self = Self {
        temperature: 0.2,
        max_tokens: 1024,
        max_attempts: 2,
    };
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// All text blocks joined, trimmed.
    fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Result of a single HTTP attempt.
enum Attempt {
    Reply(MessagesResponse),
    Retry { error: LlmError, wait: Option<Duration> },
    Fail(LlmError),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before attempt `attempt` (1-based retries): 0.5s, 1s, 2s, ... capped.
fn backoff(attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(6);
    Duration::from_millis(BACKOFF_BASE_MS * factor).min(BACKOFF_CAP)
}

/// Whole seconds from a `Retry-After` header, capped like the backoff.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs).min(BACKOFF_CAP))
}

fn api_error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// The single LLM client used by extraction and translation.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(settings.timeout).build()?,
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn extraction_profile(&self) -> CallProfile {
        CallProfile::extraction(self.settings.extract_max_tokens)
    }

    async fn attempt(&self, request: &MessagesRequest<'_>) -> Attempt {
        let response = match self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() || e.is_connect() => {
                return Attempt::Retry {
                    error: LlmError::Http(e),
                    wait: None,
                }
            }
            Err(e) => return Attempt::Fail(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessagesResponse>().await {
                Ok(reply) => Attempt::Reply(reply),
                Err(e) => Attempt::Fail(LlmError::Http(e)),
            };
        }

        let wait = retry_after(response.headers());
        let message = api_error_message(response.text().await.unwrap_or_default());
        let error = LlmError::Api {
            status: status.as_u16(),
            message,
        };
        if is_retryable(status) {
            warn!("LLM API returned {status}: {error}");
            Attempt::Retry { error, wait }
        } else {
            Attempt::Fail(error)
        }
    }

    /// Sends one prompt and returns the reply text, retrying rate limits, server
    /// errors and timeouts up to `profile.max_attempts` times.
    pub async fn call_text(
        &self,
        prompt: &str,
        system: &str,
        profile: CallProfile,
    ) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let attempts = profile.max_attempts.max(1);
        let mut last_error: Option<(LlmError, Option<Duration>)> = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = last_error
                    .as_ref()
                    .and_then(|(_, wait)| *wait)
                    .unwrap_or_else(|| backoff(attempt));
                debug!("Retrying LLM call in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&request).await {
                Attempt::Reply(reply) => {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        reply.usage.input_tokens, reply.usage.output_tokens
                    );
                    if reply.stop_reason.as_deref() == Some("max_tokens") {
                        warn!(
                            "LLM reply hit the {} token limit and may be truncated",
                            profile.max_tokens
                        );
                    }
                    let text = reply.joined_text();
                    return if text.is_empty() {
                        Err(LlmError::EmptyContent)
                    } else {
                        Ok(text)
                    };
                }
                Attempt::Retry { error, wait } => last_error = Some((error, wait)),
                Attempt::Fail(error) => return Err(error),
            }
        }

        Err(match last_error {
            Some((last, _)) => LlmError::Exhausted {
                attempts,
                last: Box::new(last),
            },
            None => LlmError::EmptyContent,
        })
    }
}

/// Parses a model reply as JSON, tolerating markdown fences and prose around the object.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => {
            // Models occasionally prepend a sentence; retry on the outermost braces.
            let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                return Err(LlmError::Parse(first));
            };
            if start >= end {
                return Err(LlmError::Parse(first));
            }
            serde_json::from_str(&text[start..=end]).map_err(|_| LlmError::Parse(first))
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}
