use std::time::Duration;

use hnjobs_core::error::AppError;
use hnjobs_core::models::{FIELD_NAMES, JobFields};
use hnjobs_core::traits::FieldExtractor;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Placeholder replaced by the raw post text in the prompt template.
pub const JOB_TEXT_PLACEHOLDER: &str = "{job_text}";

pub const DEFAULT_PROMPT: &str = "Extract the following fields from this Hacker News job post as plain strings:\n\
- company\n\
- role\n\
- location\n\
- salary\n\
- contact\n\
- description\n\
Return a single flat JSON object with exactly these six keys and nothing else. \
Use null for any field that is missing. Do not use markdown, code fences, arrays, or commentary. \
If the contact email is obfuscated (for example \"jobs at acme dot com\"), write it as a normal address.\n\
Job post:\n\
\"\"\"{job_text}\"\"\"";

/// OpenAI-compatible chat client that extracts [`JobFields`] from a post.
///
/// One completion per post, no retries. Any transport, API or parse
/// failure degrades to [`JobFields::empty`] so the crawl keeps going.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
    prompt: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_LLM_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_LLM_TIMEOUT.as_secs(),
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, AppError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        self.timeout_secs = timeout.as_secs();
        Ok(self)
    }

    /// Replace the instruction template. It must contain `{job_text}`.
    pub fn with_prompt(mut self, template: impl Into<String>) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains(JOB_TEXT_PLACEHOLDER) {
            return Err(AppError::ConfigError(format!(
                "Prompt template must contain the {JOB_TEXT_PLACEHOLDER} placeholder"
            )));
        }
        self.prompt = template;
        Ok(self)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn render_prompt(&self, job_text: &str) -> String {
        self.prompt.replace(JOB_TEXT_PLACEHOLDER, job_text)
    }

    /// Run one chat completion and return the raw message content.
    async fn complete(&self, job_text: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: self.render_prompt(job_text),
            }],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            return Err(AppError::LlmError {
                message,
                status_code,
                retryable: status_code == 429 || status_code >= 500,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse LLM response: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from LLM".into(),
                status_code: 200,
                retryable: false,
            })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl FieldExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str) -> Result<JobFields, AppError> {
        match self.complete(text).await {
            Ok(content) => Ok(parse_fields(&content)),
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "LLM extraction degraded to empty record");
                Ok(JobFields::empty())
            }
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Turn a model reply into [`JobFields`].
///
/// Tries the whole reply as JSON, then the span from the first `{` to the
/// last `}`. Anything else yields the empty record. Keys outside
/// [`FIELD_NAMES`] are dropped.
pub fn parse_fields(content: &str) -> JobFields {
    let mut fields = JobFields::empty();

    let Some(object) = parse_object(content) else {
        tracing::warn!(
            preview = %content.chars().take(120).collect::<String>(),
            "LLM reply is not a JSON object"
        );
        return fields;
    };

    for (key, value) in object {
        match fields.slot_mut(&key) {
            Some(slot) => *slot = coerce(value),
            None => tracing::warn!(%key, "Dropping unexpected key from LLM reply"),
        }
    }

    fields
}

fn parse_object(content: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(content.trim()) {
        return Some(map);
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&content[start..=end]) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Models sometimes answer with numbers or lists; flatten those to text.
fn coerce(value: serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(coerce).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}
