//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use wikiforge_shared::{Model, Result, WikiForgeError};

use crate::{Generator, Prompt};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("WikiForge/", env!("CARGO_PKG_VERSION"));

/// Longest error body excerpt carried into an error message.
const ERROR_EXCERPT_LEN: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// [`Generator`] backed by `POST {base_url}/chat/completions`.
///
/// The bearer credential comes from the [`Model`] passed on each call, so a
/// single client serves every phase of a run.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WikiForgeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Generator for ChatClient {
    #[instrument(skip_all, fields(model = %model.name))]
    async fn generate(&self, prompt: &Prompt, model: &Model) -> Result<String> {
        let system = prompt.system_message();
        let request = ChatRequest {
            model: &model.name,
            temperature: model.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.subject,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&model.key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WikiForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_EXCERPT_LEN).collect();
            return Err(WikiForgeError::Generation(format!(
                "HTTP {status}: {excerpt}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| WikiForgeError::Generation(format!("invalid response body: {e}")))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| WikiForgeError::Generation("response contained no choices".into()))?;

        debug!(chars = reply.len(), "completion received");
        Ok(reply)
    }
}
