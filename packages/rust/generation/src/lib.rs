//! Text-generation service contract and the tasks built on it.
//!
//! The pipeline only ever talks to a [`Generator`]: one system prompt, one
//! user message, one reply. [`ChatClient`] implements it against any
//! OpenAI-compatible chat completions endpoint; tests substitute fakes.

mod client;
pub mod prompts;
mod tasks;

use async_trait::async_trait;

use wikiforge_shared::{Model, Result};

pub use client::ChatClient;
pub use tasks::{FALLBACK_CATEGORY, classify, generate_outline, pick_icon, write_section};

/// One generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// User message: the thing to write about.
    pub subject: String,
    /// System instructions.
    pub instructions: String,
    /// Extra context appended to the instructions, if any.
    pub context: Option<String>,
}

impl Prompt {
    pub fn new(subject: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            instructions: instructions.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// System message sent to the service: instructions followed by context.
    pub fn system_message(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{}{}", self.instructions, ctx),
            None => self.instructions.clone(),
        }
    }
}

/// Black-box text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to `prompt` using `model`.
    async fn generate(&self, prompt: &Prompt, model: &Model) -> Result<String>;
}
