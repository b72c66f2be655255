//! Translation model client.
//!
//! [`ChatModel`] is the seam between the translators and the language model:
//! one system prompt and one user prompt in, the assistant's text out. The
//! production implementation talks to any OpenAI-compatible chat completions
//! endpoint (OpenAI itself, vLLM, ...).

use crate::config::Config;
use crate::error::TranslateError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A request/response language model.
pub trait ChatModel {
    /// Return the model's reply, with any reasoning preamble removed.
    fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> impl Future<Output = Result<String>>;
}

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl ChatModel for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .context("Failed to send translation request to the model API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Model API error during translation ({}): {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse model API response")?;

        let raw = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Model API response contained no choices")?;

        let content = strip_reasoning(&raw);
        if content.is_empty() {
            return Err(TranslateError::EmptyResponse.into());
        }
        Ok(content.to_string())
    }
}

/// Drop everything up to a closing `</think>` tag and trim the rest.
pub fn strip_reasoning(raw: &str) -> &str {
    const THINK_END: &str = "</think>";
    match raw.find(THINK_END) {
        Some(index) => raw[index + THINK_END.len()..].trim(),
        None => raw.trim(),
    }
}
