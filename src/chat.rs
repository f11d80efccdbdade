use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::CHAT_REQUEST_TIMEOUT_SECONDS;
use crate::http_client::post_json;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct GroqChat {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl GroqChat {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.groq_base_url.clone(),
            api_key: cfg.groq_api_key.clone(),
            model: cfg.groq_model.clone(),
            timeout: Duration::from_secs(CHAT_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

#[async_trait]
impl ChatCompletion for GroqChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GROQ_API_KEY is not set");
        };
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };
        let response: CompletionResponse = post_json(&self.http, &url, self.timeout, api_key, &request)
            .await
            .context("Chat completion request failed")?;
        first_choice(response)
    }
}

fn first_choice(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("Chat completion returned no content"))
}

/// Ordered regex rewrites that make generated answers readable in the chat panel.
pub struct ResponseFormatter {
    rules: Vec<(Regex, &'static str)>,
}

impl ResponseFormatter {
    pub fn new() -> Result<Self> {
        let patterns: [(&str, &'static str); 6] = [
            (r"(\. )([A-Z])", ".\n\n$2"),
            (r"(?m)^[ \t]*[-*][ \t]+", "• "),
            (r"\b(\d{1,2}\.\s)", "\n$1"),
            (r"\n\s*\n\s*\n+", "\n\n"),
            (r"(?i)\b(important|warning|alert|caution|urgent)([:\s])", "**$1**$2"),
            (r"(?i)\b(should|must|avoid|recommended|advised)(\s+[^.]+\.)", "**$1**$2"),
        ];
        let rules = patterns
            .into_iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .map(|regex| (regex, replacement))
                    .with_context(|| format!("Failed to compile formatter rule {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn format(&self, text: &str) -> String {
        let mut formatted = text.to_string();
        for (regex, replacement) in &self.rules {
            formatted = regex.replace_all(&formatted, *replacement).into_owned();
        }
        formatted.trim().to_string()
    }
}
