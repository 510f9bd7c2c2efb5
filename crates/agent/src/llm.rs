use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use shopchat_core::config::{LlmConfig, LlmProvider};
use tracing::{debug, warn};

const ERROR_BODY_PREVIEW_CHARS: usize = 300;

/// Single-shot text completion: one prompt in, one reply out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Non-streaming HTTP client for the supported providers.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

/// Builds the configured model client, or `None` when the provider needs an
/// API key and none was supplied.
pub fn build_llm_client(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    if !config.has_credentials() {
        warn!(
            event_name = "system.llm.not_loaded",
            provider = ?config.provider,
            model = %config.model,
            "no api key configured; chat requests will report the model as not loaded"
        );
        return Ok(None);
    }

    let client = HttpLlmClient::new(config)?;
    Ok(Some(Arc::new(client)))
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for the language model")?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.effective_base_url().to_string(),
            model: config.model.trim().to_string(),
            api_key: config.api_key().cloned(),
        })
    }

    pub fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::Gemini => format!("{}/models/{}:generateContent", self.base_url, self.model),
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Ollama => format!("{}/api/generate", self.base_url),
        }
    }

    pub fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::Gemini => json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }),
            LlmProvider::OpenAi => json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }]
            }),
            LlmProvider::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false
            }),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(prompt));
        if let Some(api_key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Gemini => request.header("x-goog-api-key", api_key.expose_secret()),
                LlmProvider::OpenAi | LlmProvider::Ollama => {
                    request.bearer_auth(api_key.expose_secret())
                }
            };
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{:?} request to `{}` failed", self.provider, self.model))?;
        let status = response.status();
        let body = response.text().await.context("failed to read model response body")?;

        if !status.is_success() {
            bail!("{:?} returned HTTP {status}: {}", self.provider, preview(&body));
        }

        let payload: Value =
            serde_json::from_str(&body).context("model response was not valid JSON")?;
        let text = extract_completion(self.provider, &payload)?;
        debug!(
            event_name = "llm.completion.received",
            provider = ?self.provider,
            model = %self.model,
            reply_chars = text.chars().count(),
            "model completion received"
        );
        Ok(text)
    }
}

/// Pulls the reply text out of a provider response payload.
pub fn extract_completion(provider: LlmProvider, payload: &Value) -> Result<String> {
    match provider {
        LlmProvider::Gemini => {
            let parts = payload["candidates"][0]["content"]["parts"].as_array();
            let text: String = parts
                .into_iter()
                .flatten()
                .filter(|part| !part["thought"].as_bool().unwrap_or(false))
                .filter_map(|part| part["text"].as_str())
                .collect();
            if text.is_empty() {
                let reason = payload["promptFeedback"]["blockReason"]
                    .as_str()
                    .or_else(|| payload["candidates"][0]["finishReason"].as_str())
                    .unwrap_or("no candidates");
                bail!("gemini returned no text ({reason})");
            }
            Ok(text)
        }
        LlmProvider::OpenAi => payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("openai response had no message content")),
        LlmProvider::Ollama => payload["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("ollama response had no `response` field")),
    }
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shopchat_core::config::{AppConfig, LlmConfig, LlmProvider};

    use super::{build_llm_client, extract_completion, preview, HttpLlmClient};

    fn llm_config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        let mut config = AppConfig::default().llm;
        config.provider = provider;
        config.api_key = api_key.map(|key| key.to_string().into());
        config
    }

    #[test]
    fn missing_api_key_leaves_model_unloaded() {
        let client = build_llm_client(&llm_config(LlmProvider::Gemini, None)).expect("build");
        assert!(client.is_none());

        let blank = build_llm_client(&llm_config(LlmProvider::OpenAi, Some("  "))).expect("build");
        assert!(blank.is_none());
    }

    #[test]
    fn ollama_loads_without_api_key() {
        let client = build_llm_client(&llm_config(LlmProvider::Ollama, None)).expect("build");
        assert!(client.is_some());
    }

    #[test]
    fn gemini_request_targets_generate_content() {
        let client =
            HttpLlmClient::new(&llm_config(LlmProvider::Gemini, Some("key"))).expect("client");

        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client.request_body("hello"),
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }] })
        );
    }

    #[test]
    fn custom_base_url_drops_trailing_slash() {
        let mut config = llm_config(LlmProvider::OpenAi, Some("key"));
        config.base_url = Some("http://localhost:8080/v1/".to_string());
        config.model = "gpt-4o-mini".to_string();
        let client = HttpLlmClient::new(&config).expect("client");

        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.request_body("hi")["model"], "gpt-4o-mini");
        assert_eq!(client.request_body("hi")["messages"][0]["content"], "hi");
    }

    #[test]
    fn ollama_request_disables_streaming() {
        let client = HttpLlmClient::new(&llm_config(LlmProvider::Ollama, None)).expect("client");

        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
        assert_eq!(client.request_body("hi")["stream"], false);
    }

    #[test]
    fn gemini_parts_are_concatenated_and_thoughts_skipped() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "ORDER_CONFIRMED: " },
                    { "text": "1 Red Shoe" }
                ]}
            }]
        });

        let text = extract_completion(LlmProvider::Gemini, &payload).expect("text");
        assert_eq!(text, "ORDER_CONFIRMED: 1 Red Shoe");
    }

    #[test]
    fn blocked_gemini_prompt_is_an_error() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });

        let error = extract_completion(LlmProvider::Gemini, &payload).expect_err("blocked");
        assert!(error.to_string().contains("SAFETY"));
    }

    #[test]
    fn openai_and_ollama_payloads_are_parsed() {
        let openai = json!({ "choices": [{ "message": { "content": "We sell shoes." } }] });
        let ollama = json!({ "response": "We sell shirts." });

        assert_eq!(extract_completion(LlmProvider::OpenAi, &openai).expect("openai"), "We sell shoes.");
        assert_eq!(extract_completion(LlmProvider::Ollama, &ollama).expect("ollama"), "We sell shirts.");
        assert!(extract_completion(LlmProvider::OpenAi, &json!({})).is_err());
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1_000);
        let shortened = preview(&body);

        assert_eq!(shortened.chars().count(), 301);
        assert!(shortened.ends_with('…'));
        assert_eq!(preview("  short  "), "short");
    }
}
