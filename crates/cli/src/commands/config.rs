use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use shopchat_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, CONFIG_FAILURE_EXIT};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                error.to_string(),
                CONFIG_FAILURE_EXIT,
            )
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let api_key = config
        .llm
        .api_key()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        let source = field_source(
            key,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key, &value, source));
    };

    push("llm.provider", format!("{:?}", config.llm.provider), &["SHOPCHAT_LLM_PROVIDER"]);
    push("llm.model", config.llm.model.clone(), &["SHOPCHAT_LLM_MODEL", "GEMINI_MODEL"]);
    push("llm.base_url", config.llm.effective_base_url().to_string(), &["SHOPCHAT_LLM_BASE_URL"]);
    push("llm.api_key", api_key, &["SHOPCHAT_LLM_API_KEY", "GEMINI_API_KEY"]);
    push("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["SHOPCHAT_LLM_TIMEOUT_SECS"]);
    push(
        "server.bind_address",
        config.server.bind_address.clone(),
        &["SHOPCHAT_SERVER_BIND_ADDRESS"],
    );
    push("server.port", config.server.port.to_string(), &["SHOPCHAT_SERVER_PORT", "PORT"]);
    push(
        "server.request_timeout_secs",
        config.server.request_timeout_secs.to_string(),
        &["SHOPCHAT_SERVER_REQUEST_TIMEOUT_SECS"],
    );
    push(
        "server.graceful_shutdown_secs",
        config.server.graceful_shutdown_secs.to_string(),
        &["SHOPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );
    push("catalog.enabled", config.catalog.enabled.to_string(), &["SHOPCHAT_CATALOG_ENABLED"]);
    push("catalog.path", config.catalog.path.display().to_string(), &["SHOPCHAT_CATALOG_PATH"]);
    push("catalog.refresh", format!("{:?}", config.catalog.refresh), &["SHOPCHAT_CATALOG_REFRESH"]);
    push("shop.name", config.shop.name.clone(), &["SHOPCHAT_SHOP_NAME"]);
    push(
        "shop.whatsapp_number",
        config.shop.whatsapp_number.clone().unwrap_or_else(|| "<unset>".to_string()),
        &["SHOPCHAT_SHOP_WHATSAPP_NUMBER", "MY_PHONE_NUMBER"],
    );
    push(
        "logging.level",
        config.logging.level.clone(),
        &["SHOPCHAT_LOGGING_LEVEL", "SHOPCHAT_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format),
        &["SHOPCHAT_LOGGING_FORMAT", "SHOPCHAT_LOG_FORMAT"],
    );

    CommandResult::plain(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) =
        env_keys.iter().find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short prefix so operators can tell keys apart without exposing them.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }
    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}
