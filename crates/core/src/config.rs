use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::RefreshStrategy;
use crate::deeplink::is_valid_contact;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub shop: ShopConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub refresh: RefreshStrategy,
}

#[derive(Clone, Debug)]
pub struct ShopConfig {
    pub name: String,
    pub whatsapp_number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub catalog_enabled: Option<bool>,
    pub catalog_path: Option<PathBuf>,
    pub catalog_refresh: Option<RefreshStrategy>,
    pub whatsapp_number: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.0-flash".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 10000,
                request_timeout_secs: 60,
                graceful_shutdown_secs: 15,
            },
            catalog: CatalogConfig {
                enabled: true,
                path: PathBuf::from("products.xlsx"),
                refresh: RefreshStrategy::Startup,
            },
            shop: ShopConfig { name: "My Shop".to_string(), whatsapp_number: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    /// The API key, if one was supplied and is not blank.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|key| !key.expose_secret().trim().is_empty())
    }

    /// Whether enough credentials exist to call the provider at all.
    pub fn has_credentials(&self) -> bool {
        !self.provider.requires_api_key() || self.api_key().is_some()
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopchat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(request_timeout_secs) = server.request_timeout_secs {
                self.server.request_timeout_secs = request_timeout_secs;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(enabled) = catalog.enabled {
                self.catalog.enabled = enabled;
            }
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
            if let Some(refresh) = catalog.refresh {
                self.catalog.refresh = refresh;
            }
        }

        if let Some(shop) = patch.shop {
            if let Some(name) = shop.name {
                self.shop.name = name;
            }
            if let Some(whatsapp_number) = shop.whatsapp_number {
                self.shop.whatsapp_number = Some(whatsapp_number);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPCHAT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SHOPCHAT_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"))
        {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPCHAT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SHOPCHAT_LLM_MODEL").or_else(|| read_env("GEMINI_MODEL")) {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SHOPCHAT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SHOPCHAT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPCHAT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHOPCHAT_SERVER_PORT") {
            self.server.port = parse_u16("SHOPCHAT_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }
        if let Some(value) = read_env("SHOPCHAT_SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs =
                parse_u64("SHOPCHAT_SERVER_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SHOPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPCHAT_CATALOG_ENABLED") {
            self.catalog.enabled = parse_bool("SHOPCHAT_CATALOG_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SHOPCHAT_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("SHOPCHAT_CATALOG_REFRESH") {
            self.catalog.refresh = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "SHOPCHAT_CATALOG_REFRESH".to_string(),
                value: value.clone(),
            })?;
        }

        if let Some(value) = read_env("SHOPCHAT_SHOP_NAME") {
            self.shop.name = value;
        }
        let whatsapp_number =
            read_env("SHOPCHAT_SHOP_WHATSAPP_NUMBER").or_else(|| read_env("MY_PHONE_NUMBER"));
        if let Some(value) = whatsapp_number {
            self.shop.whatsapp_number = Some(value);
        }

        let log_level =
            read_env("SHOPCHAT_LOGGING_LEVEL").or_else(|| read_env("SHOPCHAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPCHAT_LOGGING_FORMAT").or_else(|| read_env("SHOPCHAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(enabled) = overrides.catalog_enabled {
            self.catalog.enabled = enabled;
        }
        if let Some(path) = overrides.catalog_path {
            self.catalog.path = path;
        }
        if let Some(refresh) = overrides.catalog_refresh {
            self.catalog.refresh = refresh;
        }
        if let Some(whatsapp_number) = overrides.whatsapp_number {
            self.shop.whatsapp_number = Some(whatsapp_number);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_catalog(&self.catalog)?;
        validate_shop(&self.shop)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Candidate config file locations, in lookup order.
pub fn default_config_paths() -> [PathBuf; 2] {
    [PathBuf::from("shopchat.toml"), PathBuf::from("config/shopchat.toml")]
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    if let Some(path) = read_env("SHOPCHAT_CONFIG").map(PathBuf::from) {
        return path.exists().then_some(path);
    }

    default_config_paths().into_iter().find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Fields whose `${VAR}` references may be unset; they then resolve to an empty
/// string, which the loader treats as "not configured".
const OPTIONAL_INTERPOLATION_FIELDS: [&str; 1] = ["llm.api_key"];

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut section = String::new();

    for line in input.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            section = trimmed.trim_matches(|ch| ch == '[' || ch == ']').trim().to_string();
        }

        let field = trimmed.split_once('=').map(|(key, _)| match key.trim() {
            key if section.is_empty() => key.to_string(),
            key => format!("{section}.{key}"),
        });
        let allow_missing = field
            .as_deref()
            .is_some_and(|field| OPTIONAL_INTERPOLATION_FIELDS.contains(&field));

        interpolate_line(line, allow_missing, &mut output)?;
    }

    Ok(output)
}

fn interpolate_line(
    line: &str,
    allow_missing: bool,
    output: &mut String,
) -> Result<(), ConfigError> {
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) if next != '\n' => key.push(next),
                    _ => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            match env::var(&key) {
                Ok(value) => output.push_str(&value),
                Err(_) if allow_missing => {}
                Err(_) => return Err(ConfigError::MissingEnvInterpolation { var: key }),
            }
            continue;
        }

        output.push(ch);
    }

    Ok(())
}

// A missing api key is not a validation error; chat requests then report the
// model as not loaded.
fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.model must name a model (for example `gemini-2.0-flash`)".to_string(),
        ));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.request_timeout_secs == 0 || server.request_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "server.request_timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.enabled && catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "catalog.path is required when catalog.enabled is true".to_string(),
        ));
    }

    Ok(())
}

fn validate_shop(shop: &ShopConfig) -> Result<(), ConfigError> {
    if shop.name.trim().is_empty() {
        return Err(ConfigError::Validation("shop.name must not be empty".to_string()));
    }

    if let Some(number) = &shop.whatsapp_number {
        if !is_valid_contact(number) {
            return Err(ConfigError::Validation(
                "shop.whatsapp_number must be a phone number in international format (digits, optional leading `+`)".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    catalog: Option<CatalogPatch>,
    shop: Option<ShopPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    enabled: Option<bool>,
    path: Option<PathBuf>,
    refresh: Option<RefreshStrategy>,
}

#[derive(Debug, Default, Deserialize)]
struct ShopPatch {
    name: Option<String>,
    whatsapp_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Environment variables read by [`AppConfig::load`].
pub const ENV_KEYS: [&str; 23] = [
    "SHOPCHAT_LLM_PROVIDER",
    "SHOPCHAT_LLM_API_KEY",
    "GEMINI_API_KEY",
    "SHOPCHAT_LLM_BASE_URL",
    "SHOPCHAT_LLM_MODEL",
    "GEMINI_MODEL",
    "SHOPCHAT_LLM_TIMEOUT_SECS",
    "SHOPCHAT_SERVER_BIND_ADDRESS",
    "SHOPCHAT_SERVER_PORT",
    "PORT",
    "SHOPCHAT_SERVER_REQUEST_TIMEOUT_SECS",
    "SHOPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS",
    "SHOPCHAT_CATALOG_ENABLED",
    "SHOPCHAT_CATALOG_PATH",
    "SHOPCHAT_CATALOG_REFRESH",
    "SHOPCHAT_SHOP_NAME",
    "SHOPCHAT_SHOP_WHATSAPP_NUMBER",
    "MY_PHONE_NUMBER",
    "SHOPCHAT_LOGGING_LEVEL",
    "SHOPCHAT_LOG_LEVEL",
    "SHOPCHAT_LOGGING_FORMAT",
    "SHOPCHAT_LOG_FORMAT",
    "SHOPCHAT_CONFIG",
];

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat, ENV_KEYS,
    };
    use crate::catalog::RefreshStrategy;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    /// Runs `test_fn` with exactly `vars` set among the known config variables.
    fn with_env<T>(vars: &[(&str, &str)], test_fn: impl FnOnce() -> T) -> Result<T, String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let previous: Vec<(&str, Option<String>)> =
            ENV_KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        let result = test_fn();

        for (key, _) in vars {
            env::remove_var(key);
        }
        for (key, value) in previous {
            if let Some(value) = value {
                env::set_var(key, value);
            }
        }
        Ok(result)
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_api_key() -> Result<(), String> {
        with_env(&[], || -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::Gemini, "gemini should be the default")?;
            ensure(config.llm.model == "gemini-2.0-flash", "default model should be set")?;
            ensure(config.llm.api_key().is_none(), "no api key should be present")?;
            ensure(!config.llm.has_credentials(), "gemini needs credentials")?;
            ensure(config.server.port == 10000, "default port should be 10000")?;
            ensure(config.catalog.refresh == RefreshStrategy::Startup, "startup refresh default")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })?
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        with_env(&[("TEST_SHOP_NAME", "Kedai Kasut")], || -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopchat.toml");
            fs::write(
                &path,
                r#"
[shop]
name = "${TEST_SHOP_NAME}"
whatsapp_number = "+60 12-345 6789"

[catalog]
path = "data/menu.csv"
refresh = "per_request"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.shop.name == "Kedai Kasut", "shop name should come from environment")?;
            ensure(
                config.shop.whatsapp_number.as_deref() == Some("+60 12-345 6789"),
                "whatsapp number should be read from file",
            )?;
            ensure(config.catalog.path == PathBuf::from("data/menu.csv"), "catalog path from file")?;
            ensure(
                config.catalog.refresh == RefreshStrategy::PerRequest,
                "refresh strategy should be read from file",
            )?;
            Ok(())
        })?
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        with_env(&[], || -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopchat.toml");
            fs::write(&path, "[shop]\nname = \"${SHOPCHAT_TEST_UNSET_SHOP}\"\n")
                .map_err(|err| err.to_string())?;

            let result =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
            ensure(
                matches!(
                    result,
                    Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "SHOPCHAT_TEST_UNSET_SHOP"
                ),
                "missing interpolation variable should be named",
            )
        })?
    }

    #[test]
    fn unset_api_key_reference_leaves_model_unconfigured() -> Result<(), String> {
        with_env(&[], || -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopchat.toml");
            fs::write(
                &path,
                "[llm]\napi_key = \"${SHOPCHAT_TEST_UNSET_KEY}\"\n\n[shop]\nname = \"Kedai\"\n",
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| err.to_string())?;
            ensure(!config.llm.has_credentials(), "unset key reference should count as no key")?;
            ensure(config.shop.name == "Kedai", "rest of the file should still apply")
        })?
    }

    #[test]
    fn dotted_api_key_reference_may_be_unset() -> Result<(), String> {
        with_env(&[], || -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopchat.toml");
            fs::write(&path, "llm.api_key = \"${SHOPCHAT_TEST_UNSET_KEY}\"\n")
                .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| err.to_string())?;
            ensure(config.llm.api_key().is_none(), "blank interpolated key should be filtered")
        })?
    }

    #[test]
    fn legacy_environment_names_are_honoured() -> Result<(), String> {
        with_env(
            &[
                ("GEMINI_API_KEY", "legacy-key"),
                ("MY_PHONE_NUMBER", "60123456789"),
                ("PORT", "8081"),
                ("SHOPCHAT_LOG_LEVEL", "warn"),
                ("SHOPCHAT_LOG_FORMAT", "pretty"),
            ],
            || -> Result<(), String> {
                let config = AppConfig::load(LoadOptions::default())
                    .map_err(|err| format!("config load failed: {err}"))?;

                ensure(
                    config.llm.api_key().map(|key| key.expose_secret() == "legacy-key")
                        == Some(true),
                    "GEMINI_API_KEY should populate llm.api_key",
                )?;
                ensure(
                    config.shop.whatsapp_number.as_deref() == Some("60123456789"),
                    "MY_PHONE_NUMBER should populate shop.whatsapp_number",
                )?;
                ensure(config.server.port == 8081, "PORT should populate server.port")?;
                ensure(config.logging.level == "warn", "log level alias should apply")?;
                ensure(
                    matches!(config.logging.format, LogFormat::Pretty),
                    "log format alias should apply",
                )?;
                Ok(())
            },
        )?
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        with_env(
            &[("SHOPCHAT_LLM_MODEL", "gemini-from-env"), ("SHOPCHAT_SERVER_PORT", "9000")],
            || -> Result<(), String> {
                let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
                let path = dir.path().join("shopchat.toml");
                fs::write(
                    &path,
                    r#"
[llm]
model = "gemini-from-file"

[server]
port = 7000

[logging]
level = "warn"
"#,
                )
                .map_err(|err| err.to_string())?;

                let config = AppConfig::load(LoadOptions {
                    config_path: Some(path),
                    overrides: ConfigOverrides {
                        server_port: Some(6000),
                        log_level: Some("debug".to_string()),
                        ..ConfigOverrides::default()
                    },
                    ..LoadOptions::default()
                })
                .map_err(|err| format!("config load failed: {err}"))?;

                ensure(config.llm.model == "gemini-from-env", "env model should win over file")?;
                ensure(config.server.port == 6000, "override port should win")?;
                ensure(config.logging.level == "debug", "overridden log level should be debug")?;
                Ok(())
            },
        )?
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        with_env(&[("SHOPCHAT_SHOP_WHATSAPP_NUMBER", "call me maybe")], || -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("shop.whatsapp_number")
            );
            ensure(has_message, "validation failure should mention shop.whatsapp_number")
        })?
    }

    #[test]
    fn invalid_refresh_strategy_is_rejected() -> Result<(), String> {
        with_env(&[("SHOPCHAT_CATALOG_REFRESH", "hourly")], || -> Result<(), String> {
            let result = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    result,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "SHOPCHAT_CATALOG_REFRESH"
                ),
                "invalid refresh strategy should be an env override error",
            )
        })?
    }

    #[test]
    fn ollama_needs_no_api_key() -> Result<(), String> {
        with_env(&[("SHOPCHAT_LLM_PROVIDER", "ollama")], || -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.has_credentials(), "ollama should not require an api key")?;
            ensure(
                config.llm.effective_base_url() == "http://localhost:11434",
                "ollama should fall back to the local endpoint",
            )
        })?
    }

    #[test]
    fn blank_api_key_counts_as_missing() -> Result<(), String> {
        with_env(&[], || -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    llm_api_key: Some("   ".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(!config.llm.has_credentials(), "blank api key should not count")
        })?
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        with_env(&[("SHOPCHAT_LLM_API_KEY", "sk-secret-value")], || -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })?
    }
}
