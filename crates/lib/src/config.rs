//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.chatrelay/config.json`) and then
//! overridden from the environment (including a `.env` file in the working directory).
//! The result is immutable and handed to the gateway once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API settings (webhook verify token, outbound send credentials).
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Completion provider settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000). Overridden by CHATRELAY_PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must be able to reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// WhatsApp Cloud API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Secret the platform echoes back during the webhook verification handshake. Overridden by VERIFY_TOKEN env.
    pub verify_token: Option<String>,
    /// Bearer token for the Graph API send endpoint. Overridden by WHATSAPP_TOKEN env.
    pub access_token: Option<String>,
    /// Sender phone number id (path segment of the send endpoint). Overridden by WHATSAPP_PHONE_NUMBER_ID env.
    pub phone_number_id: Option<String>,
    /// Graph API root (default "https://graph.facebook.com").
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    /// Graph API version segment (default "v18.0").
    #[serde(default = "default_graph_api_version")]
    pub graph_api_version: String,
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_api_version() -> String {
    "v18.0".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            access_token: None,
            phone_number_id: None,
            graph_api_base: default_graph_api_base(),
            graph_api_version: default_graph_api_version(),
        }
    }
}

/// How the webhook handler reaches the completion client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionRoute {
    /// Call the Groq client directly in the request task.
    #[default]
    InProcess,
    /// POST the prompt to the gateway's own `/generate` endpoint (see `generateUrl`).
    Loopback,
}

/// Completion provider config (Groq, OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// API key. Overridden by GROQ_API_KEY env.
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL (default "https://api.groq.com/openai/v1").
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    /// Model id (default "llama-3.1-8b-instant").
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Sampling temperature (default 0, deterministic).
    #[serde(default)]
    pub temperature: f32,
    /// Output token cap. None leaves it to the provider.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Extra attempts after a retryable failure (default 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Route used by the webhook handler (default inProcess).
    #[serde(default)]
    pub route: CompletionRoute,
    /// URL of the generate endpoint when route is loopback. Defaults to http://127.0.0.1:{port}/generate.
    #[serde(default)]
    pub generate_url: Option<String>,
}

fn default_completion_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_completion_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_retries() -> u32 {
    2
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_completion_base_url(),
            model: default_completion_model(),
            temperature: 0.0,
            max_tokens: None,
            max_retries: default_max_retries(),
            route: CompletionRoute::default(),
            generate_url: None,
        }
    }
}

/// Read an env var, treating unset and blank the same.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Trim a configured secret; blank becomes None.
fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    /// Apply environment overrides (VERIFY_TOKEN, WHATSAPP_TOKEN, WHATSAPP_PHONE_NUMBER_ID, GROQ_API_KEY, CHATRELAY_PORT).
    /// Env wins over file values; blank env values are ignored.
    pub fn apply_env(&mut self) {
        self.whatsapp.verify_token =
            env_value("VERIFY_TOKEN").or_else(|| non_blank(self.whatsapp.verify_token.as_ref()));
        self.whatsapp.access_token =
            env_value("WHATSAPP_TOKEN").or_else(|| non_blank(self.whatsapp.access_token.as_ref()));
        self.whatsapp.phone_number_id = env_value("WHATSAPP_PHONE_NUMBER_ID")
            .or_else(|| non_blank(self.whatsapp.phone_number_id.as_ref()));
        self.completion.api_key =
            env_value("GROQ_API_KEY").or_else(|| non_blank(self.completion.api_key.as_ref()));
        if let Some(port) = env_value("CHATRELAY_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => log::warn!("ignoring invalid CHATRELAY_PORT: {}", port),
            }
        }
    }

    /// Names of the secrets that are still unset. Missing secrets are not fatal; the
    /// platform or provider rejects the calls that need them.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.whatsapp.verify_token.is_none() {
            missing.push("VERIFY_TOKEN");
        }
        if self.whatsapp.access_token.is_none() {
            missing.push("WHATSAPP_TOKEN");
        }
        if self.whatsapp.phone_number_id.is_none() {
            missing.push("WHATSAPP_PHONE_NUMBER_ID");
        }
        if self.completion.api_key.is_none() {
            missing.push("GROQ_API_KEY");
        }
        missing
    }
}

/// Resolve the generate endpoint URL used by the loopback route.
pub fn resolve_generate_url(config: &Config) -> String {
    non_blank(config.completion.generate_url.as_ref())
        .unwrap_or_else(|| format!("http://127.0.0.1:{}/generate", config.gateway.port))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHATRELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".chatrelay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Parse config from a JSON file. Missing file => default config. Does not read the environment.
pub fn load_config_file(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Load a `.env` file into the process environment: `path`, or the working directory and its
/// parents when None. A missing file is `Ok(None)`; a file that cannot be parsed is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let result = match path {
        Some(p) => dotenvy::from_path(p).map(|()| p.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match result {
        Ok(p) => Ok(Some(p)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Load config from the file (or defaults), then `.env` and the process environment.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    match load_env_file(None) {
        Ok(Some(env_path)) => log::debug!("loaded environment from {}", env_path.display()),
        Ok(None) => {}
        Err(e) => log::warn!("ignoring unreadable .env file: {}", e),
    }
    let (mut config, path) = load_config_file(path)?;
    config.apply_env();
    Ok((config, path))
}
