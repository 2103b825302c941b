use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default Mandrill API endpoint
pub const DEFAULT_API_URL: &str = "https://mandrillapp.com/api/1.0";

/// Relay service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub mailer: MailerConfig,
    pub api_url: String,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub views_dir: String,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = var("MANDRILL_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let use_templates = match var("MANDRILL_USE_TEMPLATES") {
            Some(raw) => parse_flag("MANDRILL_USE_TEMPLATES", &raw)?,
            None => false,
        };

        Ok(Config {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: var("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            mailer: MailerConfig::configure(api_key, use_templates)?,
            api_url: var("MANDRILL_API_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            from_email: var("MAIL_FROM").filter(|v| !v.trim().is_empty()),
            from_name: var("MAIL_FROM_NAME").filter(|v| !v.trim().is_empty()),
            views_dir: var("MAIL_VIEWS_DIR").unwrap_or_else(|| "views".to_string()),
            timeout_seconds: var("MANDRILL_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout)?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Timeout for inbound relay requests: the Mandrill timeout plus headroom
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.saturating_add(5))
    }
}

/// Validated Mandrill credentials and mode.
///
/// Built once at startup through [`MailerConfig::configure`] (or deserialized
/// from JSON) and never mutated afterwards.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMailerConfig")]
pub struct MailerConfig {
    api_key: String,
    use_templates: bool,
}

impl MailerConfig {
    /// Validate the API key and store its trimmed form.
    pub fn configure(
        api_key: impl AsRef<str>,
        use_templates: bool,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.as_ref().trim();
        if api_key.is_empty() {
            return Err(ConfigError::InvalidApiKey);
        }

        Ok(Self {
            api_key: api_key.to_string(),
            use_templates,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn use_templates(&self) -> bool {
        self.use_templates
    }
}

impl fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerConfig")
            .field("api_key", &"<redacted>")
            .field("use_templates", &self.use_templates)
            .finish()
    }
}

/// Untyped form, so a non-string key is a configuration error
/// rather than a generic deserialization error.
#[derive(Deserialize)]
struct RawMailerConfig {
    #[serde(default)]
    api_key: serde_json::Value,
    #[serde(default)]
    use_templates: bool,
}

impl TryFrom<RawMailerConfig> for MailerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawMailerConfig) -> Result<Self, Self::Error> {
        match raw.api_key {
            serde_json::Value::String(key) => MailerConfig::configure(key, raw.use_templates),
            _ => Err(ConfigError::InvalidApiKey),
        }
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(name)),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MANDRILL_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("Mandrill API key must be a non-empty string")]
    InvalidApiKey,
    #[error("Invalid server port")]
    InvalidPort,
    #[error("Invalid Mandrill timeout")]
    InvalidTimeout,
    #[error("{0} must be a boolean")]
    InvalidFlag(&'static str),
}
