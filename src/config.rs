//! Process-wide settings, resolved once at startup.

use std::time::Duration;

use crate::error::ToolError;
use crate::extract::FenceMode;

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const AZURE_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";

/// Credential variables in priority order. First one set wins.
pub const CREDENTIAL_VARS: [&str; 3] = [OPENAI_KEY_VAR, ANTHROPIC_KEY_VAR, AZURE_KEY_VAR];

/// The selected LLM credential and the provider-specific bits that go with it.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    OpenAi {
        api_key: String,
        base_url: String,
        model: String,
    },
    Anthropic {
        api_key: String,
        base_url: String,
        model: String,
    },
    Azure {
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

impl Credential {
    pub fn provider_name(&self) -> &'static str {
        match self {
            Credential::OpenAi { .. } => "openai",
            Credential::Anthropic { .. } => "anthropic",
            Credential::Azure { .. } => "azure",
        }
    }

    /// Environment variable the key was read from.
    pub fn key_var(&self) -> &'static str {
        match self {
            Credential::OpenAi { .. } => OPENAI_KEY_VAR,
            Credential::Anthropic { .. } => ANTHROPIC_KEY_VAR,
            Credential::Azure { .. } => AZURE_KEY_VAR,
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            Credential::OpenAi { api_key, .. }
            | Credential::Anthropic { api_key, .. }
            | Credential::Azure { api_key, .. } => api_key,
        }
    }

    /// Model identifier sent with each request. Azure routes by deployment.
    pub fn model(&self) -> &str {
        match self {
            Credential::OpenAi { model, .. } | Credential::Anthropic { model, .. } => model,
            Credential::Azure { deployment, .. } => deployment,
        }
    }
}

// Keys stay out of Debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider_name())
            .field("model", &self.model())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub credential: Option<Credential>,
    pub max_tokens: u32,
    pub llm_timeout: Duration,
    pub command_timeout: Duration,
    pub fence_mode: FenceMode,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credential: None,
            max_tokens: 1024,
            llm_timeout: Duration::from_secs(60),
            command_timeout: Duration::from_secs(30),
            fence_mode: FenceMode::Toggle,
            host: "0.0.0.0".into(),
            port: 8081,
        }
    }
}

impl Settings {
    /// Which credential was picked, with the key masked.
    pub fn credential_summary(&self) -> String {
        match &self.credential {
            Some(c) => format!("{} from {} ({})", c.provider_name(), c.key_var(), mask_secret(c.api_key())),
            None => format!("none (set one of {})", CREDENTIAL_VARS.join(", ")),
        }
    }

    pub fn from_env() -> Result<Self, ToolError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ToolError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let credential = if let Some(api_key) = get(OPENAI_KEY_VAR) {
            Some(Credential::OpenAi {
                api_key,
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            })
        } else if let Some(api_key) = get(ANTHROPIC_KEY_VAR) {
            Some(Credential::Anthropic {
                api_key,
                base_url: get("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| "https://api.anthropic.com".into()),
                model: get("ANTHROPIC_MODEL").unwrap_or_else(|| "claude-sonnet-4-20250514".into()),
            })
        } else if let Some(api_key) = get(AZURE_KEY_VAR) {
            let endpoint = get("AZURE_OPENAI_ENDPOINT").ok_or_else(|| {
                ToolError::Configuration(format!(
                    "{AZURE_KEY_VAR} is set but AZURE_OPENAI_ENDPOINT is not"
                ))
            })?;
            Some(Credential::Azure {
                api_key,
                endpoint,
                deployment: get("AZURE_OPENAI_DEPLOYMENT").unwrap_or_else(|| "gpt-4o-mini".into()),
                api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| "2024-02-15-preview".into()),
            })
        } else {
            None
        };

        let fence_mode = match get("FENCE_MODE") {
            Some(v) => v.parse()?,
            None => defaults.fence_mode,
        };

        Ok(Self {
            credential,
            max_tokens: parse_or("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"), defaults.max_tokens)?,
            llm_timeout: parse_secs("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), defaults.llm_timeout)?,
            command_timeout: parse_secs(
                "COMMAND_TIMEOUT_SECS",
                get("COMMAND_TIMEOUT_SECS"),
                defaults.command_timeout,
            )?,
            fence_mode,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ToolError> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ToolError::Configuration(format!("{key} has an invalid value: {v:?}"))),
        None => Ok(default),
    }
}

/// Timeouts must be at least one second.
fn parse_secs(key: &str, raw: Option<String>, default: Duration) -> Result<Duration, ToolError> {
    match parse_or(key, raw, default.as_secs())? {
        0 => Err(ToolError::Configuration(format!("{key} must be greater than zero"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// First few characters of a secret, for diagnostics output.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}...")
}
