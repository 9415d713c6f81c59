//! Resolved configuration types handed to the rest of the tool.

use {
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
};

/// Model used by the anthropic provider when none is configured.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet";

pub const PROVIDER_ANTHROPIC: &str = "anthropic";
pub const PROVIDER_AMAZON_BEDROCK: &str = "amazon-bedrock";

/// Every accepted `ai.provider` value.
pub const KNOWN_PROVIDERS: &[&str] = &[PROVIDER_ANTHROPIC, PROVIDER_AMAZON_BEDROCK];

/// Fully validated configuration. Immutable once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub headless: bool,
    pub base_url: String,
    pub test_pattern: String,
    pub ai: AiProviderConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailosaur: Option<MailosaurConfig>,
}

/// AI backend settings, one variant per provider.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum AiProviderConfig {
    Anthropic(AnthropicConfig),
    AmazonBedrock(AmazonBedrockConfig),
}

impl AiProviderConfig {
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Anthropic(_) => PROVIDER_ANTHROPIC,
            Self::AmazonBedrock(_) => PROVIDER_AMAZON_BEDROCK,
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Anthropic(cfg) => Some(&cfg.model),
            Self::AmazonBedrock(cfg) => cfg.model.as_deref(),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnthropicConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,
    pub model: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmazonBedrockConfig {
    pub region: String,
    #[serde(serialize_with = "serialize_secret")]
    pub access_key_id: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub secret_access_key: Secret<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_token: Option<Secret<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailosaurConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,
    pub server_id: String,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &REDACTED)
            .field("model", &self.model)
            .finish()
    }
}

impl std::fmt::Debug for AmazonBedrockConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmazonBedrockConfig")
            .field("region", &self.region)
            .field("access_key_id", &REDACTED)
            .field("secret_access_key", &REDACTED)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| REDACTED),
            )
            .field("model", &self.model)
            .finish()
    }
}

impl std::fmt::Debug for MailosaurConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailosaurConfig")
            .field("api_key", &REDACTED)
            .field("server_id", &self.server_id)
            .finish()
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

const REDACTED: &str = "[REDACTED]";

/// Secrets never leave the process through serialization; non-empty values
/// are written as `[REDACTED]`.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if secret.expose_secret().is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str(REDACTED)
    }
}

pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serialize_secret(s, serializer),
        None => serializer.serialize_none(),
    }
}
