//! Per-session credential and model resolution
//!
//! A session either talks to the Anthropic API directly or goes through the
//! AWS Bedrock model broker. Every field can be supplied per session; omitted
//! fields fall back to the process-wide [`ModelDefaults`] captured at startup.
//! Resolved values are only ever turned into container environment variables.
//! Anything meant for a log line goes through [`CredentialSummary`].

use std::fmt;

use serde::Serialize;

use crate::error::Result;

use super::parse_flag;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Primary Bedrock model when neither the session nor the environment names one
pub const DEFAULT_BEDROCK_MODEL: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";

/// Small/fast Bedrock model when neither the session nor the environment names one
pub const DEFAULT_BEDROCK_SMALL_MODEL: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

/// Primary model in direct Anthropic API mode
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Small/fast model in direct Anthropic API mode
pub const ANTHROPIC_SMALL_FAST_MODEL: &str = "claude-3-haiku-20240307";

// ============================================================================
// INPUTS
// ============================================================================

/// Credential and model fields supplied with a create-session call.
#[derive(Clone, Default)]
pub struct CredentialOptions {
    /// Anthropic API key
    pub api_key: Option<String>,
    /// Use AWS Bedrock instead of the Anthropic API
    pub use_bedrock: Option<bool>,
    /// AWS region for Bedrock
    pub aws_region: Option<String>,
    /// AWS access key ID
    pub aws_access_key_id: Option<String>,
    /// AWS secret access key
    pub aws_secret_access_key: Option<String>,
    /// AWS session token
    pub aws_session_token: Option<String>,
    /// Bedrock model ID
    pub bedrock_model: Option<String>,
    /// Bedrock small/fast model ID
    pub bedrock_small_model: Option<String>,
}

impl fmt::Debug for CredentialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialOptions")
            .field("has_api_key", &self.api_key.is_some())
            .field("use_bedrock", &self.use_bedrock)
            .field("aws_region", &self.aws_region)
            .field("has_aws_access_key_id", &self.aws_access_key_id.is_some())
            .field("has_aws_secret_access_key", &self.aws_secret_access_key.is_some())
            .field("has_aws_session_token", &self.aws_session_token.is_some())
            .field("bedrock_model", &self.bedrock_model)
            .field("bedrock_small_model", &self.bedrock_small_model)
            .finish()
    }
}

/// Process-wide defaults, read from the environment once at startup.
#[derive(Clone, Default)]
pub struct ModelDefaults {
    /// `ANTHROPIC_API_KEY`
    pub api_key: Option<String>,
    /// `CLAUDE_CODE_USE_BEDROCK`
    pub use_bedrock: bool,
    /// `AWS_REGION`
    pub aws_region: Option<String>,
    /// `AWS_ACCESS_KEY_ID`
    pub aws_access_key_id: Option<String>,
    /// `AWS_SECRET_ACCESS_KEY`
    pub aws_secret_access_key: Option<String>,
    /// `AWS_SESSION_TOKEN`
    pub aws_session_token: Option<String>,
    /// `ANTHROPIC_MODEL`
    pub bedrock_model: Option<String>,
    /// `ANTHROPIC_SMALL_FAST_MODEL`
    pub bedrock_small_model: Option<String>,
}

impl ModelDefaults {
    /// Read defaults from the process environment
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `CLAUDE_CODE_USE_BEDROCK` is not a boolean
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read defaults through an arbitrary key lookup
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `CLAUDE_CODE_USE_BEDROCK` is not a boolean
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let use_bedrock = match get("CLAUDE_CODE_USE_BEDROCK") {
            Some(raw) => parse_flag("CLAUDE_CODE_USE_BEDROCK", &raw)?,
            None => false,
        };

        Ok(Self {
            api_key: get("ANTHROPIC_API_KEY"),
            use_bedrock,
            aws_region: get("AWS_REGION"),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: get("AWS_SESSION_TOKEN"),
            bedrock_model: get("ANTHROPIC_MODEL"),
            bedrock_small_model: get("ANTHROPIC_SMALL_FAST_MODEL"),
        })
    }
}

impl fmt::Debug for ModelDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefaults")
            .field("has_api_key", &self.api_key.is_some())
            .field("use_bedrock", &self.use_bedrock)
            .field("aws_region", &self.aws_region)
            .field("has_aws_access_key_id", &self.aws_access_key_id.is_some())
            .field("has_aws_secret_access_key", &self.aws_secret_access_key.is_some())
            .field("has_aws_session_token", &self.aws_session_token.is_some())
            .field("bedrock_model", &self.bedrock_model)
            .field("bedrock_small_model", &self.bedrock_small_model)
            .finish()
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Bedrock credentials after per-session/default resolution
#[derive(Clone)]
pub struct BedrockCredentials {
    /// AWS region
    pub region: Option<String>,
    /// AWS access key ID
    pub access_key_id: Option<String>,
    /// AWS secret access key
    pub secret_access_key: Option<String>,
    /// AWS session token
    pub session_token: Option<String>,
    /// Primary model ID
    pub model: String,
    /// Small/fast model ID
    pub small_model: String,
}

/// Fully resolved credential configuration for one container
#[derive(Clone)]
pub enum ResolvedCredentials {
    /// Direct Anthropic API access
    Anthropic {
        /// API key, if any was supplied or configured
        api_key: Option<String>,
    },
    /// AWS Bedrock model broker
    Bedrock(BedrockCredentials),
}

/// Non-secret description of how a session reaches its model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ModelMode {
    /// Anthropic API
    Anthropic,
    /// AWS Bedrock in the given region
    Bedrock {
        /// AWS region
        region: Option<String>,
    },
}

impl ModelMode {
    /// Human-readable provider label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic API",
            Self::Bedrock { .. } => "AWS Bedrock",
        }
    }

    /// True for Bedrock mode
    #[must_use]
    pub fn is_bedrock(&self) -> bool {
        matches!(self, Self::Bedrock { .. })
    }
}

impl ResolvedCredentials {
    /// Resolve per-session options against process defaults.
    ///
    /// Explicit values win; omitted values fall back to `defaults`. In Bedrock mode
    /// the AWS key triple is taken as a unit: without an explicit access key ID, the
    /// access key, secret and token all come from the defaults.
    #[must_use]
    pub fn resolve(options: &CredentialOptions, defaults: &ModelDefaults) -> Self {
        let use_bedrock = options.use_bedrock.unwrap_or(defaults.use_bedrock);

        if !use_bedrock {
            return Self::Anthropic {
                api_key: options.api_key.clone().or_else(|| defaults.api_key.clone()),
            };
        }

        let (access_key_id, secret_access_key, session_token) = match &options.aws_access_key_id {
            Some(key) => (
                Some(key.clone()),
                options.aws_secret_access_key.clone(),
                options.aws_session_token.clone(),
            ),
            None => (
                defaults.aws_access_key_id.clone(),
                defaults.aws_secret_access_key.clone(),
                defaults.aws_session_token.clone(),
            ),
        };

        Self::Bedrock(BedrockCredentials {
            region: options.aws_region.clone().or_else(|| defaults.aws_region.clone()),
            access_key_id,
            secret_access_key,
            session_token,
            model: options
                .bedrock_model
                .clone()
                .or_else(|| defaults.bedrock_model.clone())
                .unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
            small_model: options
                .bedrock_small_model
                .clone()
                .or_else(|| defaults.bedrock_small_model.clone())
                .unwrap_or_else(|| DEFAULT_BEDROCK_SMALL_MODEL.to_string()),
        })
    }

    /// Non-secret mode descriptor retained on the session record
    #[must_use]
    pub fn mode(&self) -> ModelMode {
        match self {
            Self::Anthropic { .. } => ModelMode::Anthropic,
            Self::Bedrock(bedrock) => ModelMode::Bedrock {
                region: bedrock.region.clone(),
            },
        }
    }

    /// Environment variables injected into the container at creation
    #[must_use]
    pub fn container_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        let mut push = |key: &str, value: &str| env.push((key.to_string(), value.to_string()));

        match self {
            Self::Bedrock(bedrock) => {
                push("CLAUDE_CODE_USE_BEDROCK", "true");
                if let Some(region) = &bedrock.region {
                    push("AWS_REGION", region);
                }
                push("ANTHROPIC_MODEL", &bedrock.model);
                push("ANTHROPIC_SMALL_FAST_MODEL", &bedrock.small_model);
                if let Some(key) = &bedrock.access_key_id {
                    push("AWS_ACCESS_KEY_ID", key);
                }
                if let Some(secret) = &bedrock.secret_access_key {
                    push("AWS_SECRET_ACCESS_KEY", secret);
                }
                if let Some(token) = &bedrock.session_token {
                    push("AWS_SESSION_TOKEN", token);
                }
            }
            Self::Anthropic { api_key } => {
                push("CLAUDE_CODE_USE_BEDROCK", "false");
                if let Some(key) = api_key {
                    push("ANTHROPIC_API_KEY", key);
                }
                push("ANTHROPIC_MODEL", ANTHROPIC_MODEL);
                push("ANTHROPIC_SMALL_FAST_MODEL", ANTHROPIC_SMALL_FAST_MODEL);
            }
        }

        env
    }

    /// Redacted summary safe for logging
    #[must_use]
    pub fn summary(&self) -> CredentialSummary {
        match self {
            Self::Anthropic { api_key } => CredentialSummary {
                mode: self.mode(),
                model: ANTHROPIC_MODEL.to_string(),
                small_model: ANTHROPIC_SMALL_FAST_MODEL.to_string(),
                has_api_key: api_key.is_some(),
                has_access_key_id: false,
                has_secret_access_key: false,
                has_session_token: false,
            },
            Self::Bedrock(bedrock) => CredentialSummary {
                mode: self.mode(),
                model: bedrock.model.clone(),
                small_model: bedrock.small_model.clone(),
                has_api_key: false,
                has_access_key_id: bedrock.access_key_id.is_some(),
                has_secret_access_key: bedrock.secret_access_key.is_some(),
                has_session_token: bedrock.session_token.is_some(),
            },
        }
    }
}

/// Loggable view of resolved credentials: models and presence flags only
#[derive(Debug, Clone)]
pub struct CredentialSummary {
    /// Provider and region
    pub mode: ModelMode,
    /// Primary model ID
    pub model: String,
    /// Small/fast model ID
    pub small_model: String,
    /// An API key will be injected
    pub has_api_key: bool,
    /// An AWS access key ID will be injected
    pub has_access_key_id: bool,
    /// An AWS secret access key will be injected
    pub has_secret_access_key: bool,
    /// An AWS session token will be injected
    pub has_session_token: bool,
}

impl fmt::Display for CredentialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mode {
            ModelMode::Anthropic => write!(
                f,
                "provider=anthropic model={} small_model={} api_key={}",
                self.model, self.small_model, self.has_api_key
            ),
            ModelMode::Bedrock { region } => write!(
                f,
                "provider=bedrock region={} model={} small_model={} access_key={} secret={} token={}",
                region.as_deref().unwrap_or("<unset>"),
                self.model,
                self.small_model,
                self.has_access_key_id,
                self.has_secret_access_key,
                self.has_session_token
            ),
        }
    }
}
