//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::linode::{ApiSettings, DEFAULT_API_BASE_URL};
use crate::tunnel::{
    ConvergencePolicy, DEFAULT_IMAGE, DEFAULT_LABEL_PREFIX, DEFAULT_SCRIPT_LABEL, TunnelDefaults,
};

/// Engine configuration merged from defaults, `burrow.toml`, `BURROW_*`
/// environment variables and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "BURROW",
    discovery(
        app_name = "burrow",
        env_var = "BURROW_CONFIG_PATH",
        config_file_name = "burrow.toml",
        dotfile_name = ".burrow.toml",
        project_file_name = "burrow.toml"
    )
)]
pub struct BurrowConfig {
    /// Base URL of the Linode v4 API.
    #[ortho_config(default = DEFAULT_API_BASE_URL.to_owned())]
    pub api_base_url: String,
    /// Fallback access token, used when a request carries none.
    pub access_token: Option<String>,
    /// Label prefix identifying the tunnel instance.
    #[ortho_config(default = DEFAULT_LABEL_PREFIX.to_owned())]
    pub tunnel_label: String,
    /// Image the tunnel is created and rebuilt from.
    #[ortho_config(default = DEFAULT_IMAGE.to_owned())]
    pub tunnel_image: String,
    /// Label of the provisioning script.
    #[ortho_config(default = DEFAULT_SCRIPT_LABEL.to_owned())]
    pub provisioning_script: String,
    /// Seconds between status checks while waiting for `running`.
    #[ortho_config(default = 7)]
    pub poll_interval_secs: u64,
    /// Number of status checks before reporting the last known state.
    #[ortho_config(default = 20)]
    pub max_poll_attempts: u32,
    /// Whole-request HTTP timeout in seconds.
    #[ortho_config(default = 60)]
    pub http_timeout_secs: u64,
    /// `User-Agent` sent with every provider call.
    #[ortho_config(default = "burrow".to_owned())]
    pub user_agent: String,
}

/// Metadata for a configuration field, used to generate actionable error
/// messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to burrow.toml",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "{} {reason}: check {} or {} in burrow.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const API_BASE_URL: FieldMetadata =
    FieldMetadata::new("API base URL", "BURROW_API_BASE_URL", "api_base_url");
const TUNNEL_LABEL: FieldMetadata =
    FieldMetadata::new("tunnel label prefix", "BURROW_TUNNEL_LABEL", "tunnel_label");
const TUNNEL_IMAGE: FieldMetadata =
    FieldMetadata::new("tunnel image", "BURROW_TUNNEL_IMAGE", "tunnel_image");
const PROVISIONING_SCRIPT: FieldMetadata = FieldMetadata::new(
    "provisioning script label",
    "BURROW_PROVISIONING_SCRIPT",
    "provisioning_script",
);
const MAX_POLL_ATTEMPTS: FieldMetadata = FieldMetadata::new(
    "status check budget",
    "BURROW_MAX_POLL_ATTEMPTS",
    "max_poll_attempts",
);
const HTTP_TIMEOUT: FieldMetadata =
    FieldMetadata::new("HTTP timeout", "BURROW_HTTP_TIMEOUT_SECS", "http_timeout_secs");

impl BurrowConfig {
    /// Built-in defaults, without reading files or the environment.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            access_token: None,
            tunnel_label: DEFAULT_LABEL_PREFIX.to_owned(),
            tunnel_image: DEFAULT_IMAGE.to_owned(),
            provisioning_script: DEFAULT_SCRIPT_LABEL.to_owned(),
            poll_interval_secs: 7,
            max_poll_attempts: 20,
            http_timeout_secs: 60,
            user_agent: String::from("burrow"),
        }
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("burrow")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and TOML key to fix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required value is blank
    /// and [`ConfigError::Invalid`] when a numeric value is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, metadata) in [
            (&self.api_base_url, &API_BASE_URL),
            (&self.tunnel_label, &TUNNEL_LABEL),
            (&self.tunnel_image, &TUNNEL_IMAGE),
            (&self.provisioning_script, &PROVISIONING_SCRIPT),
        ] {
            if value.trim().is_empty() {
                return Err(metadata.missing());
            }
        }
        if self.max_poll_attempts == 0 {
            return Err(MAX_POLL_ATTEMPTS.invalid("must be at least 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(HTTP_TIMEOUT.invalid("must be at least 1 second"));
        }
        Ok(())
    }

    /// Connection settings for the provider client.
    #[must_use]
    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Convergence loop timing.
    #[must_use]
    pub const fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy::new(
            Duration::from_secs(self.poll_interval_secs),
            self.max_poll_attempts,
        )
    }

    /// Tunnel naming.
    #[must_use]
    pub fn tunnel_defaults(&self) -> TunnelDefaults {
        TunnelDefaults {
            label_prefix: self.tunnel_label.clone(),
            image: self.tunnel_image.clone(),
            script_label: self.provisioning_script.clone(),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
