mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::AtendeError;
use defaults::*;

/// Top-level atende configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to `{data_dir}/logs/atende.log` (rotated daily).
    #[serde(default)]
    pub log_to_file: bool,
    /// Pause before each paced reply message. 0 disables pacing.
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_to_file: false,
            reply_delay_ms: default_reply_delay_ms(),
        }
    }
}

/// Where the session record lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackendKind {
    /// Supabase (PostgREST over HTTPS).
    #[default]
    Supabase,
    /// Local SQLite file.
    Sqlite,
}

/// Session store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackendKind,
    /// Fixed row id of this bot's session.
    #[serde(default = "default_session_key")]
    pub key: String,
    #[serde(default = "default_session_table")]
    pub table: String,
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_key: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Delete stored credentials when the client reports a disconnect.
    #[serde(default = "default_true")]
    pub clear_on_disconnect: bool,
    /// Write placeholder credentials when the table has no session row.
    #[serde(default)]
    pub seed_placeholder: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackendKind::default(),
            key: default_session_key(),
            table: default_session_table(),
            supabase_url: String::new(),
            supabase_key: String::new(),
            sqlite_path: default_sqlite_path(),
            clear_on_disconnect: true,
            seed_placeholder: false,
        }
    }
}

/// QR e-mail delivery config (Brevo transactional API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_email_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_name")]
    pub from_name: String,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_to_name")]
    pub to_name: String,
    #[serde(default = "default_email_subject")]
    pub subject: String,
}

impl EmailConfig {
    /// E-mail delivery needs a key, a sender, and a recipient.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.from.is_empty() && !self.to.is_empty()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_email_base_url(),
            from: String::new(),
            from_name: default_name(),
            to: String::new(),
            to_name: default_to_name(),
            subject: default_email_subject(),
        }
    }
}

/// Automation bridge process config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interpreter or executable that runs the bridge.
    #[serde(default = "default_bridge_command")]
    pub command: String,
    /// Bridge script passed as the first argument. Empty = run `command` alone.
    #[serde(default = "default_bridge_script")]
    pub script: String,
    /// Extra arguments after the script.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: default_bridge_command(),
            script: default_bridge_script(),
            args: Vec::new(),
        }
    }
}

/// HTTP host config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token protecting `/qr`. Empty = no auth.
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Overlay deployment secrets from the environment.
///
/// `lookup` returns the value of a variable, or `None` when unset.
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SUPABASE_URL") {
        config.session.supabase_url = v;
    }
    if let Some(v) = get("SUPABASE_KEY") {
        config.session.supabase_key = v;
    }
    if let Some(v) = get("BREVO_API_KEY") {
        config.email.api_key = v;
    }
    if let Some(v) = get("EMAIL_FROM") {
        config.email.from = v;
    }
    if let Some(v) = get("EMAIL_TO") {
        config.email.to = v;
    }
    if let Some(v) = get("BRIDGE_SCRIPT") {
        config.bridge.script = v;
    }
    if let Some(v) = get("PORT") {
        match v.trim().parse::<u16>() {
            Ok(port) => config.api.port = port,
            Err(_) => warn!("ignoring invalid PORT value '{v}'"),
        }
    }
}

impl Config {
    /// Check that the selected session backend has what it needs.
    pub fn validate(&self) -> Result<(), AtendeError> {
        if self.session.key.trim().is_empty() {
            return Err(AtendeError::Config("session.key must not be empty".into()));
        }
        if self.session.backend == SessionBackendKind::Supabase
            && (self.session.supabase_url.is_empty() || self.session.supabase_key.is_empty())
        {
            return Err(AtendeError::Config(
                "Supabase backend selected but supabase_url/supabase_key are empty. \
                 Set them in config.toml or SUPABASE_URL/SUPABASE_KEY env vars."
                    .into(),
            ));
        }
        if self.bridge.command.trim().is_empty() {
            return Err(AtendeError::Config("bridge.command must not be empty".into()));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, AtendeError> {
    let mut config = load_file(path)?;
    apply_env_overrides(&mut config, |k| std::env::var(k).ok());
    Ok(config)
}

fn load_file(path: &str) -> Result<Config, AtendeError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| AtendeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| AtendeError::Config(format!("failed to parse config: {}", e)))
}
