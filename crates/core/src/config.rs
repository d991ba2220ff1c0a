use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub lookup: LookupConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// External product lookup source.
#[derive(Clone, Debug)]
pub struct LookupConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Approval notification settings. SMTP credentials are optional; without
/// them delivery degrades to a manually-dispatched compose link.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub approver_email: String,
    pub smtp_user: Option<SecretString>,
    pub smtp_pass: Option<SecretString>,
    pub approval_base_url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub lookup_enabled: Option<bool>,
    pub lookup_base_url: Option<String>,
    pub approver_email: Option<String>,
    pub approval_base_url: Option<String>,
    pub log_level: Option<String>,
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
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            lookup: LookupConfig {
                enabled: false,
                base_url: "https://lookup.example.com".to_string(),
                timeout_secs: 10,
                max_retries: 3,
            },
            notifier: NotifierConfig {
                approver_email: "approver@example.com".to_string(),
                smtp_user: None,
                smtp_pass: None,
                approval_base_url: "https://example.com".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("procura.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(lookup) = patch.lookup {
            if let Some(enabled) = lookup.enabled {
                self.lookup.enabled = enabled;
            }
            if let Some(base_url) = lookup.base_url {
                self.lookup.base_url = base_url;
            }
            if let Some(timeout_secs) = lookup.timeout_secs {
                self.lookup.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = lookup.max_retries {
                self.lookup.max_retries = max_retries;
            }
        }

        if let Some(notifier) = patch.notifier {
            if let Some(approver_email) = notifier.approver_email {
                self.notifier.approver_email = approver_email;
            }
            if let Some(smtp_user_value) = notifier.smtp_user {
                self.notifier.smtp_user = Some(secret_value(smtp_user_value));
            }
            if let Some(smtp_pass_value) = notifier.smtp_pass {
                self.notifier.smtp_pass = Some(secret_value(smtp_pass_value));
            }
            if let Some(approval_base_url) = notifier.approval_base_url {
                self.notifier.approval_base_url = approval_base_url;
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
        if let Some(value) = read_env("PROCURA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PROCURA_SERVER_PORT") {
            self.server.port = parse_u16("PROCURA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PROCURA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PROCURA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("PROCURA_LOOKUP_ENABLED") {
            self.lookup.enabled = parse_bool("PROCURA_LOOKUP_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PROCURA_LOOKUP_BASE_URL") {
            self.lookup.base_url = value;
        }
        if let Some(value) = read_env("PROCURA_LOOKUP_TIMEOUT_SECS") {
            self.lookup.timeout_secs = parse_u64("PROCURA_LOOKUP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PROCURA_LOOKUP_MAX_RETRIES") {
            self.lookup.max_retries = parse_u32("PROCURA_LOOKUP_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("PROCURA_NOTIFIER_APPROVER_EMAIL") {
            self.notifier.approver_email = value;
        }
        if let Some(value) = read_env("PROCURA_NOTIFIER_SMTP_USER") {
            self.notifier.smtp_user = Some(secret_value(value));
        }
        if let Some(value) = read_env("PROCURA_NOTIFIER_SMTP_PASS") {
            self.notifier.smtp_pass = Some(secret_value(value));
        }
        if let Some(value) = read_env("PROCURA_NOTIFIER_APPROVAL_BASE_URL") {
            self.notifier.approval_base_url = value;
        }

        let log_level = read_env("PROCURA_LOGGING_LEVEL").or_else(|| read_env("PROCURA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROCURA_LOGGING_FORMAT").or_else(|| read_env("PROCURA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(lookup_enabled) = overrides.lookup_enabled {
            self.lookup.enabled = lookup_enabled;
        }
        if let Some(lookup_base_url) = overrides.lookup_base_url {
            self.lookup.base_url = lookup_base_url;
        }
        if let Some(approver_email) = overrides.approver_email {
            self.notifier.approver_email = approver_email;
        }
        if let Some(approval_base_url) = overrides.approval_base_url {
            self.notifier.approval_base_url = approval_base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_lookup(&self.lookup)?;
        validate_notifier(&self.notifier)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("procura.toml"), PathBuf::from("config/procura.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_lookup(lookup: &LookupConfig) -> Result<(), ConfigError> {
    if lookup.enabled {
        let base_url = lookup.base_url.trim();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "lookup.base_url must start with http:// or https:// when lookup is enabled"
                    .to_string(),
            ));
        }
    }

    if lookup.timeout_secs == 0 || lookup.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "lookup.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if lookup.max_retries == 0 || lookup.max_retries > 10 {
        return Err(ConfigError::Validation(
            "lookup.max_retries must be in range 1..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    let email = notifier.approver_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ConfigError::Validation(
            "notifier.approver_email must be a valid email address".to_string(),
        ));
    }

    // SMTP credentials come as a pair or not at all.
    if notifier.smtp_user.is_some() != notifier.smtp_pass.is_some() {
        return Err(ConfigError::Validation(
            "notifier.smtp_user and notifier.smtp_pass must be configured together".to_string(),
        ));
    }

    let base_url = notifier.approval_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "notifier.approval_base_url must start with http:// or https://".to_string(),
        ));
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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
    server: Option<ServerPatch>,
    lookup: Option<LookupPatch>,
    notifier: Option<NotifierPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    approver_email: Option<String>,
    smtp_user: Option<String>,
    smtp_pass: Option<String>,
    approval_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
