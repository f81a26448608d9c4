use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sheets: SheetsConfig,
    pub server: ServerConfig,
    pub business: BusinessConfig,
    pub context: ContextConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Static business data injected at startup. Read-only to the core.
#[derive(Clone, Debug)]
pub struct BusinessConfig {
    pub name: String,
    pub address: String,
    pub hours: String,
    pub phone: String,
    pub insurance_providers: Vec<String>,
    pub categories: Vec<String>,
    pub max_search_results: usize,
    pub max_stock_results: usize,
}

#[derive(Clone, Debug)]
pub struct ContextConfig {
    pub history_limit: usize,
    pub ttl_hours: i64,
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
    pub spreadsheet_id: Option<String>,
    pub api_key: Option<String>,
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
            sheets: SheetsConfig {
                spreadsheet_id: String::new(),
                api_key: String::new().into(),
                timeout_secs: 15,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            business: BusinessConfig {
                name: "Óptica Mirada".to_string(),
                address: "Av. Corrientes 2450, CABA".to_string(),
                hours: "Lunes a viernes de 9 a 19 hs, sábados de 9 a 13 hs".to_string(),
                phone: "+54 11 4952-3300".to_string(),
                insurance_providers: vec![
                    "OSDE".to_string(),
                    "Swiss Medical".to_string(),
                    "Galeno".to_string(),
                    "Medicus".to_string(),
                    "IOMA".to_string(),
                    "PAMI".to_string(),
                ],
                categories: vec![
                    "Armazones".to_string(),
                    "Anteojos de Sol".to_string(),
                    "Lentes de Contacto".to_string(),
                    "Líquidos".to_string(),
                    "Accesorios".to_string(),
                ],
                max_search_results: 5,
                max_stock_results: 3,
            },
            context: ContextConfig { history_limit: 50, ttl_hours: 24 },
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("optibot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(api_key_value) = sheets.api_key {
                self.sheets.api_key = secret_value(api_key_value);
            }
            if let Some(timeout_secs) = sheets.timeout_secs {
                self.sheets.timeout_secs = timeout_secs;
            }
        }

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

        if let Some(business) = patch.business {
            if let Some(name) = business.name {
                self.business.name = name;
            }
            if let Some(address) = business.address {
                self.business.address = address;
            }
            if let Some(hours) = business.hours {
                self.business.hours = hours;
            }
            if let Some(phone) = business.phone {
                self.business.phone = phone;
            }
            if let Some(insurance_providers) = business.insurance_providers {
                self.business.insurance_providers = insurance_providers;
            }
            if let Some(categories) = business.categories {
                self.business.categories = categories;
            }
            if let Some(max_search_results) = business.max_search_results {
                self.business.max_search_results = max_search_results;
            }
            if let Some(max_stock_results) = business.max_stock_results {
                self.business.max_stock_results = max_stock_results;
            }
        }

        if let Some(context) = patch.context {
            if let Some(history_limit) = context.history_limit {
                self.context.history_limit = history_limit;
            }
            if let Some(ttl_hours) = context.ttl_hours {
                self.context.ttl_hours = ttl_hours;
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
        if let Some(value) = read_env("OPTIBOT_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("OPTIBOT_SHEETS_API_KEY") {
            self.sheets.api_key = secret_value(value);
        }
        if let Some(value) = read_env("OPTIBOT_SHEETS_TIMEOUT_SECS") {
            self.sheets.timeout_secs = parse_u64("OPTIBOT_SHEETS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("OPTIBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("OPTIBOT_SERVER_PORT") {
            self.server.port = parse_u16("OPTIBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("OPTIBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("OPTIBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("OPTIBOT_CONTEXT_HISTORY_LIMIT") {
            self.context.history_limit =
                parse_u64("OPTIBOT_CONTEXT_HISTORY_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("OPTIBOT_CONTEXT_TTL_HOURS") {
            self.context.ttl_hours = parse_u64("OPTIBOT_CONTEXT_TTL_HOURS", &value)? as i64;
        }

        let log_level = read_env("OPTIBOT_LOGGING_LEVEL").or_else(|| read_env("OPTIBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OPTIBOT_LOGGING_FORMAT").or_else(|| read_env("OPTIBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(api_key) = overrides.api_key {
            self.sheets.api_key = secret_value(api_key);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sheets(&self.sheets)?;
        validate_server(&self.server)?;
        validate_business(&self.business)?;
        validate_context(&self.context)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("optibot.toml"), PathBuf::from("config/optibot.toml")]
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

fn validate_sheets(sheets: &SheetsConfig) -> Result<(), ConfigError> {
    if sheets.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.spreadsheet_id is required (the document id from the spreadsheet URL)"
                .to_string(),
        ));
    }

    if sheets.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.api_key is required. Create one under Google Cloud Console > Credentials"
                .to_string(),
        ));
    }

    if sheets.timeout_secs == 0 || sheets.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "sheets.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
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

fn validate_business(business: &BusinessConfig) -> Result<(), ConfigError> {
    if business.categories.is_empty() {
        return Err(ConfigError::Validation(
            "business.categories must list at least one catalog sheet".to_string(),
        ));
    }

    if business.categories.iter().any(|category| category.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "business.categories must not contain blank sheet titles".to_string(),
        ));
    }

    if business.max_search_results == 0 || business.max_search_results > 20 {
        return Err(ConfigError::Validation(
            "business.max_search_results must be in range 1..=20".to_string(),
        ));
    }

    if business.max_stock_results == 0 || business.max_stock_results > 20 {
        return Err(ConfigError::Validation(
            "business.max_stock_results must be in range 1..=20".to_string(),
        ));
    }

    Ok(())
}

fn validate_context(context: &ContextConfig) -> Result<(), ConfigError> {
    if context.history_limit == 0 {
        return Err(ConfigError::Validation(
            "context.history_limit must be greater than zero".to_string(),
        ));
    }

    if context.ttl_hours <= 0 || context.ttl_hours > 168 {
        return Err(ConfigError::Validation(
            "context.ttl_hours must be in range 1..=168".to_string(),
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    sheets: Option<SheetsPatch>,
    server: Option<ServerPatch>,
    business: Option<BusinessPatch>,
    context: Option<ContextPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessPatch {
    name: Option<String>,
    address: Option<String>,
    hours: Option<String>,
    phone: Option<String>,
    insurance_providers: Option<Vec<String>>,
    categories: Option<Vec<String>>,
    max_search_results: Option<usize>,
    max_stock_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextPatch {
    history_limit: Option<usize>,
    ttl_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            spreadsheet_id: Some("sheet-test-id".to_string()),
            api_key: Some("key-test".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SHEETS_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("optibot.toml");
            fs::write(
                &path,
                r#"
[sheets]
spreadsheet_id = "sheet-from-file"
api_key = "${TEST_SHEETS_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.sheets.api_key.expose_secret() == "key-from-env",
                "api key should be loaded from environment",
            )?;
            ensure(
                config.sheets.spreadsheet_id == "sheet-from-file",
                "spreadsheet id should come from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SHEETS_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPTIBOT_SHEETS_SPREADSHEET_ID", "sheet-test");
        env::set_var("OPTIBOT_SHEETS_API_KEY", "key-test");
        env::set_var("OPTIBOT_LOG_LEVEL", "warn");
        env::set_var("OPTIBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "OPTIBOT_SHEETS_SPREADSHEET_ID",
            "OPTIBOT_SHEETS_API_KEY",
            "OPTIBOT_LOG_LEVEL",
            "OPTIBOT_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OPTIBOT_SHEETS_SPREADSHEET_ID", "sheet-from-env");
        env::set_var("OPTIBOT_SHEETS_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("optibot.toml");
            fs::write(
                &path,
                r#"
[sheets]
spreadsheet_id = "sheet-from-file"
api_key = "key-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    spreadsheet_id: Some("sheet-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.sheets.spreadsheet_id == "sheet-from-override",
                "override spreadsheet id should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.sheets.api_key.expose_secret() == "key-from-env",
                "env api key should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["OPTIBOT_SHEETS_SPREADSHEET_ID", "OPTIBOT_SHEETS_API_KEY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("sheets.spreadsheet_id")
        );
        ensure(has_message, "validation failure should mention sheets.spreadsheet_id")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    api_key: Some("key-secret-value".to_string()),
                    ..valid_overrides()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("key-secret-value"),
                "debug output should not contain the api key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        result
    }

    #[test]
    fn default_business_config_covers_every_catalog_sheet() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: valid_overrides(),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.business.categories.is_empty(), "default categories must not be empty")?;
        ensure(
            config.business.max_search_results == 5,
            "default search result limit should be 5",
        )?;
        ensure(config.context.history_limit == 50, "default history limit should be 50")?;
        ensure(config.context.ttl_hours == 24, "default context ttl should be 24 hours")
    }
}
