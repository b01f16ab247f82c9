use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::catalog::FormulationCatalog;
use crate::engine::pricing::PricingPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub pricing: PricingPolicy,
    pub naming: NamingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// Unset means the catalog keeps its own brand.
#[derive(Clone, Debug, Default)]
pub struct NamingConfig {
    pub brand: Option<String>,
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
    pub catalog_path: Option<PathBuf>,
    pub base_price: Option<Decimal>,
    pub brand: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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
            catalog: CatalogConfig::default(),
            pricing: PricingPolicy::default(),
            naming: NamingConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("dermacraft.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Loads the configured catalog (or the built-in one). A brand set through
    /// config replaces the catalog's own; otherwise the catalog brand stands.
    pub fn build_catalog(&self) -> Result<FormulationCatalog, ConfigError> {
        let mut catalog = match &self.catalog.path {
            Some(path) => FormulationCatalog::load(path)?,
            None => FormulationCatalog::standard(),
        };
        if let Some(brand) = &self.naming.brand {
            catalog = catalog.with_brand(brand.clone());
        }
        catalog.validate()?;
        Ok(catalog)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(base_price) = pricing.base_price {
                self.pricing.base_price = base_price;
            }
            if let Some(complexity_step) = pricing.complexity_step {
                self.pricing.complexity_step = complexity_step;
            }
            if let Some(rounding_increment) = pricing.rounding_increment {
                self.pricing.rounding_increment = rounding_increment;
            }
        }

        if let Some(naming) = patch.naming {
            if let Some(brand) = naming.brand {
                self.naming.brand = Some(brand);
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
        if let Some(value) = read_env("DERMACRAFT_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("DERMACRAFT_PRICING_BASE_PRICE") {
            self.pricing.base_price = parse_decimal("DERMACRAFT_PRICING_BASE_PRICE", &value)?;
        }
        if let Some(value) = read_env("DERMACRAFT_PRICING_COMPLEXITY_STEP") {
            self.pricing.complexity_step =
                parse_decimal("DERMACRAFT_PRICING_COMPLEXITY_STEP", &value)?;
        }
        if let Some(value) = read_env("DERMACRAFT_PRICING_ROUNDING_INCREMENT") {
            self.pricing.rounding_increment =
                parse_decimal("DERMACRAFT_PRICING_ROUNDING_INCREMENT", &value)?;
        }

        if let Some(value) = read_env("DERMACRAFT_NAMING_BRAND") {
            self.naming.brand = Some(value);
        }

        let log_level =
            read_env("DERMACRAFT_LOGGING_LEVEL").or_else(|| read_env("DERMACRAFT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DERMACRAFT_LOGGING_FORMAT").or_else(|| read_env("DERMACRAFT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(base_price) = overrides.base_price {
            self.pricing.base_price = base_price;
        }
        if let Some(brand) = overrides.brand {
            self.naming.brand = Some(brand);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_naming(&self.naming)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dermacraft.toml"), PathBuf::from("config/dermacraft.toml")]
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

fn validate_pricing(pricing: &PricingPolicy) -> Result<(), ConfigError> {
    if pricing.base_price <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.base_price must be greater than zero".to_string(),
        ));
    }

    if pricing.complexity_step < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.complexity_step must not be negative".to_string(),
        ));
    }

    if pricing.rounding_increment <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.rounding_increment must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_naming(naming: &NamingConfig) -> Result<(), ConfigError> {
    if naming.brand.as_deref().is_some_and(|brand| brand.trim().is_empty()) {
        return Err(ConfigError::Validation("naming.brand must not be empty".to_string()));
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

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    pricing: Option<PricingPatch>,
    naming: Option<NamingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    base_price: Option<Decimal>,
    complexity_step: Option<Decimal>,
    rounding_increment: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct NamingPatch {
    brand: Option<String>,
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

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::engine::catalog::tests::MINIMAL_CATALOG;

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

    #[test]
    fn defaults_load_without_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.pricing.base_price == Decimal::new(2500, 2), "default base price is 25.00")?;
        ensure(config.naming.brand.is_none(), "no brand override by default")?;
        ensure(config.catalog.path.is_none(), "built-in catalog by default")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logging by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_DERMACRAFT_BRAND", "Lumen Skin");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("dermacraft.toml");
            fs::write(
                &path,
                r#"
[naming]
brand = "${TEST_DERMACRAFT_BRAND}"

[pricing]
base_price = "30.00"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.naming.brand.as_deref() == Some("Lumen Skin"),
                "brand should be interpolated from env",
            )?;
            ensure(
                config.pricing.base_price == Decimal::new(3000, 2),
                "base price should come from the file",
            )
        })();

        clear_vars(&["TEST_DERMACRAFT_BRAND"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DERMACRAFT_PRICING_BASE_PRICE", "27.50");
        env::set_var("DERMACRAFT_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("dermacraft.toml");
            fs::write(
                &path,
                r#"
[pricing]
base_price = 30
rounding_increment = 0.25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.pricing.base_price == Decimal::new(2750, 2),
                "env base price should win over file",
            )?;
            ensure(
                config.pricing.rounding_increment == Decimal::new(25, 2),
                "file rounding increment should win over default",
            )?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "env alias sets log format")
        })();

        clear_vars(&["DERMACRAFT_PRICING_BASE_PRICE", "DERMACRAFT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_env_decimal_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DERMACRAFT_PRICING_COMPLEXITY_STEP", "five percent");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override error".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "DERMACRAFT_PRICING_COMPLEXITY_STEP",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["DERMACRAFT_PRICING_COMPLEXITY_STEP"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                base_price: Some(Decimal::ZERO),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("pricing.base_price")),
            "validation failure should mention pricing.base_price",
        )
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: Some("nowhere/dermacraft.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "require_file should surface a missing file",
        )
    }

    #[test]
    fn build_catalog_applies_configured_brand() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                brand: Some("Atelier".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let catalog = config.build_catalog().map_err(|err| err.to_string())?;
        ensure(catalog.naming.brand == "Atelier", "catalog should carry configured brand")
    }

    #[test]
    fn build_catalog_keeps_catalog_brand_without_override() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["DERMACRAFT_NAMING_BRAND", "DERMACRAFT_CATALOG_PATH"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("catalog.toml");
        fs::write(&path, MINIMAL_CATALOG).map_err(|err| err.to_string())?;

        let mut config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                catalog_path: Some(path),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let catalog = config.build_catalog().map_err(|err| err.to_string())?;
        ensure(catalog.naming.brand == "Fixture Labs", "catalog file brand should stand")?;

        config.naming.brand = Some("Atelier".to_string());
        let catalog = config.build_catalog().map_err(|err| err.to_string())?;
        ensure(catalog.naming.brand == "Atelier", "explicit brand should replace the file's")?;

        let builtin = AppConfig::default().build_catalog().map_err(|err| err.to_string())?;
        ensure(builtin.naming.brand == "Dermacraft", "built-in catalog keeps its brand")
    }
}
