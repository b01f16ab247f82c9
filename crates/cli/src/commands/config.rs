use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dermacraft_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let entry = |key: &'static str, value: String, env_keys: &[&str]| ConfigEntry {
        key,
        value,
        source: field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
    };

    let entries = vec![
        entry(
            "catalog.path",
            config
                .catalog
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<built-in>".to_string()),
            &["DERMACRAFT_CATALOG_PATH"],
        ),
        entry(
            "pricing.base_price",
            config.pricing.base_price.to_string(),
            &["DERMACRAFT_PRICING_BASE_PRICE"],
        ),
        entry(
            "pricing.complexity_step",
            config.pricing.complexity_step.to_string(),
            &["DERMACRAFT_PRICING_COMPLEXITY_STEP"],
        ),
        entry(
            "pricing.rounding_increment",
            config.pricing.rounding_increment.to_string(),
            &["DERMACRAFT_PRICING_ROUNDING_INCREMENT"],
        ),
        entry(
            "naming.brand",
            config.naming.brand.clone().unwrap_or_else(|| "<catalog>".to_string()),
            &["DERMACRAFT_NAMING_BRAND"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["DERMACRAFT_LOGGING_LEVEL", "DERMACRAFT_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["DERMACRAFT_LOGGING_FORMAT", "DERMACRAFT_LOG_FORMAT"],
        ),
    ];

    let human = entries
        .iter()
        .map(|entry| render_line(entry.key, &entry.value, &entry.source))
        .collect::<Vec<_>>();
    let message = format!(
        "effective config (source precedence: env > file > default):\n{}",
        human.join("\n")
    );

    CommandResult::success_with(COMMAND, message, serde_json::json!({ "entries": entries }))
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("dermacraft.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/dermacraft.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}
