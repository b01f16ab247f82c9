pub mod config;
pub mod formulation;
pub mod price;
pub mod smoke;
pub mod synthesize;

use std::future::Future;

use dermacraft_core::config::{AppConfig, LoadOptions};
use dermacraft_core::errors::{ApplicationError, InterfaceError};
use dermacraft_core::FormulationCatalog;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub const EXIT_INTERNAL: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_BAD_REQUEST: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_CONFLICT: u8 = 5;
pub const EXIT_SMOKE_FAILED: u8 = 6;
pub const EXIT_UNAVAILABLE: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, Value::Null)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: to_data(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with(command, error_class, message, exit_code, Value::Null)
    }

    pub fn failure_with(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: impl Serialize,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: to_data(data),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error onto the interface taxonomy and a per-class exit code.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let correlation_id = format!("cli-{}", uuid::Uuid::new_v4());
        let mapped = error.into_interface(correlation_id);
        let (error_class, exit_code) = match &mapped {
            InterfaceError::BadRequest { .. } => ("bad_request", EXIT_BAD_REQUEST),
            InterfaceError::NotFound { .. } => ("not_found", EXIT_NOT_FOUND),
            InterfaceError::Conflict { .. } => ("conflict", EXIT_CONFLICT),
            InterfaceError::ServiceUnavailable { .. } => ("service_unavailable", EXIT_UNAVAILABLE),
            InterfaceError::Internal { .. } => ("internal", EXIT_INTERNAL),
        };
        let correlation_id = match &mapped {
            InterfaceError::BadRequest { correlation_id, .. }
            | InterfaceError::NotFound { correlation_id, .. }
            | InterfaceError::Conflict { correlation_id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id, .. }
            | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
        };

        Self::failure_with(
            command,
            error_class,
            mapped.message(),
            exit_code,
            serde_json::json!({
                "user_message": mapped.user_message(),
                "correlation_id": correlation_id,
            }),
        )
    }
}

/// Loads the effective config and the catalog it points at, warning about rule
/// entries that reference unknown ingredients.
pub(crate) fn load_runtime(command: &str) -> Result<(AppConfig, FormulationCatalog), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })?;
    let catalog = config.build_catalog().map_err(|error| {
        CommandResult::failure(command, "catalog_load", error.to_string(), EXIT_CONFIG)
    })?;

    for reference in catalog.unknown_rule_references() {
        warn!(
            event_name = "catalog.rule_reference.unknown",
            table = reference.table,
            key = %reference.key,
            ingredient = %reference.ingredient,
            "rule table references an ingredient missing from the catalog"
        );
    }

    Ok((config, catalog))
}

pub(crate) fn block_on<F: Future>(command: &str, future: F) -> Result<F::Output, CommandResult> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_INTERNAL,
            )
        })?;
    Ok(runtime.block_on(future))
}

fn to_data(data: impl Serialize) -> Option<Value> {
    match serde_json::to_value(data) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(error) => Some(Value::String(format!("unserializable payload: {error}"))),
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
