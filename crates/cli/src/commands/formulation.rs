use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use dermacraft_core::{
    ApplicationError, BaseFormulation, ConcentrationCheck, DomainError, FormulationDraft,
    FormulationId, IngredientId,
};
use dermacraft_store::{
    FormulationService, InMemoryFormulationRepository, InMemoryProductRepository,
};

use crate::commands::{block_on, load_runtime, CommandResult, EXIT_BAD_REQUEST};

const VALIDATE_COMMAND: &str = "formulation validate";
const CHECK_COMMAND: &str = "formulation check";
const CLI_ACTOR: &str = "cli";

#[derive(Debug, Clone, Subcommand)]
pub enum FormulationCommand {
    #[command(about = "Validate a base formulation draft against the catalog safe ranges")]
    Validate {
        #[arg(long, help = "Path to a formulation draft TOML file")]
        file: PathBuf,
    },
    #[command(about = "Check a concentration or ingredient list against a formulation draft")]
    Check(CheckArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[arg(long, help = "Path to a formulation draft TOML file")]
    pub file: PathBuf,
    #[arg(long, requires = "percent", help = "Ingredient whose concentration is checked")]
    pub ingredient: Option<String>,
    #[arg(long, requires = "ingredient", help = "Proposed concentration in percent")]
    pub percent: Option<Decimal>,
    #[arg(long = "compat", help = "Ingredient to check for compatibility; repeatable")]
    pub compat: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    formulation_id: FormulationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    concentration: Option<ConcentrationCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    incompatible: Option<Vec<IngredientId>>,
}

pub fn run(command: FormulationCommand) -> CommandResult {
    match command {
        FormulationCommand::Validate { file } => validate(&file),
        FormulationCommand::Check(args) => check(args),
    }
}

fn validate(file: &Path) -> CommandResult {
    let (_, catalog) = match load_runtime(VALIDATE_COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let draft = match read_draft(file) {
        Ok(draft) => draft,
        Err(error) => return draft_failure(VALIDATE_COMMAND, error),
    };

    match BaseFormulation::create(draft, &catalog, CLI_ACTOR, Utc::now()) {
        Ok(formulation) => CommandResult::success_with(
            VALIDATE_COMMAND,
            format!("formulation `{}` is valid", formulation.name),
            formulation,
        ),
        Err(DomainError::InvalidFormulation(violations)) => CommandResult::failure_with(
            VALIDATE_COMMAND,
            "invalid_formulation",
            format!("{} violation(s) found", violations.len()),
            EXIT_BAD_REQUEST,
            serde_json::json!({ "violations": violations }),
        ),
        Err(error) => {
            CommandResult::from_application_error(VALIDATE_COMMAND, ApplicationError::from(error))
        }
    }
}

fn check(args: CheckArgs) -> CommandResult {
    let concentration_request = args.ingredient.zip(args.percent);
    if concentration_request.is_none() && args.compat.is_empty() {
        return CommandResult::failure(
            CHECK_COMMAND,
            "bad_request",
            "nothing to check: pass --ingredient with --percent, or --compat",
            EXIT_BAD_REQUEST,
        );
    }

    let (config, catalog) = match load_runtime(CHECK_COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let draft = match read_draft(&args.file) {
        Ok(draft) => draft,
        Err(error) => return draft_failure(CHECK_COMMAND, error),
    };

    let service = FormulationService::new(
        Arc::new(catalog),
        config.pricing,
        InMemoryFormulationRepository::default(),
        InMemoryProductRepository::default(),
    );
    let compat = args.compat.iter().map(|key| IngredientId::from(key.trim())).collect::<Vec<_>>();

    let outcome = block_on(CHECK_COMMAND, async {
        let formulation = service.create_formulation(draft, CLI_ACTOR).await?;

        let concentration = match &concentration_request {
            Some((ingredient, percent)) => Some(
                service
                    .check_concentration(
                        &formulation.id,
                        &IngredientId::from(ingredient.trim()),
                        *percent,
                    )
                    .await?,
            ),
            None => None,
        };
        let incompatible = if compat.is_empty() {
            None
        } else {
            Some(service.check_compatibility(&formulation.id, &compat).await?)
        };

        Ok::<_, ApplicationError>(CheckReport {
            formulation_id: formulation.id,
            concentration,
            incompatible,
        })
    });

    match outcome {
        Ok(Ok(report)) => {
            let message = summarize_check(&report);
            CommandResult::success_with(CHECK_COMMAND, message, report)
        }
        Ok(Err(error)) => CommandResult::from_application_error(CHECK_COMMAND, error),
        Err(failure) => failure,
    }
}

fn summarize_check(report: &CheckReport) -> String {
    let mut parts = Vec::new();
    if let Some(check) = &report.concentration {
        let verdict = if check.valid { "within range" } else { "out of range" };
        parts.push(format!("{} at {}% is {verdict}", check.ingredient, check.percent));
    }
    if let Some(incompatible) = &report.incompatible {
        parts.push(format!("{} incompatible ingredient(s)", incompatible.len()));
    }
    parts.join("; ")
}

fn read_draft(path: &Path) -> anyhow::Result<FormulationDraft> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read draft file `{}`", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("could not parse draft file `{}`", path.display()))
}

fn draft_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "draft_file", format!("{error:#}"), EXIT_BAD_REQUEST)
}
