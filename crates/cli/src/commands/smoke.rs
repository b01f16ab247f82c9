use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde::Serialize;

use dermacraft_core::{
    ApplicationError, ConcentrationRange, DomainError, FormulationCategory, FormulationDraft,
    IngredientId, ProfileInput, SkinType,
};
use dermacraft_store::{
    FormulationService, InMemoryFormulationRepository, InMemoryProductRepository,
};

use crate::commands::{load_runtime, CommandResult, EXIT_SMOKE_FAILED};

const SMOKE_SEED: u64 = 42;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

type Service = FormulationService<InMemoryFormulationRepository, InMemoryProductRepository>;

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let runtime_started = Instant::now();
    let (config, catalog) = match load_runtime("smoke") {
        Ok(runtime) => runtime,
        Err(failure) => {
            checks.push(SmokeCheck {
                name: "config_and_catalog",
                status: SmokeStatus::Fail,
                elapsed_ms: runtime_started.elapsed().as_millis() as u64,
                message: failure.output,
            });
            checks.push(skipped("formulation_create"));
            checks.push(skipped("product_create"));
            checks.push(skipped("delete_refused_while_referenced"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };
    checks.push(SmokeCheck {
        name: "config_and_catalog",
        status: SmokeStatus::Pass,
        elapsed_ms: runtime_started.elapsed().as_millis() as u64,
        message: format!("catalog loaded with {} ingredients", catalog.ingredients.len()),
    });

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "formulation_create",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("product_create"));
            checks.push(skipped("delete_refused_while_referenced"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let service: Service = FormulationService::new(
        Arc::new(catalog),
        config.pricing,
        InMemoryFormulationRepository::default(),
        InMemoryProductRepository::default(),
    );

    let formulation_started = Instant::now();
    let formulation =
        match runtime.block_on(service.create_formulation(smoke_draft(), "smoke")) {
            Ok(formulation) => {
                checks.push(SmokeCheck {
                    name: "formulation_create",
                    status: SmokeStatus::Pass,
                    elapsed_ms: formulation_started.elapsed().as_millis() as u64,
                    message: format!("created `{}` ({})", formulation.name, formulation.id),
                });
                formulation
            }
            Err(error) => {
                checks.push(failed("formulation_create", formulation_started, &error));
                checks.push(skipped("product_create"));
                checks.push(skipped("delete_refused_while_referenced"));
                return finalize_report(checks, started.elapsed().as_millis() as u64);
            }
        };

    let product_started = Instant::now();
    let mut rng = StdRng::seed_from_u64(SMOKE_SEED);
    let product = runtime.block_on(service.create_product(
        smoke_profile(),
        Some(formulation.id.clone()),
        None,
        &mut rng,
    ));
    match product {
        Ok(product) => checks.push(SmokeCheck {
            name: "product_create",
            status: SmokeStatus::Pass,
            elapsed_ms: product_started.elapsed().as_millis() as u64,
            message: format!(
                "`{}` with {} ingredient(s) at {}",
                product.name,
                product.selected_ingredients.len(),
                product.total_price
            ),
        }),
        Err(error) => {
            checks.push(failed("product_create", product_started, &error));
            checks.push(skipped("delete_refused_while_referenced"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    let delete_started = Instant::now();
    checks.push(match runtime.block_on(service.delete_formulation(&formulation.id)) {
        Err(ApplicationError::Domain(DomainError::FormulationInUse {
            referencing_products, ..
        })) => SmokeCheck {
            name: "delete_refused_while_referenced",
            status: SmokeStatus::Pass,
            elapsed_ms: delete_started.elapsed().as_millis() as u64,
            message: format!("delete refused with {referencing_products} referencing product(s)"),
        },
        Err(error) => failed("delete_refused_while_referenced", delete_started, &error),
        Ok(()) => SmokeCheck {
            name: "delete_refused_while_referenced",
            status: SmokeStatus::Fail,
            elapsed_ms: delete_started.elapsed().as_millis() as u64,
            message: "formulation was deleted while a product referenced it".to_string(),
        },
    });

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn smoke_draft() -> FormulationDraft {
    FormulationDraft {
        name: "Smoke Hydra Base".to_string(),
        category: FormulationCategory::Serum,
        universal_ingredients: vec![IngredientId::from("water"), IngredientId::from("glycerin")],
        concentration_ranges: BTreeMap::from([
            (
                IngredientId::from("water"),
                ConcentrationRange::new(Decimal::new(60, 0), Decimal::new(80, 0)),
            ),
            (
                IngredientId::from("glycerin"),
                ConcentrationRange::new(Decimal::new(3, 0), Decimal::new(8, 0)),
            ),
        ]),
        skin_type_compatibility: BTreeSet::from([SkinType::Dry]),
    }
}

fn smoke_profile() -> ProfileInput {
    ProfileInput {
        skin_type: Some("dry".to_string()),
        skin_concerns: vec!["wrinkle".to_string()],
        environmental_factors: Some("moderate".to_string()),
        allergies: Vec::new(),
    }
}

fn failed(name: &'static str, started: Instant, error: &ApplicationError) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Fail,
        elapsed_ms: started.elapsed().as_millis() as u64,
        message: error.to_string(),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult {
        exit_code: if failed { EXIT_SMOKE_FAILED } else { 0 },
        output: format!("{human}\n{machine}"),
    }
}
