use std::collections::BTreeMap;

use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde::Serialize;

use dermacraft_core::engine::composition::Exclusion;
use dermacraft_core::{
    ApplicationError, IngredientId, PricingResult, ProductFactory, Profile, ProfileInput,
};

use crate::commands::{load_runtime, CommandResult};

const COMMAND: &str = "synthesize";

#[derive(Debug, Clone, Default, Args)]
pub struct SynthesizeArgs {
    #[arg(long = "skin-type", help = "dry|oily|combination|sensitive")]
    pub skin_type: Option<String>,
    #[arg(long = "concern", help = "blemish|wrinkle|spots|soothe; repeat for secondary concerns")]
    pub concerns: Vec<String>,
    #[arg(long, help = "urban|tropical|moderate")]
    pub environment: Option<String>,
    #[arg(long = "allergy", help = "Allergy category to avoid; repeatable")]
    pub allergies: Vec<String>,
    #[arg(long, help = "Seed the name picker for reproducible output")]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SynthesisReport {
    profile_fingerprint: String,
    name: String,
    description: String,
    ingredients: Vec<IngredientId>,
    concentrations: BTreeMap<IngredientId, Decimal>,
    benefits: Vec<String>,
    excluded: Vec<Exclusion>,
    alternatives: Vec<IngredientId>,
    total_price: Decimal,
    pricing: PricingResult,
}

pub fn run(args: SynthesizeArgs) -> CommandResult {
    let (config, catalog) = match load_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let input = ProfileInput {
        skin_type: args.skin_type,
        skin_concerns: args.concerns,
        environmental_factors: args.environment,
        allergies: args.allergies,
    };
    let profile = match Profile::try_from(input) {
        Ok(profile) => profile,
        Err(error) => {
            return CommandResult::from_application_error(COMMAND, ApplicationError::from(error))
        }
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let factory = ProductFactory::from_catalog(&catalog, config.pricing);
    let outcome = factory.synthesize(&profile, &mut rng);

    let report = SynthesisReport {
        profile_fingerprint: profile.fingerprint(),
        alternatives: catalog.alternatives_for(&profile.allergies),
        name: outcome.name,
        description: outcome.description,
        ingredients: outcome.composition.ingredients,
        concentrations: outcome.composition.concentrations,
        benefits: outcome.composition.benefits,
        excluded: outcome.composition.excluded,
        total_price: outcome.pricing.total,
        pricing: outcome.pricing,
    };

    let message = format!("synthesized `{}` at {}", report.name, report.total_price);
    CommandResult::success_with(COMMAND, message, report)
}
