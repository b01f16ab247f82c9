use clap::Args;
use serde::Serialize;

use dermacraft_core::{ComplexityPricingEngine, IngredientId, PricingEngine, PricingResult};

use crate::commands::{load_runtime, CommandResult, EXIT_BAD_REQUEST};

const COMMAND: &str = "price";

#[derive(Debug, Clone, Default, Args)]
pub struct PriceArgs {
    #[arg(long = "ingredient", help = "Ingredient key to include; repeatable")]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    ingredients: Vec<IngredientId>,
    /// Keys priced at zero because the catalog does not know them.
    unknown: Vec<IngredientId>,
    pricing: PricingResult,
}

pub fn run(args: PriceArgs) -> CommandResult {
    let (config, catalog) = match load_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let mut ingredients = Vec::with_capacity(args.ingredients.len());
    for raw in &args.ingredients {
        let key = raw.trim();
        if key.is_empty() {
            return CommandResult::failure(
                COMMAND,
                "bad_request",
                "ingredient keys must not be blank",
                EXIT_BAD_REQUEST,
            );
        }
        let id = IngredientId::from(key);
        if ingredients.contains(&id) {
            return CommandResult::failure(
                COMMAND,
                "bad_request",
                format!("ingredient `{id}` is listed more than once"),
                EXIT_BAD_REQUEST,
            );
        }
        ingredients.push(id);
    }

    let engine = ComplexityPricingEngine::new(&catalog, config.pricing);
    let pricing = engine.price_with_trace(&ingredients);
    let unknown =
        ingredients.iter().filter(|id| catalog.ingredient(id).is_none()).cloned().collect();

    let message = format!("{} ingredient(s) priced at {}", ingredients.len(), pricing.total);
    CommandResult::success_with(COMMAND, message, PriceReport { ingredients, unknown, pricing })
}
