use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::formulation::BaseFormulation;
use crate::domain::ingredient::{ConcentrationRange, IngredientId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeViolation {
    pub code: String,
    pub ingredient: Option<IngredientId>,
    pub message: String,
    pub suggestion: Option<String>,
}

impl RangeViolation {
    pub(crate) fn blank_name() -> Self {
        Self {
            code: "BLANK_NAME".to_string(),
            ingredient: None,
            message: "Formulation name must not be blank".to_string(),
            suggestion: Some("Provide a unique, descriptive name".to_string()),
        }
    }
}

/// Where the bounds used for a concentration check came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum RangeSource {
    Declared { range: ConcentrationRange },
    CatalogSafeRange { range: ConcentrationRange },
    Undeclared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationCheck {
    pub ingredient: IngredientId,
    pub percent: Decimal,
    pub valid: bool,
    pub source: RangeSource,
}

pub trait ConcentrationValidator: Send + Sync {
    fn check_concentration(
        &self,
        formulation: &BaseFormulation,
        ingredient: &IngredientId,
        percent: Decimal,
    ) -> ConcentrationCheck;

    fn validate_concentration(
        &self,
        formulation: &BaseFormulation,
        ingredient: &IngredientId,
        percent: Decimal,
    ) -> bool {
        self.check_concentration(formulation, ingredient, percent).valid
    }
}

/// Falls back to the catalog-wide safe range when the formulation declares no
/// range for the ingredient; rejects when neither exists.
pub struct SafeRangeConcentrationValidator<'a> {
    safe_ranges: &'a BTreeMap<IngredientId, ConcentrationRange>,
}

impl<'a> SafeRangeConcentrationValidator<'a> {
    pub fn new(safe_ranges: &'a BTreeMap<IngredientId, ConcentrationRange>) -> Self {
        Self { safe_ranges }
    }
}

impl ConcentrationValidator for SafeRangeConcentrationValidator<'_> {
    fn check_concentration(
        &self,
        formulation: &BaseFormulation,
        ingredient: &IngredientId,
        percent: Decimal,
    ) -> ConcentrationCheck {
        let source = match formulation.concentration_ranges.get(ingredient) {
            Some(range) => RangeSource::Declared { range: *range },
            None => match self.safe_ranges.get(ingredient) {
                Some(range) => RangeSource::CatalogSafeRange { range: *range },
                None => RangeSource::Undeclared,
            },
        };

        let valid = match &source {
            RangeSource::Declared { range } | RangeSource::CatalogSafeRange { range } => {
                range.contains(percent)
            }
            RangeSource::Undeclared => false,
        };

        ConcentrationCheck { ingredient: ingredient.clone(), percent, valid, source }
    }
}

/// Every requested ingredient the formulation does not allow, in request order.
pub fn check_ingredient_compatibility(
    formulation: &BaseFormulation,
    ingredients: &[IngredientId],
) -> Vec<IngredientId> {
    let allowed = formulation.universal_ingredients.iter().collect::<HashSet<_>>();
    let mut reported = HashSet::new();

    ingredients
        .iter()
        .filter(|ingredient| !allowed.contains(ingredient))
        .filter(|ingredient| reported.insert(*ingredient))
        .cloned()
        .collect()
}

pub fn validate_formulation_ranges(
    candidate: &BTreeMap<IngredientId, ConcentrationRange>,
    safe_ranges: &BTreeMap<IngredientId, ConcentrationRange>,
) -> Vec<RangeViolation> {
    let mut violations = Vec::new();

    for (ingredient, range) in candidate {
        if range.min < Decimal::ZERO || range.max > Decimal::ONE_HUNDRED {
            violations.push(RangeViolation {
                code: "OUT_OF_PERCENT_SCALE".to_string(),
                ingredient: Some(ingredient.clone()),
                message: format!("{ingredient} range {range} is outside 0%..=100%"),
                suggestion: Some("Express concentrations as percentages between 0 and 100".to_string()),
            });
        }

        if !range.is_ordered() {
            violations.push(RangeViolation {
                code: "RANGE_INVERTED".to_string(),
                ingredient: Some(ingredient.clone()),
                message: format!(
                    "{ingredient} minimum {}% must be lower than maximum {}%",
                    range.min, range.max
                ),
                suggestion: Some("Swap or widen the bounds so that min < max".to_string()),
            });
        }

        let Some(safe) = safe_ranges.get(ingredient) else {
            continue;
        };

        if range.min < safe.min {
            violations.push(RangeViolation {
                code: "BELOW_SAFE_MINIMUM".to_string(),
                ingredient: Some(ingredient.clone()),
                message: format!(
                    "{ingredient} minimum {}% is below the safe minimum {}%",
                    range.min, safe.min
                ),
                suggestion: Some(format!("Use a minimum of at least {}%", safe.min)),
            });
        }

        if range.max > safe.max {
            violations.push(RangeViolation {
                code: "ABOVE_SAFE_MAXIMUM".to_string(),
                ingredient: Some(ingredient.clone()),
                message: format!(
                    "{ingredient} maximum {}% exceeds the safe maximum {}%",
                    range.max, safe.max
                ),
                suggestion: Some(format!("Use a maximum of at most {}%", safe.max)),
            });
        }
    }

    violations
}
