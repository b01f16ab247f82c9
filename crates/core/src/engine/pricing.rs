use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ingredient::IngredientId;
use crate::engine::catalog::FormulationCatalog;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub base_price: Decimal,
    /// Added to the multiplier once per ingredient.
    pub complexity_step: Decimal,
    /// Totals are rounded up to a multiple of this amount.
    pub rounding_increment: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            base_price: Decimal::new(2500, 2),
            complexity_step: Decimal::new(5, 2),
            rounding_increment: Decimal::new(50, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Decimal,
    pub multiplier: Decimal,
    pub total: Decimal,
    pub steps: Vec<PricingTraceStep>,
}

pub trait PricingEngine: Send + Sync {
    fn price_with_trace(&self, ingredients: &[IngredientId]) -> PricingResult;

    fn price(&self, ingredients: &[IngredientId]) -> Decimal {
        self.price_with_trace(ingredients).total
    }
}

pub struct ComplexityPricingEngine<'a> {
    catalog: &'a FormulationCatalog,
    policy: PricingPolicy,
}

impl<'a> ComplexityPricingEngine<'a> {
    pub fn new(catalog: &'a FormulationCatalog, policy: PricingPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }
}

impl PricingEngine for ComplexityPricingEngine<'_> {
    fn price_with_trace(&self, ingredients: &[IngredientId]) -> PricingResult {
        let mut steps = vec![PricingTraceStep {
            stage: "base".to_string(),
            detail: "base price".to_string(),
            amount: self.policy.base_price,
        }];

        let mut subtotal = self.policy.base_price;
        for ingredient in ingredients {
            let unit_price = self.catalog.unit_price(ingredient);
            subtotal += unit_price;
            steps.push(PricingTraceStep {
                stage: "ingredient".to_string(),
                detail: ingredient.to_string(),
                amount: unit_price,
            });
        }

        let multiplier =
            Decimal::ONE + self.policy.complexity_step * Decimal::from(ingredients.len());
        let raw_total = subtotal * multiplier;
        steps.push(PricingTraceStep {
            stage: "complexity".to_string(),
            detail: format!("subtotal * (1 + {} * {})", self.policy.complexity_step, ingredients.len()),
            amount: raw_total,
        });

        let total = round_up_to(raw_total, self.policy.rounding_increment);
        steps.push(PricingTraceStep {
            stage: "rounding".to_string(),
            detail: format!("ceil to nearest {}", self.policy.rounding_increment),
            amount: total,
        });

        PricingResult { subtotal, multiplier, total, steps }
    }
}

pub fn round_up_to(amount: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return amount;
    }
    ((amount / increment).ceil() * increment).normalize()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{round_up_to, ComplexityPricingEngine, PricingEngine, PricingPolicy};
    use crate::domain::ingredient::IngredientId;
    use crate::engine::catalog::FormulationCatalog;

    fn ids(values: &[&str]) -> Vec<IngredientId> {
        values.iter().map(|value| IngredientId::from(*value)).collect()
    }

    #[test]
    fn dry_wrinkle_moderate_prices_to_expected_total() {
        let catalog = FormulationCatalog::standard();
        let engine = ComplexityPricingEngine::new(&catalog, PricingPolicy::default());

        let result =
            engine.price_with_trace(&ids(&["hyaluronic_acid", "beta_glucan", "peptides", "vitamin_c"]));

        // (25 + 8 + 6 + 12 + 10) * 1.20 = 73.20 -> 73.50
        assert_eq!(result.subtotal, Decimal::new(6100, 2));
        assert_eq!(result.multiplier, Decimal::new(120, 2));
        assert_eq!(result.total, Decimal::new(7350, 2));
        assert_eq!(result.steps.len(), 7);
        assert_eq!(result.steps.last().map(|step| step.stage.as_str()), Some("rounding"));
    }

    #[test]
    fn empty_list_prices_at_base() {
        let catalog = FormulationCatalog::standard();
        let engine = ComplexityPricingEngine::new(&catalog, PricingPolicy::default());
        assert_eq!(engine.price(&[]), Decimal::new(2500, 2));
    }

    #[test]
    fn unknown_ingredient_adds_zero_but_still_counts_toward_complexity() {
        let catalog = FormulationCatalog::standard();
        let engine = ComplexityPricingEngine::new(&catalog, PricingPolicy::default());

        // 25 * 1.05 = 26.25 -> 26.50
        assert_eq!(engine.price(&ids(&["moon_dust"])), Decimal::new(2650, 2));
    }

    #[test]
    fn price_is_monotonic_and_on_half_unit_grid() {
        let catalog = FormulationCatalog::standard();
        let engine = ComplexityPricingEngine::new(&catalog, PricingPolicy::default());
        let all = catalog.ingredients.keys().cloned().collect::<Vec<_>>();
        let half = Decimal::new(50, 2);

        let mut previous = Decimal::ZERO;
        for len in 0..=all.len() {
            let price = engine.price(&all[..len]);
            assert!(price >= previous, "price must not drop when an ingredient is added");
            assert!((price % half).is_zero(), "{price} is not a multiple of 0.50");
            assert!(price >= PricingPolicy::default().base_price);
            previous = price;
        }
    }

    #[test]
    fn rounding_only_moves_upward() {
        assert_eq!(round_up_to(Decimal::new(7320, 2), Decimal::new(50, 2)), Decimal::new(7350, 2));
        assert_eq!(round_up_to(Decimal::new(7350, 2), Decimal::new(50, 2)), Decimal::new(7350, 2));
        assert_eq!(round_up_to(Decimal::new(7351, 2), Decimal::new(50, 2)), Decimal::new(74, 0));
    }
}
