use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::formulation::FormulationId;
use crate::domain::ingredient::IngredientId;
use crate::domain::profile::Profile;
use crate::engine::pricing::PricingPolicy;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn generate() -> Self {
        Self(format!("CP-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthesized product. Field names follow the stored record layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProduct {
    pub id: ProductId,
    #[serde(default)]
    pub base_formulation_id: Option<FormulationId>,
    pub profile_data: Profile,
    pub selected_ingredients: Vec<IngredientId>,
    pub final_ingredient_concentrations: BTreeMap<IngredientId, Decimal>,
    pub name: String,
    pub description: String,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomProduct {
    pub fn check_invariants(&self, policy: &PricingPolicy) -> Result<(), DomainError> {
        if self.total_price < policy.base_price {
            return Err(DomainError::InvariantViolation(format!(
                "total price {} is below base price {}",
                self.total_price, policy.base_price
            )));
        }

        if !policy.rounding_increment.is_zero()
            && !(self.total_price % policy.rounding_increment).is_zero()
        {
            return Err(DomainError::InvariantViolation(format!(
                "total price {} is not a multiple of {}",
                self.total_price, policy.rounding_increment
            )));
        }

        let mut seen = HashSet::with_capacity(self.selected_ingredients.len());
        for ingredient in &self.selected_ingredients {
            if !seen.insert(ingredient) {
                return Err(DomainError::InvariantViolation(format!(
                    "ingredient {ingredient} is selected more than once"
                )));
            }
        }

        let concentration_keys = self.final_ingredient_concentrations.keys().collect::<HashSet<_>>();
        if concentration_keys != seen {
            return Err(DomainError::InvariantViolation(
                "concentration entries do not match selected ingredients".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{CustomProduct, ProductId};
    use crate::domain::ingredient::IngredientId;
    use crate::domain::profile::{Environment, Profile, SkinConcern, SkinType};
    use crate::engine::pricing::PricingPolicy;
    use crate::errors::DomainError;

    fn product() -> CustomProduct {
        CustomProduct {
            id: ProductId("CP-1".to_string()),
            base_formulation_id: None,
            profile_data: Profile::new(
                SkinType::Oily,
                [SkinConcern::Blemish],
                Environment::Urban,
                [],
            )
            .expect("profile"),
            selected_ingredients: vec![IngredientId::from("niacinamide")],
            final_ingredient_concentrations: BTreeMap::from([(
                IngredientId::from("niacinamide"),
                Decimal::new(5, 2),
            )]),
            name: "Dermacraft Matte-Clarity Serum".to_string(),
            description: "Specially formulated for Oily skin.".to_string(),
            total_price: Decimal::new(3200, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn serializes_with_stored_record_field_names() {
        let json = serde_json::to_value(product()).expect("serialize");

        assert!(json.get("profile_data").is_some());
        assert_eq!(json["selected_ingredients"][0], "niacinamide");
        assert!(json["final_ingredient_concentrations"].get("niacinamide").is_some());
        assert!(json.get("total_price").is_some());
    }

    #[test]
    fn invariant_check_flags_mismatched_concentrations() {
        let policy = PricingPolicy::default();
        assert!(product().check_invariants(&policy).is_ok());

        let mut broken = product();
        broken.final_ingredient_concentrations.insert(IngredientId::from("retinol"), Decimal::ONE);
        assert!(matches!(
            broken.check_invariants(&policy),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn invariant_check_flags_price_below_base_or_off_increment() {
        let policy = PricingPolicy::default();

        let mut cheap = product();
        cheap.total_price = Decimal::new(1000, 2);
        assert!(cheap.check_invariants(&policy).is_err());

        let mut odd = product();
        odd.total_price = Decimal::new(3225, 2);
        assert!(odd.check_invariants(&policy).is_err());
    }
}
