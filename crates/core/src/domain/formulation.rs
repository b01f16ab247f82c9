use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ingredient::{ConcentrationRange, IngredientId};
use crate::domain::profile::SkinType;
use crate::engine::catalog::FormulationCatalog;
use crate::engine::concentration::{validate_formulation_ranges, RangeViolation};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulationId(pub String);

impl FormulationId {
    pub fn generate() -> Self {
        Self(format!("BF-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for FormulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulationStatus {
    Active,
    Inactive,
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulationCategory {
    Serum,
    Cream,
    Toner,
    Cleanser,
    Essence,
    Mask,
}

impl FromStr for FormulationCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "serum" => Ok(Self::Serum),
            "cream" => Ok(Self::Cream),
            "toner" => Ok(Self::Toner),
            "cleanser" => Ok(Self::Cleanser),
            "essence" => Ok(Self::Essence),
            "mask" => Ok(Self::Mask),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported formulation category `{other}` (expected serum|cream|toner|cleanser|essence|mask)"
            ))),
        }
    }
}

/// Admin-entered formulation data prior to validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulationDraft {
    pub name: String,
    pub category: FormulationCategory,
    #[serde(default)]
    pub universal_ingredients: Vec<IngredientId>,
    #[serde(default)]
    pub concentration_ranges: BTreeMap<IngredientId, ConcentrationRange>,
    #[serde(default)]
    pub skin_type_compatibility: BTreeSet<SkinType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFormulation {
    pub id: FormulationId,
    pub name: String,
    pub category: FormulationCategory,
    pub universal_ingredients: Vec<IngredientId>,
    pub concentration_ranges: BTreeMap<IngredientId, ConcentrationRange>,
    pub skin_type_compatibility: BTreeSet<SkinType>,
    pub status: FormulationStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BaseFormulation {
    /// Validates the draft against the catalog's safe ranges. Every violation
    /// is reported, not only the first.
    pub fn create(
        draft: FormulationDraft,
        catalog: &FormulationCatalog,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = draft.name.trim().to_string();
        let mut violations = Vec::new();
        if name.is_empty() {
            violations.push(RangeViolation::blank_name());
        }
        violations.extend(validate_formulation_ranges(
            &draft.concentration_ranges,
            &catalog.safe_ranges,
        ));
        if !violations.is_empty() {
            return Err(DomainError::InvalidFormulation(violations));
        }

        let mut universal_ingredients = Vec::with_capacity(draft.universal_ingredients.len());
        for ingredient in draft.universal_ingredients {
            if !universal_ingredients.contains(&ingredient) {
                universal_ingredients.push(ingredient);
            }
        }

        Ok(Self {
            id: FormulationId::generate(),
            name,
            category: draft.category,
            universal_ingredients,
            concentration_ranges: draft.concentration_ranges,
            skin_type_compatibility: draft.skin_type_compatibility,
            status: FormulationStatus::Active,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn clone_as(
        &self,
        new_name: impl Into<String>,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status == FormulationStatus::Deleted {
            return Err(DomainError::InvalidFormulationTransition {
                from: self.status,
                to: FormulationStatus::Active,
            });
        }

        let name = new_name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvalidFormulation(vec![RangeViolation::blank_name()]));
        }

        Ok(Self {
            id: FormulationId::generate(),
            name,
            category: self.category,
            universal_ingredients: self.universal_ingredients.clone(),
            concentration_ranges: self.concentration_ranges.clone(),
            skin_type_compatibility: self.skin_type_compatibility.clone(),
            status: FormulationStatus::Active,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == FormulationStatus::Active
    }

    /// An empty compatibility set accepts every skin type.
    pub fn accepts_skin_type(&self, skin_type: SkinType) -> bool {
        self.skin_type_compatibility.is_empty() || self.skin_type_compatibility.contains(&skin_type)
    }

    pub fn can_transition_to(&self, next: FormulationStatus) -> bool {
        matches!(
            (self.status, next),
            (FormulationStatus::Active, FormulationStatus::Inactive)
                | (FormulationStatus::Active, FormulationStatus::Deleted)
                | (FormulationStatus::Inactive, FormulationStatus::Deleted)
        )
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(FormulationStatus::Inactive, now)
    }

    pub fn mark_deleted(
        &mut self,
        referencing_products: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if referencing_products > 0 && self.status != FormulationStatus::Deleted {
            return Err(DomainError::FormulationInUse {
                formulation_id: self.id.clone(),
                referencing_products,
            });
        }
        self.transition_to(FormulationStatus::Deleted, now)
    }

    fn transition_to(
        &mut self,
        next: FormulationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidFormulationTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{BaseFormulation, FormulationCategory, FormulationDraft, FormulationStatus};
    use crate::domain::ingredient::{ConcentrationRange, IngredientId};
    use crate::domain::profile::SkinType;
    use crate::engine::catalog::FormulationCatalog;
    use crate::errors::DomainError;

    fn draft(ranges: &[(&str, i64, i64)]) -> FormulationDraft {
        FormulationDraft {
            name: "Hydra Base".to_string(),
            category: FormulationCategory::Serum,
            universal_ingredients: vec![IngredientId::from("water"), IngredientId::from("glycerin")],
            concentration_ranges: ranges
                .iter()
                .map(|(id, min, max)| {
                    (
                        IngredientId::from(*id),
                        ConcentrationRange::new(Decimal::new(*min, 0), Decimal::new(*max, 0)),
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            skin_type_compatibility: BTreeSet::from([SkinType::Dry]),
        }
    }

    fn formulation() -> BaseFormulation {
        BaseFormulation::create(
            draft(&[("water", 60, 80), ("glycerin", 3, 8)]),
            &FormulationCatalog::standard(),
            "admin-1",
            Utc::now(),
        )
        .expect("valid formulation")
    }

    #[test]
    fn create_accepts_ranges_inside_catalog_bounds() {
        let formulation = formulation();
        assert_eq!(formulation.status, FormulationStatus::Active);
        assert_eq!(formulation.universal_ingredients.len(), 2);
        assert!(formulation.id.0.starts_with("BF-"));
    }

    #[test]
    fn create_rejects_inverted_range_and_reports_every_violation() {
        let error = BaseFormulation::create(
            draft(&[("water", 80, 60), ("glycerin", 1, 40)]),
            &FormulationCatalog::standard(),
            "admin-1",
            Utc::now(),
        )
        .expect_err("inverted range must be rejected");

        let DomainError::InvalidFormulation(violations) = error else {
            panic!("expected InvalidFormulation");
        };
        assert!(violations.iter().any(|v| v.code == "RANGE_INVERTED" && v.ingredient.as_ref().map(|i| i.as_str()) == Some("water")));
        assert!(violations.iter().any(|v| v.code == "BELOW_SAFE_MINIMUM"));
        assert!(violations.iter().any(|v| v.code == "ABOVE_SAFE_MAXIMUM"));
    }

    #[test]
    fn clone_copies_composition_data_under_new_identity() {
        let original = formulation();
        let copy = original.clone_as("Hydra Base II", "admin-2", Utc::now()).expect("clone");

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Hydra Base II");
        assert_eq!(copy.concentration_ranges, original.concentration_ranges);
        assert_eq!(copy.skin_type_compatibility, original.skin_type_compatibility);
        assert_eq!(copy.created_by, "admin-2");
    }

    #[test]
    fn deactivate_is_one_way() {
        let mut formulation = formulation();
        formulation.deactivate(Utc::now()).expect("active -> inactive");
        assert_eq!(formulation.status, FormulationStatus::Inactive);

        let error = formulation.deactivate(Utc::now()).expect_err("inactive -> inactive");
        assert!(matches!(error, DomainError::InvalidFormulationTransition { .. }));
    }

    #[test]
    fn delete_refused_while_products_reference_it() {
        let mut formulation = formulation();
        let error = formulation.mark_deleted(3, Utc::now()).expect_err("referenced");
        assert!(matches!(
            error,
            DomainError::FormulationInUse { referencing_products: 3, .. }
        ));
        assert_eq!(formulation.status, FormulationStatus::Active);

        formulation.deactivate(Utc::now()).expect("deactivate");
        formulation.mark_deleted(0, Utc::now()).expect("inactive -> deleted");
        assert_eq!(formulation.status, FormulationStatus::Deleted);
        assert!(formulation.mark_deleted(0, Utc::now()).is_err());
    }

    #[test]
    fn empty_compatibility_accepts_any_skin_type() {
        let mut formulation = formulation();
        assert!(formulation.accepts_skin_type(SkinType::Dry));
        assert!(!formulation.accepts_skin_type(SkinType::Oily));

        formulation.skin_type_compatibility.clear();
        assert!(formulation.accepts_skin_type(SkinType::Oily));
    }
}
