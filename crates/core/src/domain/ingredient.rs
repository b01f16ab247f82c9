use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::profile::{Environment, SkinConcern, SkinType};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(pub String);

impl IngredientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IngredientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which profiles an ingredient is recommended for. Informational only; the
/// rule tables decide what is actually selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    #[serde(default)]
    pub skin_types: Vec<SkinType>,
    #[serde(default)]
    pub concerns: Vec<SkinConcern>,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub benefit: String,
    pub unit_price: Decimal,
    /// Default formulated concentration as a fraction in `0..=1`.
    pub concentration: Decimal,
    pub keyword: String,
    #[serde(default)]
    pub applicability: Applicability,
}

/// Inclusive percentage bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl ConcentrationRange {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, percent: Decimal) -> bool {
        percent >= self.min && percent <= self.max
    }

    pub fn is_ordered(&self) -> bool {
        self.min < self.max
    }

    pub fn within(&self, outer: &ConcentrationRange) -> bool {
        self.min >= outer.min && self.max <= outer.max
    }
}

impl fmt::Display for ConcentrationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%..={}%", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ConcentrationRange;

    #[test]
    fn range_bounds_are_inclusive() {
        let range = ConcentrationRange::new(Decimal::new(60, 0), Decimal::new(80, 0));

        assert!(range.contains(Decimal::new(60, 0)));
        assert!(range.contains(Decimal::new(80, 0)));
        assert!(!range.contains(Decimal::new(5999, 2)));
        assert!(!range.contains(Decimal::new(8001, 2)));
    }

    #[test]
    fn nested_range_check_uses_both_edges() {
        let outer = ConcentrationRange::new(Decimal::new(50, 0), Decimal::new(85, 0));

        assert!(ConcentrationRange::new(Decimal::new(50, 0), Decimal::new(85, 0)).within(&outer));
        assert!(!ConcentrationRange::new(Decimal::new(45, 0), Decimal::new(70, 0)).within(&outer));
        assert!(!ConcentrationRange::new(Decimal::new(60, 0), Decimal::new(90, 0)).within(&outer));
    }
}
