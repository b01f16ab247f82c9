use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ingredient::IngredientId;
use crate::domain::profile::{AllergyCategory, Profile};
use crate::engine::catalog::FormulationCatalog;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub ingredient: IngredientId,
    pub allergy: AllergyCategory,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub ingredients: Vec<IngredientId>,
    pub concentrations: BTreeMap<IngredientId, Decimal>,
    pub benefits: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<Exclusion>,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn contains(&self, ingredient: &IngredientId) -> bool {
        self.concentrations.contains_key(ingredient)
    }
}

pub trait CompositionEngine: Send + Sync {
    fn synthesize(&self, profile: &Profile) -> Composition;
}

/// Walks the skin-type, concern and environment rule tables in that order.
pub struct RuleBasedSynthesizer<'a> {
    catalog: &'a FormulationCatalog,
}

impl<'a> RuleBasedSynthesizer<'a> {
    pub fn new(catalog: &'a FormulationCatalog) -> Self {
        Self { catalog }
    }
}

impl CompositionEngine for RuleBasedSynthesizer<'_> {
    fn synthesize(&self, profile: &Profile) -> Composition {
        let mut builder = CompositionBuilder::new(self.catalog, profile);

        if let Some(candidates) = self.catalog.rules.skin_types.get(&profile.skin_type) {
            builder.add_all(candidates);
        }

        for concern in &profile.skin_concerns {
            if let Some(candidates) = self.catalog.rules.concerns.get(concern) {
                builder.add_all(candidates);
            }
        }

        if let Some(candidates) =
            self.catalog.rules.environments.get(&profile.environmental_factors)
        {
            builder.add_all(candidates);
        }

        builder.finish()
    }
}

struct CompositionBuilder<'a> {
    catalog: &'a FormulationCatalog,
    profile: &'a Profile,
    seen: HashSet<IngredientId>,
    excluded_seen: HashSet<IngredientId>,
    composition: Composition,
}

impl<'a> CompositionBuilder<'a> {
    fn new(catalog: &'a FormulationCatalog, profile: &'a Profile) -> Self {
        Self {
            catalog,
            profile,
            seen: HashSet::new(),
            excluded_seen: HashSet::new(),
            composition: Composition::default(),
        }
    }

    fn add_all(&mut self, candidates: &[IngredientId]) {
        for candidate in candidates {
            self.add(candidate);
        }
    }

    fn add(&mut self, ingredient: &IngredientId) {
        if let Some(allergy) = self.catalog.is_excluded(ingredient, &self.profile.allergies) {
            if self.excluded_seen.insert(ingredient.clone()) {
                self.composition
                    .excluded
                    .push(Exclusion { ingredient: ingredient.clone(), allergy });
            }
            return;
        }

        if !self.seen.insert(ingredient.clone()) {
            return;
        }

        // Unknown keys still enter the list so a rule/catalog mismatch stays visible.
        let entry = self.catalog.ingredient(ingredient);
        self.composition.ingredients.push(ingredient.clone());
        self.composition.concentrations.insert(
            ingredient.clone(),
            entry.map(|entry| entry.concentration).unwrap_or(Decimal::ZERO),
        );
        if let Some(entry) = entry {
            self.composition.benefits.push(entry.benefit.clone());
        }
    }

    fn finish(self) -> Composition {
        self.composition
    }
}
