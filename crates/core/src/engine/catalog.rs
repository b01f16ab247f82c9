//! Reference data consumed by the synthesis engines.
//!
//! A [`FormulationCatalog`] is immutable once built. Engines borrow it, so one
//! catalog can back any number of concurrent synthesis calls, and alternative
//! catalogs (fixtures, regional variants) can coexist in the same process.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::ingredient::{Applicability, ConcentrationRange, Ingredient, IngredientId};
use crate::domain::profile::{AllergyCategory, Environment, SkinConcern, SkinType};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyExclusion {
    pub avoid: Vec<IngredientId>,
    #[serde(default)]
    pub alternatives: Vec<IngredientId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTables {
    #[serde(default)]
    pub skin_types: BTreeMap<SkinType, Vec<IngredientId>>,
    #[serde(default)]
    pub concerns: BTreeMap<SkinConcern, Vec<IngredientId>>,
    #[serde(default)]
    pub environments: BTreeMap<Environment, Vec<IngredientId>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingTables {
    pub brand: String,
    pub product_types: Vec<String>,
    #[serde(default)]
    pub skin_type_prefixes: BTreeMap<SkinType, Vec<String>>,
    #[serde(default)]
    pub concern_prefixes: BTreeMap<SkinConcern, Vec<String>>,
    #[serde(default)]
    pub environment_keywords: BTreeMap<Environment, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulationCatalog {
    pub ingredients: BTreeMap<IngredientId, Ingredient>,
    #[serde(default)]
    pub allergies: BTreeMap<AllergyCategory, AllergyExclusion>,
    #[serde(default)]
    pub rules: RuleTables,
    pub naming: NamingTables,
    #[serde(default)]
    pub safe_ranges: BTreeMap<IngredientId, ConcentrationRange>,
}

/// A rule table entry naming an ingredient the catalog does not define.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnknownRuleReference {
    pub table: &'static str,
    pub key: String,
    pub ingredient: IngredientId,
}

impl FormulationCatalog {
    pub fn ingredient(&self, id: &IngredientId) -> Option<&Ingredient> {
        self.ingredients.get(id)
    }

    pub fn unit_price(&self, id: &IngredientId) -> Decimal {
        self.ingredient(id).map(|ingredient| ingredient.unit_price).unwrap_or(Decimal::ZERO)
    }

    /// The first of the given allergy categories that forbids the ingredient.
    pub fn is_excluded(
        &self,
        ingredient: &IngredientId,
        allergies: &BTreeSet<AllergyCategory>,
    ) -> Option<AllergyCategory> {
        allergies.iter().copied().find(|allergy| {
            self.allergies
                .get(allergy)
                .is_some_and(|exclusion| exclusion.avoid.contains(ingredient))
        })
    }

    pub fn alternatives_for(&self, allergies: &BTreeSet<AllergyCategory>) -> Vec<IngredientId> {
        let mut alternatives = Vec::new();
        for allergy in allergies {
            let Some(exclusion) = self.allergies.get(allergy) else {
                continue;
            };
            for alternative in &exclusion.alternatives {
                let excluded = self.is_excluded(alternative, allergies).is_some();
                if !excluded && !alternatives.contains(alternative) {
                    alternatives.push(alternative.clone());
                }
            }
        }
        alternatives
    }

    pub fn unknown_rule_references(&self) -> Vec<UnknownRuleReference> {
        let mut unknown = Vec::new();
        let mut collect = |table: &'static str, key: &str, ingredients: &[IngredientId]| {
            for ingredient in ingredients {
                if !self.ingredients.contains_key(ingredient) {
                    unknown.push(UnknownRuleReference {
                        table,
                        key: key.to_string(),
                        ingredient: ingredient.clone(),
                    });
                }
            }
        };

        for (skin_type, ingredients) in &self.rules.skin_types {
            collect("skin_types", skin_type.as_str(), ingredients);
        }
        for (concern, ingredients) in &self.rules.concerns {
            collect("concerns", concern.as_str(), ingredients);
        }
        for (environment, ingredients) in &self.rules.environments {
            collect("environments", environment.as_str(), ingredients);
        }

        unknown
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (id, ingredient) in &self.ingredients {
            if ingredient.unit_price < Decimal::ZERO {
                return Err(ConfigError::Validation(format!(
                    "catalog ingredient `{id}` has a negative unit_price"
                )));
            }
            if ingredient.concentration < Decimal::ZERO || ingredient.concentration > Decimal::ONE {
                return Err(ConfigError::Validation(format!(
                    "catalog ingredient `{id}` concentration must be a fraction in 0..=1"
                )));
            }
        }

        for (id, range) in &self.safe_ranges {
            if !range.is_ordered() || range.min < Decimal::ZERO || range.max > Decimal::ONE_HUNDRED
            {
                return Err(ConfigError::Validation(format!(
                    "catalog safe range for `{id}` must satisfy 0 <= min < max <= 100"
                )));
            }
        }

        if self.naming.brand.trim().is_empty() {
            return Err(ConfigError::Validation("catalog naming.brand must not be empty".to_string()));
        }
        if self.naming.product_types.is_empty() {
            return Err(ConfigError::Validation(
                "catalog naming.product_types must list at least one product type".to_string(),
            ));
        }

        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        let catalog = Self::from_toml_str(&raw)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.naming.brand = brand.into();
        self
    }

    pub fn standard() -> Self {
        use Environment::*;
        use SkinConcern::*;
        use SkinType::*;

        let ingredients = BTreeMap::from([
            ingredient(
                "hyaluronic_acid",
                "Deep hydration and lasting moisture retention",
                800,
                2,
                "Hydrating",
                Applicability {
                    skin_types: vec![Dry, Combination],
                    concerns: vec![],
                    environments: vec![Moderate],
                },
            ),
            ingredient(
                "beta_glucan",
                "Soothes and reinforces the skin barrier",
                600,
                1,
                "Barrier-Repairing",
                Applicability {
                    skin_types: vec![Dry, Sensitive],
                    concerns: vec![Soothe],
                    environments: vec![Tropical],
                },
            ),
            ingredient(
                "niacinamide",
                "Regulates sebum and refines the look of pores",
                500,
                5,
                "Balancing",
                Applicability {
                    skin_types: vec![Oily, Combination],
                    concerns: vec![Blemish],
                    environments: vec![Urban],
                },
            ),
            ingredient(
                "salicylic_acid",
                "Unclogs pores and clears blemishes",
                650,
                2,
                "Clarifying",
                Applicability { skin_types: vec![Oily], concerns: vec![Blemish], environments: vec![] },
            ),
            ingredient(
                "centella_asiatica",
                "Calms redness and visible irritation",
                700,
                3,
                "Calming",
                Applicability {
                    skin_types: vec![Sensitive],
                    concerns: vec![Soothe],
                    environments: vec![Tropical],
                },
            ),
            ingredient(
                "peptides",
                "Supports collagen for firmer, smoother skin",
                1200,
                4,
                "Firming",
                Applicability { skin_types: vec![], concerns: vec![Wrinkle], environments: vec![Moderate] },
            ),
            ingredient(
                "vitamin_c",
                "Brightens tone and defends against free radicals",
                1000,
                10,
                "Brightening",
                Applicability {
                    skin_types: vec![],
                    concerns: vec![Wrinkle, Spots],
                    environments: vec![Urban],
                },
            ),
            ingredient(
                "alpha_arbutin",
                "Fades dark spots for a more even tone",
                900,
                2,
                "Illuminating",
                Applicability { skin_types: vec![], concerns: vec![Spots], environments: vec![] },
            ),
        ]);

        let allergies = BTreeMap::from([
            allergy(
                AllergyCategory::Preservatives,
                &["parabens", "phenoxyethanol", "methylisothiazolinone", "formaldehyde_releasers"],
                &["ethylhexylglycerin", "leuconostoc_ferment"],
            ),
            allergy(
                AllergyCategory::Fragrances,
                &["fragrance", "parfum", "linalool", "limonene", "essential_oils"],
                &["fragrance_free_base"],
            ),
            allergy(
                AllergyCategory::Sulfates,
                &["sodium_lauryl_sulfate", "sodium_laureth_sulfate", "ammonium_lauryl_sulfate"],
                &["coco_glucoside", "decyl_glucoside"],
            ),
            allergy(
                AllergyCategory::Alcohol,
                &["alcohol_denat", "ethanol", "isopropyl_alcohol"],
                &["glycerin", "propanediol"],
            ),
            allergy(
                AllergyCategory::Silicones,
                &["dimethicone", "cyclopentasiloxane", "cyclohexasiloxane"],
                &["squalane", "caprylic_capric_triglyceride"],
            ),
            allergy(
                AllergyCategory::Retinoids,
                &["retinol", "retinyl_palmitate", "retinaldehyde"],
                &["bakuchiol", "peptides"],
            ),
            allergy(
                AllergyCategory::VitaminC,
                &["vitamin_c", "ascorbic_acid", "sodium_ascorbyl_phosphate"],
                &["niacinamide", "alpha_arbutin"],
            ),
            allergy(
                AllergyCategory::Nuts,
                &["sweet_almond_oil", "argan_oil", "shea_butter", "macadamia_oil"],
                &["jojoba_oil", "squalane"],
            ),
            allergy(
                AllergyCategory::Soy,
                &["soy_extract", "soybean_oil", "hydrolyzed_soy_protein"],
                &["oat_extract", "rice_protein"],
            ),
            allergy(AllergyCategory::Lanolin, &["lanolin", "lanolin_alcohol"], &["squalane", "shea_butter"]),
        ]);

        let rules = RuleTables {
            skin_types: BTreeMap::from([
                (Dry, ids(&["hyaluronic_acid", "beta_glucan"])),
                (Oily, ids(&["niacinamide", "salicylic_acid"])),
                (Combination, ids(&["niacinamide", "hyaluronic_acid"])),
                (Sensitive, ids(&["centella_asiatica", "beta_glucan"])),
            ]),
            concerns: BTreeMap::from([
                (Blemish, ids(&["salicylic_acid", "niacinamide"])),
                (Wrinkle, ids(&["peptides", "vitamin_c"])),
                (Spots, ids(&["alpha_arbutin", "vitamin_c"])),
                (Soothe, ids(&["centella_asiatica", "beta_glucan"])),
            ]),
            environments: BTreeMap::from([
                (Urban, ids(&["vitamin_c", "niacinamide"])),
                (Tropical, ids(&["beta_glucan", "centella_asiatica"])),
                (Moderate, ids(&["peptides", "hyaluronic_acid"])),
            ]),
        };

        let naming = NamingTables {
            brand: "Dermacraft".to_string(),
            product_types: words(&["Serum", "Essence", "Cream", "Elixir"]),
            skin_type_prefixes: BTreeMap::from([
                (Dry, words(&["Hydra", "Aqua", "Moist"])),
                (Oily, words(&["Matte", "Clear", "Pure"])),
                (Combination, words(&["Balance", "Harmony", "Dual"])),
                (Sensitive, words(&["Calm", "Gentle", "Tender"])),
            ]),
            concern_prefixes: BTreeMap::from([
                (Blemish, words(&["Clarity", "Purify", "Refine"])),
                (Wrinkle, words(&["Renew", "Youth", "Lift"])),
                (Spots, words(&["Bright", "Radiance", "Glow"])),
                (Soothe, words(&["Relief", "Comfort", "Serene"])),
            ]),
            environment_keywords: BTreeMap::from([
                (Urban, "Urban Shield".to_string()),
                (Tropical, "Humidity Balance".to_string()),
                (Moderate, "Adaptive Care".to_string()),
            ]),
        };

        let safe_ranges = BTreeMap::from([
            safe_range("water", 5000, 8500),
            safe_range("glycerin", 200, 1000),
            safe_range("propanediol", 100, 800),
            safe_range("butylene_glycol", 100, 1000),
            safe_range("squalane", 100, 1000),
            safe_range("xanthan_gum", 10, 100),
            safe_range("phenoxyethanol", 10, 100),
            safe_range("hyaluronic_acid", 10, 200),
            safe_range("niacinamide", 200, 1000),
            safe_range("salicylic_acid", 50, 200),
            safe_range("vitamin_c", 500, 2000),
            safe_range("alpha_arbutin", 50, 200),
            safe_range("peptides", 100, 1000),
            safe_range("centella_asiatica", 50, 500),
            safe_range("beta_glucan", 50, 500),
        ]);

        Self { ingredients, allergies, rules, naming, safe_ranges }
    }
}

fn ingredient(
    id: &str,
    benefit: &str,
    unit_price_cents: i64,
    concentration_pct: i64,
    keyword: &str,
    applicability: Applicability,
) -> (IngredientId, Ingredient) {
    (
        IngredientId::from(id),
        Ingredient {
            benefit: benefit.to_string(),
            unit_price: Decimal::new(unit_price_cents, 2),
            concentration: Decimal::new(concentration_pct, 2),
            keyword: keyword.to_string(),
            applicability,
        },
    )
}

fn allergy(
    category: AllergyCategory,
    avoid: &[&str],
    alternatives: &[&str],
) -> (AllergyCategory, AllergyExclusion) {
    (category, AllergyExclusion { avoid: ids(avoid), alternatives: ids(alternatives) })
}

fn safe_range(id: &str, min_hundredths: i64, max_hundredths: i64) -> (IngredientId, ConcentrationRange) {
    (
        IngredientId::from(id),
        ConcentrationRange::new(Decimal::new(min_hundredths, 2), Decimal::new(max_hundredths, 2)),
    )
}

fn ids(values: &[&str]) -> Vec<IngredientId> {
    values.iter().map(|value| IngredientId::from(*value)).collect()
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
