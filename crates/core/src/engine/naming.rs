use rand::seq::SliceRandom;
use rand::RngCore;

use crate::domain::profile::Profile;
use crate::engine::catalog::FormulationCatalog;
use crate::engine::composition::Composition;

const MAX_DESCRIPTION_KEYWORDS: usize = 3;
const FALLBACK_KEYWORD: &str = "Advanced";
const FALLBACK_PRODUCT_TYPE: &str = "Formula";

/// Product naming and copy. Naming draws from `rng`; description is deterministic.
pub trait NamingEngine: Send + Sync {
    fn generate_name(&self, profile: &Profile, rng: &mut dyn RngCore) -> String;

    fn generate_description(&self, profile: &Profile, composition: &Composition) -> String;
}

pub struct CatalogNamingEngine<'a> {
    catalog: &'a FormulationCatalog,
}

impl<'a> CatalogNamingEngine<'a> {
    pub fn new(catalog: &'a FormulationCatalog) -> Self {
        Self { catalog }
    }
}

impl NamingEngine for CatalogNamingEngine<'_> {
    fn generate_name(&self, profile: &Profile, rng: &mut dyn RngCore) -> String {
        let naming = &self.catalog.naming;
        let primary = profile.primary_concern();

        let skin_prefix = naming
            .skin_type_prefixes
            .get(&profile.skin_type)
            .and_then(|prefixes| prefixes.choose(&mut *rng))
            .cloned()
            .unwrap_or_else(|| capitalize(profile.skin_type.as_str()));
        let concern_prefix = naming
            .concern_prefixes
            .get(&primary)
            .and_then(|prefixes| prefixes.choose(&mut *rng))
            .cloned()
            .unwrap_or_else(|| capitalize(primary.as_str()));
        let product_type = naming
            .product_types
            .choose(&mut *rng)
            .map(String::as_str)
            .unwrap_or(FALLBACK_PRODUCT_TYPE);

        format!("{} {skin_prefix}-{concern_prefix} {product_type}", naming.brand)
    }

    fn generate_description(&self, profile: &Profile, composition: &Composition) -> String {
        let concerns =
            profile.skin_concerns.iter().map(|concern| capitalize(concern.as_str())).collect::<Vec<_>>();
        let noun = if concerns.len() > 1 { "concerns" } else { "concern" };

        let mut targeting = format!(
            "Specially formulated for {} skin targeting {} {noun}",
            capitalize(profile.skin_type.as_str()),
            join_with_final(&concerns, " & ")
        );
        if let Some(technology) =
            self.catalog.naming.environment_keywords.get(&profile.environmental_factors)
        {
            targeting.push_str(&format!(", powered by {technology} technology"));
        }

        let mut keywords: Vec<String> = Vec::new();
        for ingredient in &composition.ingredients {
            let Some(entry) = self.catalog.ingredient(ingredient) else {
                continue;
            };
            if !keywords.contains(&entry.keyword) {
                keywords.push(entry.keyword.clone());
            }
            if keywords.len() == MAX_DESCRIPTION_KEYWORDS {
                break;
            }
        }
        if keywords.is_empty() {
            keywords.push(FALLBACK_KEYWORD.to_string());
        }

        format!("{targeting}. Enriched with {} actives.", join_with_final(&keywords, " And "))
    }
}

fn join_with_final(items: &[String], final_separator: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{}{final_separator}{last}", head.join(", ")),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{CatalogNamingEngine, NamingEngine};
    use crate::domain::ingredient::IngredientId;
    use crate::domain::profile::{Environment, Profile, SkinConcern, SkinType};
    use crate::engine::catalog::FormulationCatalog;
    use crate::engine::composition::{Composition, CompositionEngine, RuleBasedSynthesizer};

    fn profile(concerns: &[SkinConcern]) -> Profile {
        Profile::new(SkinType::Dry, concerns.iter().copied(), Environment::Moderate, [])
            .expect("valid profile")
    }

    #[test]
    fn name_has_brand_prefix_pair_and_product_type() {
        let catalog = FormulationCatalog::standard();
        let engine = CatalogNamingEngine::new(&catalog);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..25 {
            let name = engine.generate_name(&profile(&[SkinConcern::Wrinkle]), &mut rng);
            let parts = name.split(' ').collect::<Vec<_>>();
            assert_eq!(parts.len(), 3, "unexpected name shape: {name}");
            assert_eq!(parts[0], "Dermacraft");

            let (skin, concern) = parts[1].split_once('-').expect("hyphenated prefix pair");
            assert!(catalog.naming.skin_type_prefixes[&SkinType::Dry].iter().any(|p| p == skin));
            assert!(catalog.naming.concern_prefixes[&SkinConcern::Wrinkle].iter().any(|p| p == concern));
            assert!(catalog.naming.product_types.iter().any(|t| t == parts[2]));
        }
    }

    #[test]
    fn same_seed_gives_same_name() {
        let catalog = FormulationCatalog::standard();
        let engine = CatalogNamingEngine::new(&catalog);
        let profile = profile(&[SkinConcern::Spots, SkinConcern::Blemish]);

        let first = engine.generate_name(&profile, &mut StdRng::seed_from_u64(42));
        let second = engine.generate_name(&profile, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn description_for_single_concern() {
        let catalog = FormulationCatalog::standard();
        let engine = CatalogNamingEngine::new(&catalog);
        let profile = profile(&[SkinConcern::Wrinkle]);
        let composition = RuleBasedSynthesizer::new(&catalog).synthesize(&profile);

        assert_eq!(
            engine.generate_description(&profile, &composition),
            "Specially formulated for Dry skin targeting Wrinkle concern, powered by Adaptive Care \
             technology. Enriched with Hydrating, Barrier-Repairing And Firming actives."
        );
    }

    #[test]
    fn description_for_many_concerns_uses_plural_and_ampersand() {
        let catalog = FormulationCatalog::standard();
        let engine = CatalogNamingEngine::new(&catalog);
        let profile = profile(&[SkinConcern::Blemish, SkinConcern::Wrinkle, SkinConcern::Spots]);
        let composition = Composition {
            ingredients: vec![IngredientId::from("peptides")],
            ..Composition::default()
        };

        let description = engine.generate_description(&profile, &composition);
        assert!(description.contains("targeting Blemish, Wrinkle & Spots concerns"));
        assert!(description.ends_with("Enriched with Firming actives."));
    }

    #[test]
    fn description_survives_empty_composition() {
        let catalog = FormulationCatalog::standard();
        let engine = CatalogNamingEngine::new(&catalog);

        let description =
            engine.generate_description(&profile(&[SkinConcern::Soothe]), &Composition::default());
        assert!(description.ends_with("Enriched with Advanced actives."));
    }
}
