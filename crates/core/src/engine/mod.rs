pub mod catalog;
pub mod composition;
pub mod concentration;
pub mod naming;
pub mod pricing;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::formulation::FormulationId;
use crate::domain::product::{CustomProduct, ProductId};
use crate::domain::profile::Profile;

use self::{
    catalog::FormulationCatalog,
    composition::{Composition, CompositionEngine, RuleBasedSynthesizer},
    naming::{CatalogNamingEngine, NamingEngine},
    pricing::{ComplexityPricingEngine, PricingEngine, PricingPolicy, PricingResult},
};

/// Everything derived from one profile in a single pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub composition: Composition,
    pub pricing: PricingResult,
    pub name: String,
    pub description: String,
}

pub struct ProductFactory<C, P, N> {
    composition_engine: C,
    pricing_engine: P,
    naming_engine: N,
}

impl<C, P, N> ProductFactory<C, P, N> {
    pub fn new(composition_engine: C, pricing_engine: P, naming_engine: N) -> Self {
        Self { composition_engine, pricing_engine, naming_engine }
    }
}

impl<'a>
    ProductFactory<RuleBasedSynthesizer<'a>, ComplexityPricingEngine<'a>, CatalogNamingEngine<'a>>
{
    pub fn from_catalog(catalog: &'a FormulationCatalog, policy: PricingPolicy) -> Self {
        Self::new(
            RuleBasedSynthesizer::new(catalog),
            ComplexityPricingEngine::new(catalog, policy),
            CatalogNamingEngine::new(catalog),
        )
    }
}

impl<C, P, N> ProductFactory<C, P, N>
where
    C: CompositionEngine,
    P: PricingEngine,
    N: NamingEngine,
{
    pub fn synthesize(&self, profile: &Profile, rng: &mut dyn RngCore) -> SynthesisOutcome {
        let composition = self.composition_engine.synthesize(profile);
        let pricing = self.pricing_engine.price_with_trace(&composition.ingredients);
        let name = self.naming_engine.generate_name(profile, rng);
        let description = self.naming_engine.generate_description(profile, &composition);

        SynthesisOutcome { composition, pricing, name, description }
    }

    pub fn create_product(
        &self,
        profile: Profile,
        base_formulation_id: Option<FormulationId>,
        rng: &mut dyn RngCore,
        now: DateTime<Utc>,
    ) -> CustomProduct {
        let outcome = self.synthesize(&profile, rng);
        CustomProduct {
            id: ProductId::generate(),
            base_formulation_id,
            profile_data: profile,
            selected_ingredients: outcome.composition.ingredients,
            final_ingredient_concentrations: outcome.composition.concentrations,
            name: outcome.name,
            description: outcome.description,
            total_price: outcome.pricing.total,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recomputes every derived field from `profile`. Identity, formulation
    /// link and creation time are kept.
    pub fn reformulate(
        &self,
        product: &CustomProduct,
        profile: Profile,
        rng: &mut dyn RngCore,
        now: DateTime<Utc>,
    ) -> CustomProduct {
        let outcome = self.synthesize(&profile, rng);
        CustomProduct {
            id: product.id.clone(),
            base_formulation_id: product.base_formulation_id.clone(),
            profile_data: profile,
            selected_ingredients: outcome.composition.ingredients,
            final_ingredient_concentrations: outcome.composition.concentrations,
            name: outcome.name,
            description: outcome.description,
            total_price: outcome.pricing.total,
            created_at: product.created_at,
            updated_at: now,
        }
    }
}
