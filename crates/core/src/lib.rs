pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;

pub use domain::formulation::{
    BaseFormulation, FormulationCategory, FormulationDraft, FormulationId, FormulationStatus,
};
pub use domain::ingredient::{ConcentrationRange, Ingredient, IngredientId};
pub use domain::product::{CustomProduct, ProductId};
pub use domain::profile::{
    AllergyCategory, Environment, Profile, ProfileInput, SkinConcern, SkinType,
};
pub use engine::catalog::{AllergyExclusion, FormulationCatalog};
pub use engine::composition::{Composition, CompositionEngine, RuleBasedSynthesizer};
pub use engine::concentration::{
    check_ingredient_compatibility, validate_formulation_ranges, ConcentrationCheck,
    ConcentrationValidator, RangeSource, RangeViolation, SafeRangeConcentrationValidator,
};
pub use engine::naming::{CatalogNamingEngine, NamingEngine};
pub use engine::pricing::{ComplexityPricingEngine, PricingEngine, PricingPolicy, PricingResult};
pub use engine::{ProductFactory, SynthesisOutcome};
pub use errors::{ApplicationError, DomainError, InterfaceError};
