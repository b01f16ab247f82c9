use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use dermacraft_core::domain::formulation::{BaseFormulation, FormulationDraft, FormulationId};
use dermacraft_core::domain::ingredient::IngredientId;
use dermacraft_core::domain::product::{CustomProduct, ProductId};
use dermacraft_core::domain::profile::{Profile, ProfileInput, SkinType};
use dermacraft_core::engine::catalog::FormulationCatalog;
use dermacraft_core::engine::concentration::{
    check_ingredient_compatibility, ConcentrationCheck, ConcentrationValidator,
    SafeRangeConcentrationValidator,
};
use dermacraft_core::engine::pricing::PricingPolicy;
use dermacraft_core::engine::ProductFactory;
use dermacraft_core::errors::{ApplicationError, DomainError};

use crate::repositories::{FormulationRepository, ProductRepository};

/// Runs synthesis and the formulation lifecycle against a pair of repositories.
///
/// All computation finishes before the first write, so a rejected request
/// leaves the repositories untouched. Every lifecycle change of a formulation
/// and every write of a product that references one share a gate, so a product
/// is never stored against a formulation that was deactivated or deleted after
/// it was checked.
pub struct FormulationService<F, P> {
    catalog: Arc<FormulationCatalog>,
    policy: PricingPolicy,
    formulations: F,
    products: P,
    lifecycle_gate: Mutex<()>,
}

impl<F, P> FormulationService<F, P>
where
    F: FormulationRepository,
    P: ProductRepository,
{
    pub fn new(
        catalog: Arc<FormulationCatalog>,
        policy: PricingPolicy,
        formulations: F,
        products: P,
    ) -> Self {
        Self { catalog, policy, formulations, products, lifecycle_gate: Mutex::new(()) }
    }

    pub fn catalog(&self) -> &FormulationCatalog {
        &self.catalog
    }

    pub async fn create_formulation(
        &self,
        draft: FormulationDraft,
        created_by: &str,
    ) -> Result<BaseFormulation, ApplicationError> {
        let formulation = BaseFormulation::create(draft, &self.catalog, created_by, Utc::now())?;
        self.formulations.insert(formulation.clone()).await?;

        info!(
            event_name = "formulation.created",
            formulation_id = %formulation.id,
            name = %formulation.name,
            created_by,
            "base formulation created"
        );
        Ok(formulation)
    }

    pub async fn clone_formulation(
        &self,
        source_id: &FormulationId,
        new_name: &str,
        created_by: &str,
    ) -> Result<BaseFormulation, ApplicationError> {
        let source = self.require_formulation(source_id).await?;
        let copy = source.clone_as(new_name, created_by, Utc::now())?;
        self.formulations.insert(copy.clone()).await?;

        info!(
            event_name = "formulation.clone.created",
            formulation_id = %copy.id,
            source_formulation_id = %source.id,
            name = %copy.name,
            created_by,
            "base formulation cloned"
        );
        Ok(copy)
    }

    pub async fn deactivate_formulation(
        &self,
        id: &FormulationId,
    ) -> Result<BaseFormulation, ApplicationError> {
        let _gate = self.lifecycle_gate.lock().await;

        let mut formulation = self.require_formulation(id).await?;
        formulation.deactivate(Utc::now())?;
        self.formulations.update(formulation.clone()).await?;

        info!(
            event_name = "formulation.deactivated",
            formulation_id = %formulation.id,
            "base formulation deactivated"
        );
        Ok(formulation)
    }

    pub async fn delete_formulation(&self, id: &FormulationId) -> Result<(), ApplicationError> {
        let _gate = self.lifecycle_gate.lock().await;

        let mut formulation = self.require_formulation(id).await?;
        let referencing_products = self.products.count_referencing(id).await?;
        if let Err(error) = formulation.mark_deleted(referencing_products, Utc::now()) {
            warn!(
                event_name = "formulation.delete.refused",
                formulation_id = %id,
                referencing_products,
                error = %error,
                "base formulation delete refused"
            );
            return Err(error.into());
        }
        self.formulations.remove(id).await?;

        info!(event_name = "formulation.deleted", formulation_id = %id, "base formulation deleted");
        Ok(())
    }

    pub async fn check_concentration(
        &self,
        id: &FormulationId,
        ingredient: &IngredientId,
        percent: Decimal,
    ) -> Result<ConcentrationCheck, ApplicationError> {
        let formulation = self.require_formulation(id).await?;
        let validator = SafeRangeConcentrationValidator::new(&self.catalog.safe_ranges);
        Ok(validator.check_concentration(&formulation, ingredient, percent))
    }

    pub async fn check_compatibility(
        &self,
        id: &FormulationId,
        ingredients: &[IngredientId],
    ) -> Result<Vec<IngredientId>, ApplicationError> {
        let formulation = self.require_formulation(id).await?;
        Ok(check_ingredient_compatibility(&formulation, ingredients))
    }

    /// Synthesizes and stores a product. Every call stores a new product unless
    /// `request_key` names one already stored, which is then returned as is.
    pub async fn create_product(
        &self,
        input: ProfileInput,
        formulation_id: Option<FormulationId>,
        request_key: Option<&str>,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<CustomProduct, ApplicationError> {
        let profile = Profile::try_from(input)?;

        if let Some(key) = request_key {
            if let Some(existing) = self.products.find_by_request_key(key).await? {
                return Ok(existing);
            }
        }

        let _gate = self.lifecycle_gate.lock().await;
        if let Some(id) = &formulation_id {
            self.admit_formulation(id, profile.skin_type).await?;
        }

        let factory = ProductFactory::from_catalog(&self.catalog, self.policy.clone());
        let product = factory.create_product(profile, formulation_id, rng, Utc::now());
        product.check_invariants(&self.policy)?;
        let stored = self.products.insert(product, request_key).await?;

        info!(
            event_name = "product.created",
            product_id = %stored.id,
            ingredient_count = stored.selected_ingredients.len(),
            total_price = %stored.total_price,
            "custom product created"
        );
        Ok(stored)
    }

    /// Recomputes a stored product from a new profile; nothing is patched in place.
    /// A linked formulation must still be active and accept the new skin type.
    pub async fn reformulate_product(
        &self,
        id: &ProductId,
        input: ProfileInput,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<CustomProduct, ApplicationError> {
        let profile = Profile::try_from(input)?;

        let _gate = self.lifecycle_gate.lock().await;
        let existing = self
            .products
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound { entity: "product", id: id.0.clone() })?;
        if let Some(formulation_id) = &existing.base_formulation_id {
            self.admit_formulation(formulation_id, profile.skin_type).await?;
        }

        let factory = ProductFactory::from_catalog(&self.catalog, self.policy.clone());
        let product = factory.reformulate(&existing, profile, rng, Utc::now());
        product.check_invariants(&self.policy)?;
        self.products.update(product.clone()).await?;

        info!(
            event_name = "product.reformulated",
            product_id = %product.id,
            ingredient_count = product.selected_ingredients.len(),
            total_price = %product.total_price,
            "custom product reformulated"
        );
        Ok(product)
    }

    /// Caller holds the lifecycle gate.
    async fn admit_formulation(
        &self,
        id: &FormulationId,
        skin_type: SkinType,
    ) -> Result<(), ApplicationError> {
        let formulation = self.require_formulation(id).await?;
        if !formulation.is_active() {
            return Err(DomainError::FormulationInactive(id.clone()).into());
        }
        if !formulation.accepts_skin_type(skin_type) {
            return Err(DomainError::IncompatibleSkinType { formulation_id: id.clone(), skin_type }
                .into());
        }
        Ok(())
    }

    async fn require_formulation(
        &self,
        id: &FormulationId,
    ) -> Result<BaseFormulation, ApplicationError> {
        self.formulations
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound { entity: "formulation", id: id.0.clone() })
    }
}
