use std::collections::HashMap;

use tokio::sync::RwLock;

use dermacraft_core::domain::formulation::{BaseFormulation, FormulationId};
use dermacraft_core::domain::product::{CustomProduct, ProductId};

use super::{FormulationRepository, ProductRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryFormulationRepository {
    formulations: RwLock<HashMap<String, BaseFormulation>>,
}

fn same_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[async_trait::async_trait]
impl FormulationRepository for InMemoryFormulationRepository {
    async fn find_by_id(
        &self,
        id: &FormulationId,
    ) -> Result<Option<BaseFormulation>, RepositoryError> {
        let formulations = self.formulations.read().await;
        Ok(formulations.get(&id.0).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<BaseFormulation>, RepositoryError> {
        let formulations = self.formulations.read().await;
        Ok(formulations.values().find(|formulation| same_name(&formulation.name, name)).cloned())
    }

    async fn insert(&self, formulation: BaseFormulation) -> Result<(), RepositoryError> {
        let mut formulations = self.formulations.write().await;
        if formulations.contains_key(&formulation.id.0) {
            return Err(RepositoryError::Duplicate {
                entity: "formulation id",
                key: formulation.id.0.clone(),
            });
        }
        if formulations.values().any(|existing| same_name(&existing.name, &formulation.name)) {
            return Err(RepositoryError::Duplicate {
                entity: "formulation name",
                key: formulation.name.clone(),
            });
        }
        formulations.insert(formulation.id.0.clone(), formulation);
        Ok(())
    }

    async fn update(&self, formulation: BaseFormulation) -> Result<(), RepositoryError> {
        let mut formulations = self.formulations.write().await;
        let Some(slot) = formulations.get_mut(&formulation.id.0) else {
            return Err(RepositoryError::Missing {
                entity: "formulation",
                key: formulation.id.0.clone(),
            });
        };
        *slot = formulation;
        Ok(())
    }

    async fn remove(&self, id: &FormulationId) -> Result<(), RepositoryError> {
        let mut formulations = self.formulations.write().await;
        formulations
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::Missing { entity: "formulation", key: id.0.clone() })
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    state: RwLock<ProductState>,
}

#[derive(Default)]
struct ProductState {
    products: HashMap<String, CustomProduct>,
    request_keys: HashMap<String, String>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<CustomProduct>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.get(&id.0).cloned())
    }

    async fn find_by_request_key(
        &self,
        request_key: &str,
    ) -> Result<Option<CustomProduct>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.request_keys.get(request_key).and_then(|id| state.products.get(id)).cloned())
    }

    async fn insert(
        &self,
        product: CustomProduct,
        request_key: Option<&str>,
    ) -> Result<CustomProduct, RepositoryError> {
        let mut state = self.state.write().await;
        let bound = request_key
            .and_then(|key| state.request_keys.get(key))
            .and_then(|id| state.products.get(id))
            .cloned();
        if let Some(existing) = bound {
            return Ok(existing);
        }
        if state.products.contains_key(&product.id.0) {
            return Err(RepositoryError::Duplicate { entity: "product id", key: product.id.0.clone() });
        }
        if let Some(key) = request_key {
            state.request_keys.insert(key.to_string(), product.id.0.clone());
        }
        state.products.insert(product.id.0.clone(), product.clone());
        Ok(product)
    }

    async fn update(&self, product: CustomProduct) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let Some(slot) = state.products.get_mut(&product.id.0) else {
            return Err(RepositoryError::Missing { entity: "product", key: product.id.0.clone() });
        };
        *slot = product;
        Ok(())
    }

    async fn count_referencing(
        &self,
        formulation_id: &FormulationId,
    ) -> Result<usize, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|product| product.base_formulation_id.as_ref() == Some(formulation_id))
            .count())
    }
}
