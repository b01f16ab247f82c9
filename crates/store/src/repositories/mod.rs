use async_trait::async_trait;
use thiserror::Error;

use dermacraft_core::domain::formulation::{BaseFormulation, FormulationId};
use dermacraft_core::domain::product::{CustomProduct, ProductId};
use dermacraft_core::errors::ApplicationError;

pub mod memory;

pub use memory::{InMemoryFormulationRepository, InMemoryProductRepository};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },
    #[error("{entity} `{key}` does not exist")]
    Missing { entity: &'static str, key: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Duplicate { .. } => Self::Conflict(value.to_string()),
            RepositoryError::Missing { entity, key } => Self::NotFound { entity, id: key },
        }
    }
}

#[async_trait]
pub trait FormulationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &FormulationId,
    ) -> Result<Option<BaseFormulation>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<BaseFormulation>, RepositoryError>;
    /// Fails with `Duplicate` when the id or name is taken; nothing is written in that case.
    async fn insert(&self, formulation: BaseFormulation) -> Result<(), RepositoryError>;
    async fn update(&self, formulation: BaseFormulation) -> Result<(), RepositoryError>;
    async fn remove(&self, id: &FormulationId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<CustomProduct>, RepositoryError>;
    async fn find_by_request_key(
        &self,
        request_key: &str,
    ) -> Result<Option<CustomProduct>, RepositoryError>;
    /// Stores `product` and binds it to `request_key` when one is given. If the
    /// key is already bound, the product stored under it is returned and nothing
    /// is written. The lookup and the write happen atomically.
    async fn insert(
        &self,
        product: CustomProduct,
        request_key: Option<&str>,
    ) -> Result<CustomProduct, RepositoryError>;
    async fn update(&self, product: CustomProduct) -> Result<(), RepositoryError>;
    async fn count_referencing(&self, formulation_id: &FormulationId)
        -> Result<usize, RepositoryError>;
}
