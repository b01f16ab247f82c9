pub mod repositories;
pub mod service;

pub use repositories::{
    FormulationRepository, InMemoryFormulationRepository, InMemoryProductRepository,
    ProductRepository, RepositoryError,
};
pub use service::FormulationService;
