pub mod formulation;
pub mod ingredient;
pub mod product;
pub mod profile;
