//! Repository ports (interfaces).

pub mod catalog;

pub use catalog::CatalogRepository;
