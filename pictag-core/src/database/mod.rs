//! Persistence for catalog entries.
//!
//! [`ports`] holds the repository interface the catalog service depends on;
//! [`infrastructure`] holds the SQLite adapter.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::sqlite::SqliteCatalogRepository;
pub use ports::CatalogRepository;
