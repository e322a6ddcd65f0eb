use async_trait::async_trait;

use crate::domain::{CatalogEntry, EntryId, EntrySummary, InsertOutcome, NewCatalogEntry};
use crate::error::StoreError;

/// Repository port for the single catalog table.
///
/// Every method is one self-contained statement or transaction; callers never
/// need to hold a lock across calls.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert a new entry. A second insert with an existing `location` is a
    /// no-op and reports [`InsertOutcome::Duplicate`].
    async fn insert(&self, entry: &NewCatalogEntry) -> Result<InsertOutcome, StoreError>;

    /// All entries in insertion order, optionally narrowed to those whose
    /// labels contain `filter` (case-insensitive substring match).
    async fn list(&self, filter: Option<&str>) -> Result<Vec<EntrySummary>, StoreError>;

    async fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: EntryId) -> Result<bool, StoreError>;

    /// Create the table when it does not exist yet.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Drop and recreate the table, empty. Startup only.
    async fn reset(&self) -> Result<(), StoreError>;
}
