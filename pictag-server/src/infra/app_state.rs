use std::{fmt, sync::Arc};

use pictag_core::CatalogService;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    /// Largest accepted request body, multipart uploads included.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(catalog: CatalogService, max_upload_bytes: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            max_upload_bytes,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}
