use std::sync::Arc;

use crate::authz::Store;
use crate::database::PgStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// State backed by the application pool, connected on first use
    pub fn with_database() -> Self {
        Self::new(Arc::new(PgStore::shared()))
    }
}
