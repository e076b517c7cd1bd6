pub mod common;
pub mod health;
pub mod products;

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::products::ProductCatalogService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        let product_catalog = Arc::new(ProductCatalogService::new(db_pool));
        Self { product_catalog }
    }
}
