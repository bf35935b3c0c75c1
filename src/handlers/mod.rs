pub mod common;
pub mod purchase_orders;
pub mod vendors;

use crate::{
    db::DbPool,
    services::{purchase_orders::PurchaseOrderService, vendors::VendorService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub vendors: Arc<VendorService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            vendors: Arc::new(VendorService::new(db_pool.clone())),
            purchase_orders: Arc::new(PurchaseOrderService::new(db_pool)),
        }
    }
}
