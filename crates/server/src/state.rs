use std::sync::Arc;

use service::{catalog::ProductService, orders::OrderService, storage::DocumentStore};

/// Shared handler state. Cheap to clone; both services point at the same document.
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            products: ProductService::new(Arc::clone(&store)),
            orders: OrderService::new(store),
        }
    }
}
