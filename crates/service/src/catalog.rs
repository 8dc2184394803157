use std::sync::Arc;

use serde_json::Value;

use crate::errors::ServiceError;
use crate::model::Product;
use crate::storage::DocumentStore;
use crate::validation::validate_product;

/// Product collection of the shared document.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<DocumentStore>,
}

impl ProductService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// All products in creation order.
    pub async fn list(&self) -> Vec<Product> {
        self.store.read().await.products
    }

    pub async fn get(&self, id: i64) -> Result<Product, ServiceError> {
        self.store
            .read()
            .await
            .products
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ServiceError::not_found("product"))
    }

    /// Append a new product; its id must not be taken.
    pub async fn create(&self, candidate: Value) -> Result<Product, ServiceError> {
        validate_product(&candidate)?;
        let product: Product =
            serde_json::from_value(candidate).map_err(|e| ServiceError::BadRequest(e.to_string()))?;

        self.store
            .mutate(|doc| {
                if doc.products.iter().any(|p| p.id == product.id) {
                    return Err(ServiceError::DuplicateId(product.id));
                }
                doc.products.push(product.clone());
                Ok(product)
            })
            .await
    }

    /// Merge `patch` over the stored product. Fields missing from the patch are kept.
    pub async fn update(&self, id: i64, patch: Value) -> Result<Product, ServiceError> {
        validate_product(&patch)?;
        let Value::Object(patch) = patch else {
            return Err(ServiceError::BadRequest("product patch must be an object".into()));
        };

        self.store
            .mutate(|doc| {
                let index = doc
                    .products
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| ServiceError::not_found("product"))?;
                let merged = doc.products[index]
                    .merged(&patch)
                    .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
                // the patch may carry a new id; it must stay unique
                let taken = doc
                    .products
                    .iter()
                    .enumerate()
                    .any(|(i, p)| i != index && p.id == merged.id);
                if taken {
                    return Err(ServiceError::DuplicateId(merged.id));
                }
                doc.products[index] = merged.clone();
                Ok(merged)
            })
            .await
    }

    /// Remove a product and return it.
    pub async fn delete(&self, id: i64) -> Result<Product, ServiceError> {
        self.store
            .mutate(|doc| {
                let index = doc
                    .products
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| ServiceError::not_found("product"))?;
                Ok(doc.products.remove(index))
            })
            .await
    }
}
