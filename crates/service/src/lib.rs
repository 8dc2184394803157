//! Service layer for the shop document.
//! - `storage` owns the single JSON document holding products and orders.
//! - `validation` checks candidate records before they reach the store.
//! - `catalog` and `orders` run the per-collection load, mutate and save cycles.

pub mod errors;
pub mod model;
pub mod validation;
pub mod storage;
pub mod catalog;
pub mod orders;
pub mod runtime;
