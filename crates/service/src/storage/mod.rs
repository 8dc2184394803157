//! Storage abstractions for service layer
//!
//! The whole shop lives in one JSON document. `backend` decides where its
//! bytes go; `document_store` decides what counts as a valid document.

pub mod backend;
pub mod document_store;

pub use backend::{DocumentBackend, FileBackend, MemoryBackend};
pub use document_store::{DocumentStore, LoadResult};
