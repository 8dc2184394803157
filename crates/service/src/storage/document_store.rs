use std::{path::PathBuf, sync::Arc};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::errors::{ServiceError, StoreError};
use crate::model::Document;
use crate::storage::backend::{DocumentBackend, FileBackend};

/// Outcome of reading the document. Loading never fails outright: a broken
/// resource is reported as `Recovered` together with what was wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Loaded(Document),
    Recovered(Document, String),
}

impl LoadResult {
    pub fn document(&self) -> &Document {
        match self {
            LoadResult::Loaded(doc) | LoadResult::Recovered(doc, _) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            LoadResult::Loaded(doc) | LoadResult::Recovered(doc, _) => doc,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadResult::Recovered(..))
    }
}

/// Single JSON document holding both collections.
///
/// Every operation re-reads the backing resource; nothing is cached between
/// calls. Mutations go through [`DocumentStore::mutate`], which holds a writer
/// lock across load, change and save so concurrent writers cannot drop each
/// other's updates.
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    writer: Mutex<()>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Arc<Self> {
        Arc::new(Self { backend, writer: Mutex::new(()) })
    }

    /// Store backed by a JSON file at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Arc<Self> {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn location(&self) -> String {
        self.backend.describe()
    }

    /// Read the document, repairing what can be repaired.
    ///
    /// - missing resource: an empty document is written and returned
    /// - unreadable or not a JSON object: empty document, not written back
    /// - one collection missing or not an array: that collection alone is emptied
    /// - a record that does not decode: that record alone is dropped
    pub async fn load(&self) -> LoadResult {
        match self.backend.read().await {
            Ok(Some(bytes)) => self.decode(&bytes),
            Ok(None) => {
                let _guard = self.writer.lock().await;
                self.load_exclusive().await
            }
            Err(e) => self.recovered(e),
        }
    }

    /// `load` for callers already holding the writer lock. The resource is
    /// re-read under the lock, so an empty document never replaces one a
    /// concurrent writer has just created.
    async fn load_exclusive(&self) -> LoadResult {
        match self.backend.read().await {
            Ok(Some(bytes)) => self.decode(&bytes),
            Ok(None) => {
                warn!(location = %self.location(), "document not found, creating an empty one");
                let empty = Document::default();
                self.save(&empty).await;
                LoadResult::Loaded(empty)
            }
            Err(e) => self.recovered(e),
        }
    }

    fn decode(&self, bytes: &[u8]) -> LoadResult {
        let root = match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(root)) => root,
            Ok(_) => return self.recovered(StoreError::Malformed("root is not an object".into())),
            Err(e) => return self.recovered(e.into()),
        };

        let (document, repaired) = repair(root);
        if repaired.is_empty() {
            LoadResult::Loaded(document)
        } else {
            let cause = format!("repaired document: {}", repaired.join("; "));
            warn!(location = %self.location(), %cause, "document partially repaired");
            LoadResult::Recovered(document, cause)
        }
    }

    fn recovered(&self, cause: StoreError) -> LoadResult {
        error!(location = %self.location(), error = %cause, "failed to read document, using an empty one");
        LoadResult::Recovered(Document::default(), cause.to_string())
    }

    /// Serialize and overwrite the whole document. Returns whether the write succeeded.
    pub async fn save(&self, doc: &Document) -> bool {
        let bytes = match serde_json::to_vec_pretty(doc) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(location = %self.location(), error = %e, "failed to serialize document");
                return false;
            }
        };
        match self.backend.write(&bytes).await {
            Ok(()) => true,
            Err(e) => {
                error!(location = %self.location(), error = %e, "failed to save document");
                false
            }
        }
    }

    /// Load the current document. The writer lock is taken only when the resource is missing.
    pub async fn read(&self) -> Document {
        self.load().await.into_document()
    }

    /// Apply a mutation to a freshly loaded document and persist it.
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Document) -> Result<T, ServiceError>,
    {
        let _guard = self.writer.lock().await;
        let mut doc = self.load_exclusive().await.into_document();
        let out = f(&mut doc)?;
        if !self.save(&doc).await {
            return Err(ServiceError::Persistence(format!(
                "could not write {}",
                self.location()
            )));
        }
        Ok(out)
    }
}

/// Decode each collection independently; returns a note for every field reset or record dropped.
fn repair(mut root: Map<String, Value>) -> (Document, Vec<String>) {
    let mut repaired = Vec::new();
    let products = collection("products", root.remove("products"), &mut repaired);
    let orders = collection("orders", root.remove("orders"), &mut repaired);
    (Document { products, orders }, repaired)
}

fn collection<T: serde::de::DeserializeOwned>(
    name: &str,
    field: Option<Value>,
    repaired: &mut Vec<String>,
) -> Vec<T> {
    let items = match field {
        Some(Value::Array(items)) => items,
        Some(_) => {
            repaired.push(format!("{name} is not an array, reset"));
            return Vec::new();
        }
        None => {
            repaired.push(format!("{name} missing, reset"));
            return Vec::new();
        }
    };
    let mut kept = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(record) => kept.push(record),
            Err(e) => repaired.push(format!("dropped {name}[{index}]: {e}")),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;
    use serde_json::json;
    use uuid::Uuid;

    fn memory_store(contents: Option<&str>) -> (Arc<DocumentStore>, Arc<MemoryBackend>) {
        let backend = Arc::new(match contents {
            Some(raw) => MemoryBackend::with_contents(raw),
            None => MemoryBackend::new(),
        });
        (DocumentStore::new(backend.clone()), backend)
    }

    async fn persisted(backend: &MemoryBackend) -> Value {
        serde_json::from_slice(&backend.contents().await.expect("contents")).expect("json")
    }

    #[tokio::test]
    async fn missing_document_is_created_empty() {
        let (store, backend) = memory_store(None);
        let first = store.load().await;
        assert_eq!(first, LoadResult::Loaded(Document::default()));
        assert_eq!(persisted(&backend).await, json!({"products": [], "orders": []}));

        let second = store.load().await;
        assert_eq!(second, LoadResult::Loaded(Document::default()));
    }

    #[tokio::test]
    async fn unparsable_document_recovers_without_writing() {
        let (store, backend) = memory_store(Some("{not json"));
        let result = store.load().await;
        assert!(result.is_recovered());
        assert_eq!(result.document(), &Document::default());
        assert_eq!(backend.contents().await.as_deref(), Some(&b"{not json"[..]));
    }

    #[tokio::test]
    async fn non_object_root_recovers() {
        let (store, _) = memory_store(Some("[1, 2, 3]"));
        let result = store.load().await;
        match result {
            LoadResult::Recovered(doc, cause) => {
                assert_eq!(doc, Document::default());
                assert!(cause.contains("not an object"));
            }
            other => panic!("expected recovery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_field_is_reset_alone() {
        let raw = json!({
            "products": [{"id": 1, "name": "Tea", "price": 3, "size": "L"}],
            "orders": "oops",
        })
        .to_string();
        let (store, _) = memory_store(Some(&raw));
        let result = store.load().await;
        let LoadResult::Recovered(doc, cause) = result else { panic!("expected recovery") };
        assert!(cause.contains("orders"));
        assert!(!cause.contains("products"));
        assert!(doc.orders.is_empty());
        assert_eq!(doc.products.len(), 1);
        assert_eq!(doc.products[0].extra.get("size"), Some(&json!("L")));
    }

    #[tokio::test]
    async fn bad_record_is_dropped_and_its_neighbours_kept() -> Result<(), anyhow::Error> {
        let raw = json!({
            "products": [
                {"id": 1, "name": "Tea", "price": 3, "size": "L"},
                {"id": 2, "name": "Cake", "price": "12.90"},
                {"id": 3.5, "name": "Jam", "price": 4},
            ],
            "orders": [],
        })
        .to_string();
        let (store, backend) = memory_store(Some(&raw));
        let result = store.load().await;
        let LoadResult::Recovered(doc, cause) = result else { panic!("expected recovery") };
        assert!(cause.contains("products[1]"));
        assert!(cause.contains("products[2]"));
        assert!(!cause.contains("products[0]"));
        assert_eq!(doc.products.len(), 1);
        assert_eq!(doc.products[0].id, 1);

        store
            .mutate(|doc| {
                doc.products.push(serde_json::from_value(json!({"id": 9, "name": "New", "price": 1}))
                    .map_err(|e| ServiceError::BadRequest(e.to_string()))?);
                Ok(())
            })
            .await?;
        assert_eq!(
            persisted(&backend).await["products"],
            json!([
                {"id": 1, "name": "Tea", "price": 3, "size": "L"},
                {"id": 9, "name": "New", "price": 1},
            ])
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_field_is_defaulted() {
        let (store, _) = memory_store(Some(r#"{"orders": []}"#));
        let result = store.load().await;
        assert!(result.is_recovered());
        assert_eq!(result.into_document(), Document::default());
    }

    #[tokio::test]
    async fn save_of_load_keeps_content() {
        let raw = json!({
            "products": [
                {"id": 2, "name": "Bread", "price": 1.25},
                {"id": 1, "name": "Tea", "price": 3, "tags": ["hot"]},
            ],
            "orders": [{
                "id": 1,
                "customerName": "Ana",
                "email": "",
                "phone": "",
                "items": [{"id": 1}],
                "total": 3,
                "notes": "",
                "createdDate": "01/02/2024",
                "createdTime": "10:00:00",
                "createdAtIso": "2024-02-01T10:00:00Z",
                "status": "pending",
            }],
        });
        let (store, backend) = memory_store(Some(&raw.to_string()));
        let loaded = store.load().await;
        assert!(!loaded.is_recovered());
        assert!(store.save(loaded.document()).await);
        assert_eq!(persisted(&backend).await, raw);
        assert_eq!(store.load().await, loaded);
    }

    #[tokio::test]
    async fn save_reports_write_failure() {
        let (store, backend) = memory_store(None);
        backend.set_fail_writes(true);
        assert!(!store.save(&Document::default()).await);
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let (store, backend) = memory_store(Some(r#"{"products": [], "orders": []}"#));
        let result: Result<(), ServiceError> = store
            .mutate(|_| Err(ServiceError::BadRequest("nope".into())))
            .await;
        assert!(result.is_err());
        assert_eq!(backend.contents().await.as_deref(), Some(&br#"{"products": [], "orders": []}"#[..]));
    }

    #[tokio::test]
    async fn mutation_surfaces_save_failure() {
        let (store, backend) = memory_store(None);
        store.load().await;
        backend.set_fail_writes(true);
        let result = store.mutate(|doc| { doc.products.clear(); Ok(()) }).await;
        assert!(matches!(result, Err(ServiceError::Persistence(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_are_not_lost() {
        // fresh store: readers racing the first writer must not recreate an empty document over it
        let (store, _) = memory_store(None);
        let mut writers = Vec::new();
        let mut readers = Vec::new();
        for id in 0..16 {
            let reader = Arc::clone(&store);
            readers.push(tokio::spawn(async move { reader.read().await }));
            let store = Arc::clone(&store);
            writers.push(tokio::spawn(async move {
                store
                    .mutate(move |doc| {
                        let product = serde_json::from_value(json!({"id": id, "name": "p", "price": 1}))
                            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
                        doc.products.push(product);
                        Ok(())
                    })
                    .await
            }));
        }
        for task in writers {
            task.await.expect("join").expect("mutate");
        }
        for task in readers {
            task.await.expect("join");
        }
        assert_eq!(store.read().await.products.len(), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn first_write_on_missing_file_survives_racing_reads() -> Result<(), anyhow::Error> {
        for _ in 0..50 {
            let tmp = std::env::temp_dir().join(format!("shop_store_{}.json", Uuid::new_v4()));
            let store = DocumentStore::open(&tmp);

            let reader = Arc::clone(&store);
            let read = tokio::spawn(async move { reader.read().await });
            let writer = Arc::clone(&store);
            let write = tokio::spawn(async move {
                writer
                    .mutate(|doc| {
                        doc.products.push(serde_json::from_value(json!({"id": 1, "name": "Tea", "price": 3}))
                            .map_err(|e| ServiceError::BadRequest(e.to_string()))?);
                        Ok(())
                    })
                    .await
            });
            read.await?;
            write.await??;

            assert_eq!(DocumentStore::open(&tmp).read().await.products.len(), 1);
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        Ok(())
    }

    #[tokio::test]
    async fn file_store_creates_and_reloads() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("shop_store_{}.json", Uuid::new_v4()));
        let store = DocumentStore::open(&tmp);
        assert_eq!(store.load().await, LoadResult::Loaded(Document::default()));
        assert!(tokio::fs::metadata(&tmp).await.is_ok());

        store
            .mutate(|doc| {
                doc.products.push(serde_json::from_value(json!({"id": 9, "name": "Jam", "price": 4}))
                    .map_err(|e| ServiceError::BadRequest(e.to_string()))?);
                Ok(())
            })
            .await?;

        let reopened = DocumentStore::open(&tmp);
        assert_eq!(reopened.read().await.products[0].id, 9);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
