use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eyre::eyre;

use super::{DocumentRef, DocumentStore, FileStore, Listing, MAX_BATCH_SIZE};

#[derive(Default)]
struct MemoryState {
    /// collection -> document ids
    collections: BTreeMap<String, BTreeSet<String>>,
    /// object keys of the file store
    files: BTreeSet<String>,
    /// size of every committed batch, per collection
    batches: Vec<(String, usize)>,
    /// every document id ever deleted, duplicates kept
    deleted_documents: Vec<String>,
    /// number of list_documents calls
    list_calls: usize,
    fail_list_collections: HashSet<String>,
    fail_commit_collections: HashSet<String>,
    fail_list_prefixes: HashSet<String>,
    fail_delete_keys: HashSet<String>,
}

/// In-memory document and file store with failure injection for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` documents named `<collection>-<n>` to `collection`
    pub fn seed_collection(&self, collection: &str, count: usize) {
        let mut state = self.state.lock().unwrap();
        let documents = state.collections.entry(collection.to_string()).or_default();
        for n in 0..count {
            documents.insert(format!("{}-{}", collection, n));
        }
    }

    pub fn add_file(&self, key: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(key.into());
    }

    pub fn fail_list_for(&self, collection: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_list_collections.insert(collection.to_string());
    }

    pub fn fail_commit_for(&self, collection: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_commit_collections.insert(collection.to_string());
    }

    pub fn fail_list_prefix(&self, prefix: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_list_prefixes.insert(prefix.to_string());
    }

    pub fn fail_delete_for(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_delete_keys.insert(key.to_string());
    }

    pub fn document_count(&self, collection: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.collections.get(collection).map_or(0, |docs| docs.len())
    }

    pub fn file_keys(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.files.iter().cloned().collect()
    }

    /// Sizes of the batches committed against `collection`
    pub fn batch_sizes(&self, collection: &str) -> Vec<usize> {
        let state = self.state.lock().unwrap();
        state
            .batches
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn total_batches(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.batches.len()
    }

    pub fn deleted_documents(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.deleted_documents.clone()
    }

    pub fn list_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.list_calls
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str) -> eyre::Result<Vec<DocumentRef>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_list_collections.contains(collection) {
            return Err(eyre!("Mock listing failure for {}", collection));
        }
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.iter().map(|id| DocumentRef::new(id.clone())).collect())
            .unwrap_or_default())
    }

    async fn commit_batch(&self, collection: &str, batch: &[DocumentRef]) -> eyre::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_commit_collections.contains(collection) {
            return Err(eyre!("Mock commit failure for {}", collection));
        }
        if batch.len() > MAX_BATCH_SIZE {
            return Err(eyre!("Batch of {} exceeds {}", batch.len(), MAX_BATCH_SIZE));
        }
        state.batches.push((collection.to_string(), batch.len()));
        for document in batch {
            if let Some(docs) = state.collections.get_mut(collection) {
                docs.remove(&document.id);
            }
            state.deleted_documents.push(document.id.clone());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory documents".to_string()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn list(&self, prefix: &str) -> eyre::Result<Listing> {
        let state = self.state.lock().unwrap();
        if state.fail_list_prefixes.contains(prefix) {
            return Err(eyre!("Mock listing failure for prefix '{}'", prefix));
        }

        let mut listing = Listing::default();
        let mut prefixes = BTreeSet::new();
        for key in state.files.iter().filter(|key| key.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(end) => {
                    prefixes.insert(format!("{}{}", prefix, &rest[..=end]));
                }
                None => listing.items.push(key.clone()),
            }
        }
        listing.prefixes = prefixes.into_iter().collect();
        Ok(listing)
    }

    async fn delete(&self, key: &str) -> eyre::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_keys.contains(key) {
            return Err(eyre!("Mock delete failure for {}", key));
        }
        if state.files.remove(key) {
            Ok(())
        } else {
            Err(eyre!("No such file {}", key))
        }
    }

    fn describe(&self) -> String {
        "memory files".to_string()
    }
}
