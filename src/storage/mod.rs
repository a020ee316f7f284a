use async_trait::async_trait;

pub mod firestore;
pub mod local;
#[cfg(test)]
pub mod memory;
pub mod s3;

/// Most delete operations the document store accepts in a single commit.
pub const MAX_BATCH_SIZE: usize = 500;

/// One document inside a collection, as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub id: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentRef { id: id.into() }
    }
}

/// Direct children of one prefix in the file store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Object keys, relative to the store root.
    pub items: Vec<String>,
    /// Child prefixes, each ending with `/`.
    pub prefixes: Vec<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads every document of `collection` in one go.
    async fn list_documents(&self, collection: &str) -> eyre::Result<Vec<DocumentRef>>;
    /// Atomically deletes at most [`MAX_BATCH_SIZE`] documents.
    async fn commit_batch(&self, collection: &str, batch: &[DocumentRef]) -> eyre::Result<()>;
    /// Human readable name of the store, used in prompts.
    fn describe(&self) -> String;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Lists the direct children of `prefix`. The root is the empty prefix.
    async fn list(&self, prefix: &str) -> eyre::Result<Listing>;
    async fn delete(&self, key: &str) -> eyre::Result<()>;
    fn describe(&self) -> String;
}
