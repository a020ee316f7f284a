use thiserror::Error;

#[derive(Debug, Error)]
pub enum PurgeError {
    /// Listing or committing a batch failed. Aborts the whole run.
    #[error("Purging collection '{collection}' failed: {source}")]
    Collection {
        collection: String,
        #[source]
        source: eyre::Report,
    },

    /// Listing or deleting in the file store failed. Only ever recorded.
    #[error("Storage purge error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
