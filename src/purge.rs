use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::{
    confirm::{ConfirmationGate, ConfirmationProvider, GateDecision},
    error::PurgeError,
    fanout::{self, MAX_IN_FLIGHT},
    storage::{DocumentStore, FileStore, MAX_BATCH_SIZE},
    utils,
};

/// How far below the root the file store is enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageDepth {
    /// Every nested prefix
    Full,
    /// Root plus the prefixes directly under it
    OneLevel,
}

impl StorageDepth {
    fn allows(self, level: usize) -> bool {
        match self {
            StorageDepth::Full => true,
            StorageDepth::OneLevel => level <= 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeStats {
    pub collections_cleared: usize,
    pub documents_deleted: usize,
    pub files_deleted: usize,
    pub errors: Vec<String>,
}

impl PurgeStats {
    pub fn print_summary(&self) {
        println!();
        println!("Purge summary");
        println!("  collections cleared: {}", self.collections_cleared);
        println!("  documents deleted:   {}", self.documents_deleted);
        println!("  files deleted:       {}", self.files_deleted);
        if self.errors.is_empty() {
            println!("  errors:              none");
        } else {
            println!("  errors:              {}", self.errors.len());
            for e in &self.errors {
                println!("    - {}", e);
            }
        }
    }
}

pub struct BulkPurge {
    documents: Arc<dyn DocumentStore>,
    files: Option<Arc<dyn FileStore>>,
    collections: Vec<String>,
    depth: StorageDepth,
}

impl BulkPurge {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        files: Option<Arc<dyn FileStore>>,
        collections: Vec<String>,
    ) -> Self {
        BulkPurge {
            documents,
            files,
            collections,
            depth: StorageDepth::Full,
        }
    }

    pub fn with_depth(mut self, depth: StorageDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Stores shown to the operator before anything is deleted.
    pub fn describe_stores(&self) -> Vec<String> {
        let mut stores = vec![self.documents.describe()];
        if let Some(files) = &self.files {
            stores.push(files.describe());
        }
        stores
    }

    /// Deletes every document of `name`, returning how many were removed.
    ///
    /// The collection is read once, cut into batches of [`MAX_BATCH_SIZE`]
    /// and all batches are committed concurrently. The first failing batch
    /// aborts the collection; batches that already committed stay deleted.
    pub async fn purge_collection(&self, name: &str) -> Result<usize, PurgeError> {
        println!("Purging collection '{}'", name);

        let documents = self
            .documents
            .list_documents(name)
            .await
            .map_err(|source| PurgeError::Collection {
                collection: name.to_string(),
                source,
            })?;

        if documents.is_empty() {
            println!("  '{}' is already empty", name);
            return Ok(0);
        }

        let batches: Vec<_> = documents.chunks(MAX_BATCH_SIZE).collect();
        println!(
            "  {} documents found, submitting {} batch(es)",
            documents.len(),
            batches.len()
        );

        let pb = utils::create_progress_bar(batches.len() as u64);
        let start_time = Instant::now();

        let committed = fanout::all_or_nothing(batches.iter().map(|batch| {
            let pb = &pb;
            let start_time = &start_time;
            async move {
                self.documents.commit_batch(name, batch).await?;
                utils::update_progress_bar(pb, start_time);
                Ok::<usize, eyre::Report>(batch.len())
            }
        }))
        .await;

        match committed {
            Ok(sizes) => {
                pb.finish_and_clear();
                let deleted: usize = sizes.iter().sum();
                println!("  deleted {} documents from '{}'", deleted, name);
                info!(collection = name, deleted, "collection purged");
                Ok(deleted)
            }
            Err(source) => {
                pb.abandon();
                println!("  failed to purge '{}'", name);
                Err(PurgeError::Collection {
                    collection: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Deletes every object in the file store.
    ///
    /// Never fails: listing and delete errors are collected and returned
    /// next to the number of objects actually deleted.
    pub async fn purge_file_store(&self) -> (usize, Vec<String>) {
        let Some(files) = &self.files else {
            return (0, Vec::new());
        };
        println!("Purging {}", files.describe());

        let mut errors = Vec::new();
        let root = match files.list("").await {
            Ok(listing) => listing,
            Err(e) => {
                let e = PurgeError::Storage(format!("could not list root: {}", e));
                warn!("{}", e);
                errors.push(e.to_string());
                return (0, errors);
            }
        };

        let mut keys = root.items;
        let mut pending = root.prefixes;
        let mut level = 1;

        while !pending.is_empty() && self.depth.allows(level) {
            let (listings, failures) = fanout::best_effort(
                pending.iter().map(|prefix| async move {
                    files.list(prefix).await.map_err(|e| {
                        PurgeError::Storage(format!("could not list prefix '{}': {}", prefix, e))
                    })
                }),
                MAX_IN_FLIGHT,
            )
            .await;

            for failure in failures {
                warn!("{}", failure);
                errors.push(failure.to_string());
            }

            pending = Vec::new();
            for listing in listings {
                keys.extend(listing.items);
                pending.extend(listing.prefixes);
            }
            level += 1;
        }

        if !pending.is_empty() {
            println!(
                "  {} nested prefix(es) left untouched by the one-level listing",
                pending.len()
            );
            warn!(skipped = pending.len(), "nested prefixes not purged");
        }

        println!("  {} file(s) scheduled for deletion", keys.len());
        let (deleted, failures) = fanout::best_effort(
            keys.iter().map(|key| async move {
                files.delete(key).await.map_err(|e| {
                    PurgeError::Storage(format!("could not delete '{}': {}", key, e))
                })
            }),
            MAX_IN_FLIGHT,
        )
        .await;

        for failure in failures {
            warn!("{}", failure);
            errors.push(failure.to_string());
        }

        println!(
            "  deleted {} file(s), {} error(s)",
            deleted.len(),
            errors.len()
        );
        info!(deleted = deleted.len(), errors = errors.len(), "file store purged");
        (deleted.len(), errors)
    }

    /// Purges the collections one after the other, then the file store.
    ///
    /// A collection failure stops the run before the next collection.
    pub async fn run(&self) -> Result<PurgeStats, PurgeError> {
        let mut stats = PurgeStats::default();

        for collection in &self.collections {
            match self.purge_collection(collection).await {
                Ok(deleted) => {
                    stats.collections_cleared += 1;
                    stats.documents_deleted += deleted;
                }
                Err(e) => {
                    error!(
                        collection = collection.as_str(),
                        cleared = stats.collections_cleared,
                        deleted = stats.documents_deleted,
                        "aborting purge"
                    );
                    return Err(e);
                }
            }
        }

        if self.files.is_some() {
            let (files_deleted, errors) = self.purge_file_store().await;
            stats.files_deleted = files_deleted;
            stats.errors.extend(errors);
        }

        Ok(stats)
    }
}

/// Asks for confirmation, then runs the purge.
///
/// Returns `None` when the operator declined and nothing was touched.
pub async fn confirm_and_run<P: ConfirmationProvider>(
    gate: &mut ConfirmationGate<P>,
    purge: &BulkPurge,
) -> Result<Option<PurgeStats>, PurgeError> {
    match gate
        .confirm(purge.collections(), &purge.describe_stores())
        .await?
    {
        GateDecision::Declined => Ok(None),
        GateDecision::Proceed => purge.run().await.map(Some),
    }
}
