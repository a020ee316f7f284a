use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::Cli;
use crate::config::{Backend, Config};
use crate::confirm::{ConfirmationGate, StdinConfirmation};
use crate::purge::{BulkPurge, StorageDepth};
use storage::firestore::FirestoreStore;
use storage::local::LocalStorage;
use storage::s3::S3Storage;
use storage::{DocumentStore, FileStore};

mod args;
mod config;
mod confirm;
mod error;
mod fanout;
mod purge;
mod storage;
mod utils;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cvpurge=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_stores(
    config: &Config,
    skip_storage: bool,
) -> eyre::Result<(Arc<dyn DocumentStore>, Option<Arc<dyn FileStore>>)> {
    match config.backend {
        Backend::Firestore => {
            let documents: Arc<dyn DocumentStore> = Arc::new(FirestoreStore::from_config(config)?);
            let files: Option<Arc<dyn FileStore>> = if skip_storage {
                None
            } else {
                Some(Arc::new(S3Storage::from_config(config)?))
            };
            Ok((documents, files))
        }
        Backend::Local => {
            let local = LocalStorage::new(&config.local_store_dir);
            let files: Option<Arc<dyn FileStore>> = if skip_storage {
                None
            } else {
                Some(Arc::new(local.clone()))
            };
            Ok((Arc::new(local), files))
        }
    }
}

async fn run() -> eyre::Result<()> {
    let cli = Cli::parse_arguments();
    let config = Config::from_env()?.with_backend(cli.backend);
    info!(backend = ?config.backend, force = cli.force, "starting purge");

    let (documents, files) = build_stores(&config, cli.skip_storage)?;
    let depth = if cli.shallow {
        StorageDepth::OneLevel
    } else {
        StorageDepth::Full
    };
    let purge = BulkPurge::new(documents, files, config.collections.clone()).with_depth(depth);

    let mut gate = ConfirmationGate::new(StdinConfirmation, cli.force);
    match purge::confirm_and_run(&mut gate, &purge).await? {
        Some(stats) => stats.print_summary(),
        None => info!("purge declined by operator"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
