use clap::Parser;

use crate::config::Backend;

/// Wipes every document of the CV builder collections and every stored file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Skip the confirmation prompt and the pause before starting
    #[arg(short, long)]
    pub force: bool,

    /// Store to purge, overrides PURGE_BACKEND
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Only descend one level below the root of the file store
    #[arg(long)]
    pub shallow: bool,

    /// Leave the file store untouched
    #[arg(long)]
    pub skip_storage: bool,
}

impl Cli {
    pub fn parse_arguments() -> Cli {
        Cli::parse()
    }
}
