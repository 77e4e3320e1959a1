//! Generate the env file listing every deployed contract address.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_address_book::{AddressBookStore, DEFAULT_ADDRESS_BOOK, DEFAULT_ENV_FILE, render_env};
use lens_utils::logging;
use tracing::info;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Address book to read.
    #[clap(short, long, default_value = DEFAULT_ADDRESS_BOOK)]
    address_book: PathBuf,

    /// Env file to write.
    #[clap(short, long, default_value = DEFAULT_ENV_FILE)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let store = AddressBookStore::open(&args.address_book)?;
    let book = store.load().await?;

    info!(entries = book.len(), "generating env file");
    tokio::fs::write(&args.output, render_env(&book))
        .await
        .with_context(|| format!("failed to write env file {:?}", args.output))?;
    info!(path = %args.output.display(), "env file written");
    Ok(())
}
