//! Export the address book as a `Contract,Address` CSV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_address_book::{AddressBookStore, DEFAULT_ADDRESS_BOOK, render_csv};
use lens_utils::logging;
use tracing::info;

#[derive(Clone, Debug, Parser)]
struct Args {
    #[clap(short, long, default_value = DEFAULT_ADDRESS_BOOK)]
    address_book: PathBuf,

    #[clap(short, long, default_value = "addresses.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let book = AddressBookStore::open(&args.address_book)?.load().await?;
    tokio::fs::write(&args.output, render_csv(&book))
        .await
        .with_context(|| format!("failed to write {:?}", args.output))?;
    info!(entries = book.len(), path = %args.output.display(), "csv written");
    Ok(())
}
