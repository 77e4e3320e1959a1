//! Compare the address book with an external CREATE2 deployment list.
//!
//! Exits non-zero when any address or presalt disagrees.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use lens_address_book::{
    AddressBookStore, DEFAULT_ADDRESS_BOOK, Finding, compare_create2, parse_create2_csv,
};
use lens_utils::logging;
use tracing::{info, warn};

#[derive(Clone, Debug, Parser)]
struct Args {
    #[clap(short, long, default_value = DEFAULT_ADDRESS_BOOK)]
    address_book: PathBuf,

    /// CSV with `ContractName,Address,PreSalt` columns.
    #[clap(short, long, default_value = "create2.csv")]
    csv: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let content = tokio::fs::read_to_string(&args.csv)
        .await
        .with_context(|| format!("failed to read {:?}", args.csv))?;
    let entries = parse_create2_csv(&content)?;
    let book = AddressBookStore::open(&args.address_book)?.load().await?;

    let findings = compare_create2(&entries, &book);
    for f in &findings {
        match f {
            Finding::AddressMatch(name) => info!(%name, "addresses match"),
            Finding::PresaltMatch(name) => info!(%name, "presalts match"),
            Finding::MissingInBook(name) => warn!(%name, "listed in csv but not in address book"),
            Finding::MissingInCsv(name) => warn!(%name, "in address book but not in csv"),
            Finding::AddressMismatch { name, csv, book } => {
                warn!(%name, %csv, %book, "address mismatch")
            }
            Finding::PresaltMismatch { name, csv, book } => {
                warn!(%name, ?csv, ?book, "presalt mismatch")
            }
        }
    }

    let problems = findings.iter().filter(|f| f.is_problem()).count();
    if problems > 0 {
        bail!("{problems} discrepancies between {:?} and {:?}", args.csv, args.address_book)
    }
    Ok(())
}
