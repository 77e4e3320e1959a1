//! The address book: a JSON file mapping each logical contract name to the
//! metadata of its deployment, plus the fingerprint used to decide whether a
//! contract needs redeploying and the files derived from the book.

mod create2_check;
mod export;
mod fingerprint;
mod record;
mod store;

pub use create2_check::{Create2Entry, CsvError, Finding, compare_create2, parse_create2_csv};
pub use export::{env_var_name, render_csv, render_env};
pub use fingerprint::{BytecodeHash, FingerprintError, VERSION_MARKER};
pub use record::{AddressBook, ContractRecord, ContractType};
pub use store::{AddressBookStore, StoreError};

/// Default file name of the address book.
pub const DEFAULT_ADDRESS_BOOK: &str = "addressBook.json";

/// Default file name of the generated env file.
pub const DEFAULT_ENV_FILE: &str = "contracts.env";
