use std::{
    fs::{File, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use fd_lock::RwLock;
use tokio::fs;
use tracing::debug;

use crate::{AddressBook, ContractRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("malformed address book {0}: {1}")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("address book {0} is locked by another running invocation ({1})")]
    Locked(PathBuf, PathBuf),

    #[error("{0} not found in address book")]
    Missing(String),
}

/// File-backed address book.
///
/// Opening the store takes an exclusive OS lock on `<book>.lock`, so two
/// tooling invocations can not interleave their read-modify-write cycles.
/// The lock belongs to the open handle: the OS drops it when the process
/// exits, however it exits. Saves go through a temporary file and a rename.
#[derive(Debug)]
pub struct AddressBookStore {
    path: PathBuf,
    _lock: RwLock<File>,
}

impl AddressBookStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let lock_path = sibling(&path, "lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::Io(lock_path.clone(), e))?;
        let mut lock = RwLock::new(file);
        let mut guard = match lock.try_write() {
            Ok(g) => g,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(StoreError::Locked(path, lock_path));
            }
            Err(e) => return Err(StoreError::Io(lock_path, e)),
        };
        guard
            .set_len(0)
            .and_then(|()| guard.write_all(format!("{}\n", std::process::id()).as_bytes()))
            .map_err(|e| StoreError::Io(lock_path.clone(), e))?;
        // Held until the handle is closed.
        std::mem::forget(guard);
        debug!(path = %path.display(), lock = %lock_path.display(), "address book opened");
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current book. A missing file is an empty book.
    pub async fn load(&self) -> Result<AddressBook, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AddressBook::new()),
            Err(e) => return Err(StoreError::Io(self.path.clone(), e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(AddressBook::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Json(self.path.clone(), e))
    }

    /// Replace the persisted book with `book`.
    pub async fn save(&self, book: &AddressBook) -> Result<(), StoreError> {
        let mut json =
            serde_json::to_vec_pretty(book).map_err(|e| StoreError::Json(self.path.clone(), e))?;
        json.push(b'\n');
        let tmp = sibling(&self.path, "tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(self.path.clone(), e))
    }

    /// Load, apply `f`, save.
    pub async fn update<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut AddressBook) -> T,
    {
        let mut book = self.load().await?;
        let out = f(&mut book);
        self.save(&book).await?;
        Ok(out)
    }

    /// Store `record` under `name` (replacing any previous record).
    pub async fn put(&self, name: &str, record: ContractRecord) -> Result<(), StoreError> {
        self.update(|book| book.insert(name, record)).await
    }

    pub async fn record(&self, name: &str) -> Result<Option<ContractRecord>, StoreError> {
        Ok(self.load().await?.get(name).cloned())
    }

    pub async fn address_of(&self, name: &str) -> Result<Option<Address>, StoreError> {
        Ok(self.load().await?.address_of(name))
    }

    /// Like [`Self::address_of`] but a missing entry is an error.
    pub async fn require_address(&self, name: &str) -> Result<Address, StoreError> {
        self.address_of(name)
            .await?
            .ok_or_else(|| StoreError::Missing(name.to_string()))
    }
}

fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContractType;
    use alloy_primitives::address;

    fn rule(addr: Address) -> ContractRecord {
        let mut r = ContractRecord::new("RuleX", ContractType::Rule);
        r.address = Some(addr);
        r
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AddressBookStore::open(dir.path().join("addressBook.json")).unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addressBook.json");
        let a = address!("0x00000000000000000000000000000000000000aa");
        {
            let store = AddressBookStore::open(&path).unwrap();
            store.put("RuleX", rule(a)).await.unwrap();
            assert_eq!(store.require_address("RuleX").await.unwrap(), a);
            assert!(matches!(
                store.require_address("RuleY").await,
                Err(StoreError::Missing(n)) if n == "RuleY"
            ));
        }
        let store = AddressBookStore::open(&path).unwrap();
        let book = store.load().await.unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("RuleX").unwrap().address, Some(a));
        assert!(!sibling(&path, "tmp").exists());
    }

    #[tokio::test]
    async fn second_open_is_refused_until_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addressBook.json");
        let first = AddressBookStore::open(&path).unwrap();
        assert!(matches!(
            AddressBookStore::open(&path),
            Err(StoreError::Locked(..))
        ));
        drop(first);
        assert!(AddressBookStore::open(&path).is_ok());
    }

    #[tokio::test]
    async fn leftover_lock_file_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addressBook.json");
        let lock = sibling(&path, "lock");
        std::fs::write(&lock, "4242\n").unwrap();

        let store = AddressBookStore::open(&path).unwrap();
        store.put("RuleX", rule(Address::with_last_byte(1))).await.unwrap();
        let pid = std::fs::read_to_string(&lock).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }

    #[tokio::test]
    async fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addressBook.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = AddressBookStore::open(&path).unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Json(..))));
    }
}
