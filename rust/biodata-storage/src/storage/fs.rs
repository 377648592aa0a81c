use std::path::{Path, PathBuf};

use base58::ToBase58;

use crate::{DurableStorage, StorageError};

/// A basic file-system-based [DurableStorage] implementation. Every entry is
/// a file inside a root directory, named after its (base58-encoded) key.
///
/// Used by native builds of the console, where there is no browser storage
/// to persist the session across restarts.
#[derive(Clone, Debug)]
pub struct FileSystemStorage {
    root_dir: PathBuf,
}

impl FileSystemStorage {
    /// Creates a new [`FileSystemStorage`] that stores files in `root_dir`,
    /// creating the directory if needed.
    pub fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, StorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = root_dir.as_ref().to_owned();
        std::fs::create_dir_all(&root_dir)
            .map_err(|error| StorageError::Unavailable(format!("{error}")))?;
        Ok(Self { root_dir })
    }

    fn make_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key.as_bytes().to_base58())
    }
}

impl DurableStorage for FileSystemStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.make_path(key);
        if !path.exists() {
            return Ok(None);
        }

        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|error| StorageError::Read {
                key: key.to_owned(),
                reason: format!("{error}"),
            })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.make_path(key), value).map_err(|error| StorageError::Write {
            key: key.to_owned(),
            reason: format!("{error}"),
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.make_path(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StorageError::Remove {
                key: key.to_owned(),
                reason: format!("{error}"),
            }),
        }
    }
}
