//! Named stores living in a private directory, usually `~/.<store-name>/`.

use crate::data_dir::{self, STORE_DIR_MODE};
use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::store::ConfigStore;
use crate::value::{Document, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default name of the backing file inside the store directory.
pub const DEFAULT_FILENAME: &str = "config.toml";

/// How a [`Trapdoor`] locates and addresses its store.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    directory: Option<PathBuf>,
    filename: Option<String>,
    testing: bool,
    selector: Selector,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store directory to use instead of `~/.<store-name>/`. A leading `~`
    /// is expanded to the home directory.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Backing file name instead of `config.toml`.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Allow [`Trapdoor::destroy`]. Only meant for test suites.
    pub fn testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    /// Segment delimiter for selectors, `.` by default.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.selector = Selector::new(delimiter);
        self
    }
}

/// A named settings store.
///
/// Every [`set`](Trapdoor::set) also refreshes `meta.updated-at`; every
/// [`get`](Trapdoor::get) reads the file afresh.
#[derive(Debug)]
pub struct Trapdoor {
    store_name: String,
    store_directory: PathBuf,
    testing: bool,
    store: ConfigStore,
}

impl Trapdoor {
    /// Open (or create) the store `store_name` in `~/.<store_name>/config.toml`.
    pub fn open(store_name: &str) -> Result<Self> {
        Self::open_with(store_name, StoreOptions::default())
    }

    /// Open (or create) the store `store_name` as described by `options`.
    ///
    /// The store directory is created with mode `0700` if missing, and an
    /// existing directory with other permissions is tightened to `0700`.
    pub fn open_with(store_name: &str, options: StoreOptions) -> Result<Self> {
        if store_name.is_empty() {
            return Err(Error::InvalidStoreDirectory(
                "store name must not be empty".to_string(),
            ));
        }

        let store_directory = match options.directory {
            Some(dir) if dir.as_os_str().is_empty() => {
                return Err(Error::InvalidStoreDirectory(
                    "store directory must not be empty".to_string(),
                ))
            }
            Some(dir) => crate::expand_home(&dir)?,
            None => crate::store_dir(store_name)?,
        };

        let filename = options
            .filename
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        if filename.is_empty() {
            return Err(Error::InvalidStoreDirectory(
                "config filename must not be empty".to_string(),
            ));
        }

        data_dir::ensure_directory(&store_directory, STORE_DIR_MODE)?;
        let store = ConfigStore::open_with_selector(store_directory.join(filename), options.selector)?;
        tracing::debug!(store = store_name, path = %store.path().display(), "opened store");

        Ok(Self {
            store_name: store_name.to_string(),
            store_directory,
            testing: options.testing,
            store,
        })
    }

    /// Read the value at `path`, reloading the file first.
    pub fn get(&mut self, path: &str) -> Result<Value> {
        self.store.get(path)
    }

    /// Write `value` at `path`, persist it, and bump `meta.updated-at`.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&Document> {
        self.store.set_and_touch(path, value)
    }

    /// Remove the whole store directory. Refused unless the store was opened
    /// with [`StoreOptions::testing`].
    pub fn destroy(self) -> Result<()> {
        if !self.testing {
            return Err(Error::DestroyRefused {
                path: self.store_directory,
            });
        }

        std::fs::remove_dir_all(&self.store_directory)
            .map_err(|e| Error::io(&self.store_directory, e))?;
        tracing::info!(path = %self.store_directory.display(), "destroyed store directory");
        Ok(())
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn store_directory(&self) -> &Path {
        &self.store_directory
    }

    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    pub fn is_testing(&self) -> bool {
        self.testing
    }

    /// The underlying file-backed store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}

impl fmt::Display for Trapdoor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Store name: {}, Store directory: {})",
            self.store_name,
            self.store_directory.display()
        )
    }
}
