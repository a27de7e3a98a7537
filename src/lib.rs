//! `trapdoor` — persistent key-value settings backed by a TOML file.
//!
//! Provides:
//! - `selector` — Dot-delimited path lookups and writes over nested tables
//! - `store` — A document bound to one TOML file, reloaded on every read
//! - `facade` — Named stores in `~/.<name>/` with `meta.*` timestamps
//! - `data_dir` — Store directory creation with `0700` permissions
//!
//! ```no_run
//! use trapdoor::Trapdoor;
//!
//! # fn main() -> trapdoor::Result<()> {
//! let mut store = Trapdoor::open("my_app")?;
//! store.set("server.port", 8080)?;
//! assert_eq!(store.get("server.port")?.as_integer(), Some(8080));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

pub mod data_dir;
pub mod error;
pub mod facade;
pub mod selector;
pub mod store;
pub mod timestamp;
pub mod value;

pub use error::{Error, ParseError, Result};
pub use facade::{StoreOptions, Trapdoor};
pub use selector::Selector;
pub use store::ConfigStore;
pub use value::{Document, Value};

/// Get the default directory for a store: `~/.<store_name>/`.
pub fn store_dir(store_name: &str) -> Result<PathBuf> {
    Ok(home_dir()?.join(format!(".{store_name}")))
}

/// Replace a leading `~` component with the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        Error::InvalidStoreDirectory("could not determine the home directory".to_string())
    })
}
