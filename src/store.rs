//! File-backed config store.
//!
//! A [`ConfigStore`] pairs one [`Document`] with one TOML file. The file is
//! the source of truth: every [`get`](ConfigStore::get) re-reads it, and every
//! [`set`](ConfigStore::set) rewrites it in full.
//!
//! Writes are plain truncate-and-write. There is no locking and no atomic
//! rename, so concurrent writers race (last writer wins) and a crash mid-write
//! can leave a truncated file, which then fails to load as
//! [`Error::CorruptStore`]. A write that fails, whether in the document or on
//! disk, leaves the in-memory document as it was before the call.

use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::timestamp;
use crate::value::{Document, Value};
use std::path::{Path, PathBuf};

/// Timestamp written once, when the store file is first created.
pub const CREATED_AT_KEY: &str = "meta.created-at";

/// Timestamp refreshed on every write made through the façade.
pub const UPDATED_AT_KEY: &str = "meta.updated-at";

const META_TABLE: &str = "meta";
const CREATED_AT_LEAF: &str = "created-at";
const UPDATED_AT_LEAF: &str = "updated-at";

/// Read and parse the document stored at `path`.
pub fn load(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    let document = content.parse::<Document>().map_err(|source| Error::CorruptStore {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded store file");
    Ok(document)
}

/// Serialize `document` and overwrite the file at `path` with it.
pub fn save(path: &Path, document: &Document) -> Result<()> {
    let text = document.to_toml_string()?;
    std::fs::write(path, text).map_err(|e| Error::io(path, e))?;
    tracing::debug!(path = %path.display(), "saved store file");
    Ok(())
}

/// One document bound to one backing file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: Document,
    selector: Selector,
}

impl ConfigStore {
    /// Open the store at `path` using the default `.` delimiter.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_selector(path, Selector::default())
    }

    /// Open the store at `path`, creating and initialising the file if it does
    /// not exist yet.
    ///
    /// A fresh store gets `meta.created-at` and `meta.updated-at` set to the
    /// same timestamp. An existing file that does not parse is reported as
    /// [`Error::CorruptStore`]; it is never replaced with an empty document.
    pub fn open_with_selector(path: impl Into<PathBuf>, selector: Selector) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            document: Document::new(),
            selector,
        };

        if store.path.exists() {
            store.reload()?;
        } else {
            let now = timestamp::now()?;
            metadata_selector().write_at(&mut store.document, CREATED_AT_KEY, now)?;
            metadata_selector().write_at(&mut store.document, UPDATED_AT_KEY, now)?;
            save(&store.path, &store.document)?;
            tracing::info!(path = %store.path.display(), "initialized new store");
        }
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The in-memory document as of the last load or write.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Discard the in-memory document and re-read it from disk.
    pub fn reload(&mut self) -> Result<&Document> {
        self.document = load(&self.path)?;
        Ok(&self.document)
    }

    /// Write `value` at `path` and persist the whole document.
    ///
    /// The `meta` table cannot be replaced, `meta.created-at` cannot be
    /// written, and `meta.updated-at` only accepts a datetime; such writes
    /// fail with [`Error::ReservedKey`] before anything changes.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&Document> {
        let value = value.into();
        self.check_reserved(path, &value)?;
        let selector = self.selector;
        self.apply(|doc| selector.write_at(doc, path, value).map(drop))
    }

    /// Write `value` at `path`, refresh `meta.updated-at`, and persist both
    /// with a single file write.
    pub fn set_and_touch(&mut self, path: &str, value: impl Into<Value>) -> Result<&Document> {
        let value = value.into();
        self.check_reserved(path, &value)?;
        let now = timestamp::now()?;
        let selector = self.selector;
        self.apply(|doc| {
            selector.write_at(doc, path, value)?;
            metadata_selector().write_at(doc, UPDATED_AT_KEY, now)?;
            Ok(())
        })
    }

    /// Reload from disk, then return the value at `path`.
    pub fn get(&mut self, path: &str) -> Result<Value> {
        self.reload()?;
        self.selector.read_at(&self.document, path).cloned()
    }

    /// Set `meta.updated-at` to the current time and persist.
    pub fn touch_updated_at(&mut self) -> Result<&Document> {
        let now = timestamp::now()?;
        self.apply(|doc| metadata_selector().write_at(doc, UPDATED_AT_KEY, now).map(drop))
    }

    /// Run `edit` on the document and save it, restoring the previous
    /// document if either step fails.
    fn apply<F>(&mut self, edit: F) -> Result<&Document>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let previous = self.document.clone();
        let outcome = edit(&mut self.document).and_then(|()| save(&self.path, &self.document));
        if let Err(err) = outcome {
            tracing::debug!(path = %self.path.display(), error = %err, "write failed, document restored");
            self.document = previous;
            return Err(err);
        }
        Ok(&self.document)
    }

    fn check_reserved(&self, path: &str, value: &Value) -> Result<()> {
        let (hierarchy, terminal) = self.selector.split(path)?;
        let reason = match (hierarchy.as_slice(), terminal) {
            ([], META_TABLE) => "the metadata table cannot be replaced",
            ([META_TABLE], CREATED_AT_LEAF) => "the creation time is written once",
            ([META_TABLE], UPDATED_AT_LEAF) if value.as_datetime().is_none() => {
                "the update time must be a datetime"
            }
            _ => return Ok(()),
        };
        Err(Error::ReservedKey {
            path: path.to_string(),
            reason,
        })
    }
}

/// Metadata keys are always dot-delimited, whatever the store's delimiter.
fn metadata_selector() -> Selector {
    Selector::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn timestamp_at(store: &mut ConfigStore, key: &str) -> chrono::DateTime<chrono::FixedOffset> {
        let value = store.get(key).unwrap();
        timestamp::to_chrono(value.as_datetime().unwrap()).unwrap()
    }

    #[test]
    fn test_open_initializes_fresh_store() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut store = ConfigStore::open(&path).unwrap();
        assert!(path.exists());

        let created = store.get(CREATED_AT_KEY).unwrap();
        let updated = store.get(UPDATED_AT_KEY).unwrap();
        assert!(created.as_datetime().is_some());
        assert_eq!(created, updated);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("[meta]"));
        assert!(on_disk.contains("created-at = "));
        assert!(!on_disk.contains("created-at = \""));
    }

    #[test]
    fn test_open_existing_does_not_rewrite_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut first = ConfigStore::open(&path).unwrap();
        let created = first.get(CREATED_AT_KEY).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let mut second = ConfigStore::open(&path).unwrap();
        assert_eq!(second.get(CREATED_AT_KEY).unwrap(), created);
        assert_eq!(second.document(), first.document());
    }

    #[test]
    fn test_open_corrupt_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[meta\ncreated-at = ").unwrap();

        let err = ConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptStore { .. }));
        // the broken file is left as-is
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[meta\ncreated-at = ");
    }

    #[test]
    fn test_open_in_missing_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent").join("config.toml");

        let err = ConfigStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_set_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(tmp.path().join("config.toml")).unwrap();

        store.set("hello.world.test", "value").unwrap();
        store.set("hello.count", 3).unwrap();
        store.set("flags.enabled", false).unwrap();

        assert_eq!(store.get("hello.world.test").unwrap(), Value::from("value"));
        assert_eq!(store.get("hello.count").unwrap(), Value::from(3));
        assert_eq!(store.get("flags.enabled").unwrap(), Value::from(false));
    }

    #[test]
    fn test_set_returns_updated_document() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(tmp.path().join("config.toml")).unwrap();

        let doc = store.set("hello", "world").unwrap();
        assert_eq!(doc.get("hello"), Some(&Value::from("world")));
        assert!(doc.contains_key("meta"));
    }

    #[test]
    fn test_set_persists_full_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();

        store.set("a.b", "c").unwrap();
        let on_disk = load(&path).unwrap();
        assert_eq!(&on_disk, store.document());
    }

    #[test]
    fn test_get_sees_external_edits() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();

        let mut edited = load(&path).unwrap();
        Selector::default().write_at(&mut edited, "external.key", "edited").unwrap();
        save(&path, &edited).unwrap();

        assert_eq!(store.get("external.key").unwrap(), Value::from("edited"));
    }

    #[test]
    fn test_get_missing_key_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(tmp.path().join("config.toml")).unwrap();

        let err = store.get("meta.missing").unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[test]
    fn test_set_through_scalar_fails_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();
        store.set("foo", "bar").unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store.set("foo.baz", "x").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(store.get("foo").unwrap(), Value::from("bar"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_touch_updated_at_advances_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(tmp.path().join("config.toml")).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        store.touch_updated_at().unwrap();
        let created = timestamp_at(&mut store, CREATED_AT_KEY);
        let updated = timestamp_at(&mut store, UPDATED_AT_KEY);
        assert!(updated > created);
    }

    #[test]
    fn test_set_and_touch_writes_value_and_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let doc = store.set_and_touch("hello.world", "test").unwrap().clone();
        assert_eq!(load(&path).unwrap(), doc);
        assert_eq!(store.get("hello.world").unwrap(), Value::from("test"));
        let created = timestamp_at(&mut store, CREATED_AT_KEY);
        let updated = timestamp_at(&mut store, UPDATED_AT_KEY);
        assert!(updated > created);
    }

    #[test]
    fn test_reserved_metadata_writes_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();
        let now = timestamp::now().unwrap();

        for (key, value) in [
            ("meta", Value::from("oops")),
            ("meta", Value::from(Document::new())),
            (CREATED_AT_KEY, Value::from(now)),
            (UPDATED_AT_KEY, Value::from("yesterday")),
        ] {
            let err = store.set(key, value.clone()).unwrap_err();
            assert!(matches!(err, Error::ReservedKey { .. }), "{key} = {value:?}");
            let err = store.set_and_touch(key, value).unwrap_err();
            assert!(matches!(err, Error::ReservedKey { .. }));
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);

        store.set(UPDATED_AT_KEY, now).unwrap();
        store.set("meta.note", "free-form").unwrap();
        assert_eq!(store.get("meta.note").unwrap(), Value::from("free-form"));
        assert!(store.get(CREATED_AT_KEY).unwrap().as_datetime().is_some());
    }

    #[test]
    fn test_failed_save_restores_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut store = ConfigStore::open(&path).unwrap();
        let before = store.document().clone();

        // TOML only stores four-digit years
        let unwritable = toml::value::Datetime {
            date: Some(toml::value::Date {
                year: 10000,
                month: 1,
                day: 1,
            }),
            time: None,
            offset: None,
        };
        let err = store.set("when", unwritable).unwrap_err();
        assert!(matches!(err, Error::Serialize(_)));
        assert_eq!(store.document(), &before);

        store.set("ok", 1).unwrap();
        store.touch_updated_at().unwrap();
        assert_eq!(store.get("ok").unwrap(), Value::from(1));
        assert!(store.get("when").unwrap_err().is_key_not_found());
    }

    #[test]
    fn test_custom_delimiter() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store =
            ConfigStore::open_with_selector(tmp.path().join("config.toml"), Selector::new('/'))
                .unwrap();

        store.set("a/b.c", "slash").unwrap();
        assert_eq!(store.get("a/b.c").unwrap(), Value::from("slash"));
        assert!(store.get("meta/created-at").unwrap().as_datetime().is_some());
    }
}
