//! Selector engine: dot-delimited paths over a [`Document`] tree.
//!
//! A selector such as `hello.world.test` splits into a hierarchy
//! (`["hello", "world"]`) and a terminal key (`test`). All operations here are
//! pure; they never touch the file system.
//!
//! Reads are strict: a missing segment is a [`Error::KeyNotFound`], never a
//! silent `None`. A stored `""`, `0` or `false` is a present value like any
//! other. Callers that want "absent" as a result can check
//! [`Error::is_key_not_found`].

use crate::error::{Error, Result};
use crate::value::{Document, Value};
use std::collections::btree_map::Entry;

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = '.';

/// Path algebra parameterised by the segment delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    delimiter: char,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl Selector {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Split `path` into its hierarchy and terminal key.
    ///
    /// Segments are kept verbatim: `a..b` yields the hierarchy `["a", ""]`.
    pub fn split<'a>(&self, path: &'a str) -> Result<(Vec<&'a str>, &'a str)> {
        if path.is_empty() {
            return Err(Error::InvalidSelector {
                selector: path.to_string(),
                reason: "selector must not be empty",
            });
        }

        let mut hierarchy: Vec<&str> = path.split(self.delimiter).collect();
        // split() on a non-empty string always yields at least one segment
        let terminal = hierarchy.pop().unwrap_or(path);
        Ok((hierarchy, terminal))
    }

    /// Build a fresh document holding `value` at `path`.
    pub fn build_nested(&self, path: &str, value: impl Into<Value>) -> Result<Document> {
        let (hierarchy, terminal) = self.split(path)?;
        let mut doc = Document::new();
        doc.insert(terminal, value);
        for segment in hierarchy.into_iter().rev() {
            let mut parent = Document::new();
            parent.insert(segment, doc);
            doc = parent;
        }
        Ok(doc)
    }

    /// Look up the value at `path`.
    pub fn read_at<'d>(&self, document: &'d Document, path: &str) -> Result<&'d Value> {
        let (hierarchy, terminal) = self.split(path)?;
        let mut table = document;
        for segment in hierarchy {
            table = match table.get(segment) {
                Some(Value::Table(inner)) => inner,
                Some(other) => return Err(mismatch(segment, path, other)),
                None => return Err(not_found(segment, path)),
            };
        }
        table.get(terminal).ok_or_else(|| not_found(terminal, path))
    }

    /// Store `value` at `path`, creating intermediate tables as needed.
    ///
    /// An intermediate segment that already holds a scalar is rejected with
    /// [`Error::TypeMismatch`]; the document is left untouched in that case.
    pub fn write_at<'d>(
        &self,
        document: &'d mut Document,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<&'d mut Document> {
        let (hierarchy, terminal) = self.split(path)?;

        // Mismatches can only occur before the first table is created, so
        // validating up front keeps a failed write free of side effects.
        let mut probe: &Document = document;
        for segment in &hierarchy {
            match probe.get(segment) {
                Some(Value::Table(inner)) => probe = inner,
                Some(other) => return Err(mismatch(segment, path, other)),
                None => break,
            }
        }

        let mut table: &mut Document = document;
        for segment in hierarchy {
            let node = match table.entry(segment) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => slot.insert(Value::Table(Document::new())),
            };
            table = match node {
                Value::Table(inner) => inner,
                other => return Err(mismatch(segment, path, other)),
            };
        }
        table.insert(terminal, value);
        Ok(document)
    }
}

fn not_found(segment: &str, path: &str) -> Error {
    Error::KeyNotFound {
        segment: segment.to_string(),
        path: path.to_string(),
    }
}

fn mismatch(segment: &str, path: &str, found: &Value) -> Error {
    Error::TypeMismatch {
        segment: segment.to_string(),
        path: path.to_string(),
        found: found.type_name(),
    }
}
