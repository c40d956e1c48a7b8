//! Core result types

use crate::error::FormError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

/// Terminal value of an ingestion run: the parsed form or a single failure.
pub type Outcome = std::result::Result<FormData, FormError>;

/// Metadata the client sent along with a file part
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Client supplied filename (last path component only)
    pub filename: String,
    /// MIME type of the part (default: `text/plain`)
    pub mime_type: String,
    /// Content transfer encoding of the part (default: `7bit`)
    pub encoding: String,
}

/// A file part streamed to disk
///
/// `path` is `None` exactly when `size == 0`: empty files never touch disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskFile {
    /// Client supplied filename
    pub filename: String,
    /// MIME type of the part
    pub mime_type: String,
    /// Content transfer encoding of the part
    pub encoding: String,
    /// Bytes written
    pub size: u64,
    /// Randomly named file holding the contents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl DiskFile {
    pub(crate) fn empty(info: FileInfo) -> Self {
        Self {
            filename: info.filename,
            mime_type: info.mime_type,
            encoding: info.encoding,
            size: 0,
            path: None,
        }
    }

    pub(crate) fn written(info: FileInfo, size: u64, path: PathBuf) -> Self {
        Self {
            filename: info.filename,
            mime_type: info.mime_type,
            encoding: info.encoding,
            size,
            path: Some(path),
        }
    }
}

/// A file part accumulated in memory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFile {
    /// Client supplied filename
    pub filename: String,
    /// MIME type of the part
    pub mime_type: String,
    /// Content transfer encoding of the part
    pub encoding: String,
    /// File contents
    pub contents: Bytes,
}

impl MemoryFile {
    pub(crate) fn new(info: FileInfo) -> Self {
        Self {
            filename: info.filename,
            mime_type: info.mime_type,
            encoding: info.encoding,
            contents: Bytes::new(),
        }
    }
}

/// A name was already present in a singular map
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DuplicateName;

/// Name to value map in one of two shapes, chosen once per run
///
/// - `Singular`: every name maps to one value, a repeated name is rejected
/// - `Repeated`: every name maps to its values in arrival order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartMap<T> {
    /// One value per name
    Singular(HashMap<String, T>),
    /// Ordered values per name
    Repeated(HashMap<String, Vec<T>>),
}

impl<T> PartMap<T> {
    /// Empty map of the requested shape
    pub fn new(repeated: bool) -> Self {
        if repeated {
            PartMap::Repeated(HashMap::new())
        } else {
            PartMap::Singular(HashMap::new())
        }
    }

    /// Whether repeated names are collected
    pub fn is_repeated(&self) -> bool {
        matches!(self, PartMap::Repeated(_))
    }

    /// Insert a value, returning the stored slot.
    ///
    /// A singular map never overwrites: the first value for a name stays.
    pub(crate) fn insert(&mut self, name: String, value: T) -> Result<&mut T, DuplicateName> {
        match self {
            PartMap::Singular(map) => match map.entry(name) {
                Entry::Occupied(_) => Err(DuplicateName),
                Entry::Vacant(slot) => Ok(slot.insert(value)),
            },
            PartMap::Repeated(map) => {
                let values = map.entry(name).or_default();
                let index = values.len();
                values.push(value);
                Ok(&mut values[index])
            }
        }
    }

    /// All values stored under `name`, in arrival order
    pub fn get_all(&self, name: &str) -> &[T] {
        match self {
            PartMap::Singular(map) => map.get(name).map(std::slice::from_ref).unwrap_or(&[]),
            PartMap::Repeated(map) => map.get(name).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// First value stored under `name`
    pub fn get(&self, name: &str) -> Option<&T> {
        self.get_all(name).first()
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        match self {
            PartMap::Singular(map) => map.len(),
            PartMap::Repeated(map) => map.len(),
        }
    }

    /// Whether no name was stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of stored values across all names
    pub fn value_count(&self) -> usize {
        match self {
            PartMap::Singular(map) => map.len(),
            PartMap::Repeated(map) => map.values().map(Vec::len).sum(),
        }
    }

    /// Iterate over every stored value
    pub fn values(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            PartMap::Singular(map) => Box::new(map.values()),
            PartMap::Repeated(map) => Box::new(map.values().flatten()),
        }
    }

    /// Iterate mutably over every stored value
    pub(crate) fn values_mut(&mut self) -> Box<dyn Iterator<Item = &mut T> + '_> {
        match self {
            PartMap::Singular(map) => Box::new(map.values_mut()),
            PartMap::Repeated(map) => Box::new(map.values_mut().flatten()),
        }
    }

    /// Convert every value, keeping the shape, names and order.
    ///
    /// Stops at the first conversion error.
    pub(crate) fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> Result<U, E>,
    ) -> Result<PartMap<U>, E> {
        match self {
            PartMap::Singular(map) => map
                .into_iter()
                .map(|(name, value)| f(value).map(|value| (name, value)))
                .collect::<Result<HashMap<_, _>, E>>()
                .map(PartMap::Singular),
            PartMap::Repeated(map) => map
                .into_iter()
                .map(|(name, values)| {
                    values
                        .into_iter()
                        .map(&mut f)
                        .collect::<Result<Vec<_>, E>>()
                        .map(|values| (name, values))
                })
                .collect::<Result<HashMap<_, _>, E>>()
                .map(PartMap::Repeated),
        }
    }
}

/// Files of a successful run, in the storage mode chosen for it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Files {
    /// Files held in memory
    Memory(PartMap<MemoryFile>),
    /// Files written to disk
    Disk(PartMap<DiskFile>),
}

impl Files {
    /// Files held in memory, if the run used memory mode
    pub fn as_memory(&self) -> Option<&PartMap<MemoryFile>> {
        match self {
            Files::Memory(files) => Some(files),
            Files::Disk(_) => None,
        }
    }

    /// Files written to disk, if the run used disk mode
    pub fn as_disk(&self) -> Option<&PartMap<DiskFile>> {
        match self {
            Files::Disk(files) => Some(files),
            Files::Memory(_) => None,
        }
    }

    /// Total number of file parts
    pub fn value_count(&self) -> usize {
        match self {
            Files::Memory(files) => files.value_count(),
            Files::Disk(files) => files.value_count(),
        }
    }
}

/// Parsed body of a successful run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    /// Non-file fields
    pub fields: PartMap<String>,
    /// File parts
    pub files: Files,
}

impl FormData {
    /// Number of parts received (fields + files)
    pub fn parts_received(&self) -> usize {
        self.fields.value_count() + self.files.value_count()
    }
}
