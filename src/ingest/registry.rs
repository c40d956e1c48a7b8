//! Part classifier and registry
//!
//! Applies the naming policy to decoded parts and builds the result maps as
//! parts arrive. The storage shape is picked once per run.

use super::disk_sink::{DiskSlot, PendingWrite, WriteReport};
use crate::config::StorageMode;
use crate::error::FormError;
use crate::types::{DiskFile, FileInfo, Files, FormData, MemoryFile, PartMap};
use tracing::debug;

/// File storage of one run
#[derive(Debug)]
enum FileSlots {
    Memory(PartMap<MemoryFile>),
    Disk(PartMap<DiskSlot>),
}

/// Where the bytes of a newly registered file part go
pub(crate) enum FileSlot<'a> {
    Memory(&'a mut MemoryFile),
    Disk(&'a mut DiskSlot),
}

#[derive(Debug)]
pub(crate) struct Registry {
    fields: PartMap<String>,
    files: FileSlots,
}

impl Registry {
    pub(crate) fn new(storage: StorageMode, repeated: bool) -> Self {
        let files = match storage {
            StorageMode::Memory => FileSlots::Memory(PartMap::new(repeated)),
            StorageMode::Disk => FileSlots::Disk(PartMap::new(repeated)),
        };
        Self {
            fields: PartMap::new(repeated),
            files,
        }
    }

    pub(crate) fn add_field(&mut self, name: String, value: String) -> Result<(), FormError> {
        debug!(name = %name, kind = "field", "part classified");
        self.fields
            .insert(name.clone(), value)
            .map(|_| ())
            .map_err(|_| FormError::DuplicateField { name })
    }

    /// Register a file part and hand back the slot its sink fills
    pub(crate) fn add_file(&mut self, name: String, info: FileInfo) -> Result<FileSlot<'_>, FormError> {
        debug!(name = %name, filename = %info.filename, kind = "file", "part classified");
        let duplicate = |_| FormError::DuplicateFile { name: name.clone() };
        match &mut self.files {
            FileSlots::Memory(files) => files
                .insert(name.clone(), MemoryFile::new(info))
                .map(FileSlot::Memory)
                .map_err(duplicate),
            FileSlots::Disk(files) => files
                .insert(name.clone(), DiskSlot::new(info))
                .map(FileSlot::Disk)
                .map_err(duplicate),
        }
    }

    /// Every disk job started so far
    pub(crate) fn pending_writes(&mut self) -> Box<dyn Iterator<Item = &mut PendingWrite> + '_> {
        match &mut self.files {
            FileSlots::Memory(_) => Box::new(std::iter::empty()),
            FileSlots::Disk(files) => {
                Box::new(files.values_mut().filter_map(|slot| slot.write.as_mut()))
            }
        }
    }

    pub(crate) fn is_disk(&self) -> bool {
        matches!(self.files, FileSlots::Disk(_))
    }

    /// First disk job that did not end with all of its bytes on disk
    pub(crate) fn incomplete_write(&self) -> Option<FormError> {
        let FileSlots::Disk(files) = &self.files else {
            return None;
        };
        files
            .values()
            .find(|slot| {
                slot.write.as_ref().is_some_and(|write| {
                    !matches!(write.report(), Some(WriteReport::Written { .. }))
                })
            })
            .map(|slot| incomplete(&slot.info))
    }

    /// Build the success value. Every pending write must be settled.
    pub(crate) fn finish(self) -> Result<FormData, FormError> {
        let files = match self.files {
            FileSlots::Memory(files) => Files::Memory(files),
            FileSlots::Disk(files) => Files::Disk(files.try_map(|slot| match slot.write {
                None => Ok(DiskFile::empty(slot.info)),
                Some(write) => match write.report() {
                    Some(WriteReport::Written { size }) => {
                        let path = write.path().to_path_buf();
                        Ok(DiskFile::written(slot.info, size, path))
                    }
                    _ => Err(incomplete(&slot.info)),
                },
            })?),
        };
        Ok(FormData {
            fields: self.fields,
            files,
        })
    }
}

fn incomplete(info: &FileInfo) -> FormError {
    FormError::Write(format!("File {} was not fully written", info.filename))
}
