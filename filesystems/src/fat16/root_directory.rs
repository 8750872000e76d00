// FAT16 fixed-size root directory
// Entries are appended in order; slots are never reused

use super::file_ops::{entry_name, store_file_data, StoredFile};
use crate::fat_common::constants::DIR_ENTRY_SIZE;
use crate::fat_common::{DirEntry, FatTable, ImageBuffer, Layout};
use log::debug;
use superfloppy_core::{FileSpec, ImageError, ImageResult};

#[derive(Debug, Clone)]
pub struct RootDirectory {
    start_offset: u64,
    capacity: u16,
    next_index: u16,
}

impl RootDirectory {
    pub fn new(layout: &Layout) -> Self {
        Self {
            start_offset: layout.root_offset(),
            capacity: layout.root_entries,
            next_index: 0,
        }
    }

    pub fn entries_used(&self) -> u16 {
        self.next_index
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Byte offset of root slot `index`
    pub fn slot_offset(&self, index: u16) -> u64 {
        self.start_offset + index as u64 * DIR_ENTRY_SIZE as u64
    }

    fn ensure_free_slot(&self) -> ImageResult<()> {
        if self.next_index >= self.capacity {
            return Err(ImageError::CapacityExceeded(format!(
                "root directory is full ({} entries)",
                self.capacity
            )));
        }
        Ok(())
    }

    fn append(&mut self, image: &mut ImageBuffer, entry: &DirEntry) -> ImageResult<()> {
        self.ensure_free_slot()?;
        entry.write_to(image, self.slot_offset(self.next_index))?;
        self.next_index += 1;
        Ok(())
    }

    /// Store `file` in the data region and append its entry.
    pub fn add_file(&mut self, image: &mut ImageBuffer, fat: &mut FatTable, file: &FileSpec) -> ImageResult<StoredFile> {
        let name = entry_name(&file.name)?;
        self.ensure_free_slot()?;

        let stored = store_file_data(image, fat, &file.data)?;
        self.append(image, &DirEntry::file(name, stored.first_cluster, stored.size))?;

        debug!(
            "Added /{} ({} bytes) at cluster {}, root slot {}",
            file.name,
            stored.size,
            stored.first_cluster,
            self.next_index - 1
        );
        Ok(stored)
    }

    /// Append a directory entry for a subdirectory whose cluster is already set up.
    pub fn add_subdir_entry(&mut self, image: &mut ImageBuffer, name: &str, dir_cluster: u16) -> ImageResult<()> {
        let name = entry_name(name)?;
        self.append(image, &DirEntry::directory(name, dir_cluster))
    }
}
