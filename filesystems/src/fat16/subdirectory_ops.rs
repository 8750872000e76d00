// FAT16 Subdirectory Operations
// Directory clusters live in the data region and grow one cluster at a time

use super::file_ops::{entry_name, store_file_data, StoredFile};
use super::root_directory::RootDirectory;
use crate::fat_common::constants::DIR_ENTRY_SIZE;
use crate::fat_common::directory::is_free_slot_marker;
use crate::fat_common::{DirEntry, FatTable, ImageBuffer};
use log::{debug, trace};
use superfloppy_core::{FileSpec, ImageError, ImageResult};

/// Cluster number ".." uses to refer to the root directory
pub const ROOT_PARENT_CLUSTER: u16 = 0;

/// Subdirectory operations for FAT16 images
pub struct SubdirectoryOps;

impl SubdirectoryOps {
    /// Create a root-level subdirectory with "." and ".." entries.
    /// Returns the directory's first cluster.
    pub fn create(
        image: &mut ImageBuffer,
        fat: &mut FatTable,
        root: &mut RootDirectory,
        name: &str,
    ) -> ImageResult<u16> {
        entry_name(name)?;
        if root.entries_used() >= root.capacity() {
            return Err(ImageError::CapacityExceeded(format!(
                "root directory is full ({} entries), cannot create {}",
                root.capacity(),
                name
            )));
        }

        let dir_cluster = fat.allocate(image, 1)?;
        Self::init_cluster(image, fat, dir_cluster)?;

        let base = fat.layout().cluster_offset(dir_cluster);
        DirEntry::dot(dir_cluster).write_to(image, base)?;
        DirEntry::dotdot(ROOT_PARENT_CLUSTER).write_to(image, base + DIR_ENTRY_SIZE as u64)?;

        root.add_subdir_entry(image, name, dir_cluster)?;

        debug!("Created directory /{} at cluster {}", name, dir_cluster);
        Ok(dir_cluster)
    }

    fn init_cluster(image: &mut ImageBuffer, fat: &FatTable, cluster: u16) -> ImageResult<()> {
        let layout = fat.layout();
        image.zero(layout.cluster_offset(cluster), layout.bytes_per_cluster() as usize)
    }

    /// Find the first free slot in the directory starting at `dir_cluster`,
    /// scanning its chain in link order. Returns the slot's byte offset.
    pub fn find_free_entry(image: &ImageBuffer, fat: &FatTable, dir_cluster: u16) -> ImageResult<Option<u64>> {
        let layout = fat.layout();
        for cluster in fat.chain(image, dir_cluster) {
            let base = layout.cluster_offset(cluster?);
            for slot in 0..layout.entries_per_cluster() as u64 {
                let offset = base + slot * DIR_ENTRY_SIZE as u64;
                if is_free_slot_marker(image.byte_at(offset)?) {
                    return Ok(Some(offset));
                }
            }
        }
        Ok(None)
    }

    /// Grow the directory by one zeroed cluster linked to the end of its chain.
    /// Returns the byte offset of the new cluster's first slot.
    pub fn grow(image: &mut ImageBuffer, fat: &mut FatTable, dir_cluster: u16) -> ImageResult<u64> {
        let new_cluster = fat.allocate(image, 1)?;
        Self::init_cluster(image, fat, new_cluster)?;

        let tail = fat.chain_tail(image, dir_cluster)?;
        fat.link(image, tail, new_cluster)?;

        debug!(
            "Directory at cluster {} grew: cluster {} linked after {}",
            dir_cluster, new_cluster, tail
        );
        Ok(fat.layout().cluster_offset(new_cluster))
    }

    /// Store `file` and add its entry to the directory at `dir_cluster`.
    pub fn add_file(
        image: &mut ImageBuffer,
        fat: &mut FatTable,
        dir_cluster: u16,
        file: &FileSpec,
    ) -> ImageResult<StoredFile> {
        if !fat.is_data_cluster(dir_cluster) {
            return Err(ImageError::InvalidInput(format!(
                "cluster {} is not a data cluster",
                dir_cluster
            )));
        }
        let name = entry_name(&file.name)?;

        let stored = store_file_data(image, fat, &file.data)?;

        let slot = match Self::find_free_entry(image, fat, dir_cluster)? {
            Some(offset) => offset,
            None => Self::grow(image, fat, dir_cluster)?,
        };
        trace!("Directory entry for {} at offset {:#x}", file.name, slot);

        DirEntry::file(name, stored.first_cluster, stored.size).write_to(image, slot)?;
        Ok(stored)
    }
}
