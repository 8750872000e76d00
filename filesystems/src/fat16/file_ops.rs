// File data placement in the data region

use crate::fat_common::{format_83_name, FatTable, ImageBuffer};
use superfloppy_core::{ImageError, ImageResult};

/// Where a file's bytes were written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredFile {
    pub first_cluster: u16,
    pub clusters: u32,
    pub size: u32,
}

/// Clusters a file of `len` bytes occupies. Empty files still get one.
pub fn clusters_for(len: usize, bytes_per_cluster: u32) -> u32 {
    let clusters = (len as u64).div_ceil(bytes_per_cluster as u64).max(1);
    u32::try_from(clusters).unwrap_or(u32::MAX)
}

/// Short name for a directory entry. Empty names are refused; everything
/// else is sanitized by the 8.3 encoder.
pub fn entry_name(name: &str) -> ImageResult<[u8; 11]> {
    if name.is_empty() {
        return Err(ImageError::InvalidInput("entry name is empty".to_string()));
    }
    Ok(format_83_name(name))
}

/// Allocate a contiguous chain for `data` and copy the bytes to its start.
pub fn store_file_data(image: &mut ImageBuffer, fat: &mut FatTable, data: &[u8]) -> ImageResult<StoredFile> {
    let size = u32::try_from(data.len()).map_err(|_| {
        ImageError::CapacityExceeded(format!("file of {} bytes exceeds the FAT size field", data.len()))
    })?;
    let clusters = clusters_for(data.len(), fat.layout().bytes_per_cluster());
    let first_cluster = fat.allocate(image, clusters)?;

    let offset = fat.layout().cluster_offset(first_cluster);
    image.write_at(offset, data)?;

    Ok(StoredFile {
        first_cluster,
        clusters,
        size,
    })
}
