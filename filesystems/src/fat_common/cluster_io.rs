// In-memory image arena and cluster addressing
// Every access names an explicit byte offset; there is no cursor state

use byteorder::{ByteOrder, LittleEndian};
use superfloppy_core::{ImageError, ImageResult};
use std::ops::Range;

/// Calculate the byte offset of a cluster in the data region
pub fn cluster_to_offset(
    cluster: u16,
    sectors_per_cluster: u32,
    bytes_per_sector: u32,
    data_start_offset: u64,
) -> u64 {
    // Clusters are numbered from 2 in FAT filesystems
    let cluster_offset = (cluster as u64 - 2) * sectors_per_cluster as u64 * bytes_per_sector as u64;
    data_start_offset + cluster_offset
}

/// Zero-initialised byte buffer holding a whole disk image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
}

impl ImageBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self { bytes: vec![0u8; len] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, offset: u64, len: usize) -> ImageResult<Range<usize>> {
        let start = usize::try_from(offset).ok();
        match start.and_then(|s| s.checked_add(len).map(|e| (s, e))) {
            Some((start, end)) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(ImageError::CapacityExceeded(format!(
                "access of {} bytes at offset {:#x} runs past the end of the image ({} bytes)",
                len,
                offset,
                self.bytes.len()
            ))),
        }
    }

    pub fn slice(&self, offset: u64, len: usize) -> ImageResult<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.bytes[range])
    }

    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> ImageResult<()> {
        let range = self.range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    pub fn zero(&mut self, offset: u64, len: usize) -> ImageResult<()> {
        let range = self.range(offset, len)?;
        self.bytes[range].fill(0);
        Ok(())
    }

    pub fn byte_at(&self, offset: u64) -> ImageResult<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: u64) -> ImageResult<u16> {
        Ok(LittleEndian::read_u16(self.slice(offset, 2)?))
    }

    pub fn write_u16(&mut self, offset: u64, value: u16) -> ImageResult<()> {
        let range = self.range(offset, 2)?;
        LittleEndian::write_u16(&mut self.bytes[range], value);
        Ok(())
    }
}
