// Directory entry handling for FAT16 images
// 8.3 short name encoding and the 32-byte on-disk record

use super::cluster_io::ImageBuffer;
use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use superfloppy_core::ImageResult;

/// Check if a character may appear in an 8.3 name we generate
pub fn is_valid_83_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '!' | '#' | '$' | '%' | '&' | '@')
}

fn sanitize_component(part: &str, width: usize) -> impl Iterator<Item = u8> + '_ {
    part.chars()
        .filter(|&c| is_valid_83_char(c))
        .take(width)
        .map(|c| c as u8)
}

/// Format a host filename as an 11-byte space-padded 8.3 name.
///
/// The name is upper-cased and split on its last dot; disallowed characters
/// are dropped, then the base is cut to 8 and the extension to 3 characters.
/// Distinct inputs can map to the same short name; that is not detected.
pub fn format_83_name(filename: &str) -> [u8; 11] {
    let mut result = [0x20u8; 11];

    let upper = filename.to_uppercase();
    let (base, ext) = match upper.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (upper.as_str(), ""),
    };

    for (slot, byte) in result[..8].iter_mut().zip(sanitize_component(base, 8)) {
        *slot = byte;
    }
    for (slot, byte) in result[8..].iter_mut().zip(sanitize_component(ext, 3)) {
        *slot = byte;
    }

    result
}

/// One 32-byte directory record. Timestamps and the remaining fields stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attributes: u8,
    pub first_cluster: u16,
    pub file_size: u32,
}

impl DirEntry {
    pub fn file(name: [u8; 11], first_cluster: u16, file_size: u32) -> Self {
        Self {
            name,
            attributes: ATTR_ARCHIVE,
            first_cluster,
            file_size,
        }
    }

    pub fn directory(name: [u8; 11], first_cluster: u16) -> Self {
        Self {
            name,
            attributes: ATTR_DIRECTORY,
            first_cluster,
            file_size: 0,
        }
    }

    /// "." entry of a directory whose first cluster is `own_cluster`
    pub fn dot(own_cluster: u16) -> Self {
        Self::directory(*DOT_NAME, own_cluster)
    }

    /// ".." entry; cluster 0 stands for the root directory
    pub fn dotdot(parent_cluster: u16) -> Self {
        Self::directory(*DOTDOT_NAME, parent_cluster)
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw[DIR_NAME..DIR_NAME + 11].copy_from_slice(&self.name);
        raw[DIR_ATTR] = self.attributes;
        LittleEndian::write_u16(&mut raw[DIR_FST_CLUS_LO..DIR_FST_CLUS_LO + 2], self.first_cluster);
        LittleEndian::write_u32(&mut raw[DIR_FILE_SIZE..DIR_FILE_SIZE + 4], self.file_size);
        raw
    }

    /// Overwrite the 32 bytes at `offset` with this entry.
    pub fn write_to(&self, image: &mut ImageBuffer, offset: u64) -> ImageResult<()> {
        image.write_at(offset, &self.to_bytes())
    }
}

/// A slot is reusable if it was never written or was deleted.
pub fn is_free_slot_marker(first_byte: u8) -> bool {
    first_byte == DIR_ENTRY_FREE || first_byte == DIR_ENTRY_DELETED
}
