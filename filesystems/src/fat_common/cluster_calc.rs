// Region layout and FAT sizing for FAT16 images
// Checks that the geometry describes a real FAT16 volume before anything is written

use super::cluster_io::cluster_to_offset;
use super::constants::*;
use superfloppy_core::{Geometry, ImageError, ImageResult};

/// Sector offsets of each on-disk region, derived once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_entries: u16,
    pub sectors_per_fat: u16,
    pub total_sectors: u32,

    pub root_dir_sectors: u32,
    pub fat_start: u32,
    pub root_start: u32,
    pub data_start: u32,
    pub cluster_count: u32,
}

/// Region start sectors as a pure function of geometry and FAT size.
/// Returns `(root_dir_sectors, fat_start, root_start, data_start)`.
pub fn compute_regions(
    bytes_per_sector: u32,
    reserved_sectors: u32,
    fat_count: u32,
    root_entries: u32,
    sectors_per_fat: u32,
) -> (u32, u32, u32, u32) {
    let root_dir_sectors = (root_entries * DIR_ENTRY_SIZE as u32).div_ceil(bytes_per_sector);
    let fat_start = reserved_sectors;
    let root_start = fat_start + fat_count * sectors_per_fat;
    let data_start = root_start + root_dir_sectors;
    (root_dir_sectors, fat_start, root_start, data_start)
}

/// Sectors one FAT copy needs to hold an entry for every cluster plus the two
/// reserved entries.
pub fn fat16_sectors_needed(cluster_count: u32, bytes_per_sector: u32) -> u32 {
    let fat_bytes = (cluster_count as u64 + 2) * FAT16_ENTRY_SIZE as u64;
    fat_bytes.div_ceil(bytes_per_sector as u64) as u32
}

/// Smallest stable FAT size for the volume.
///
/// Growing the FAT shrinks the data region, so iterate until the FAT
/// addresses every cluster that is left.
pub fn calculate_fat16_sectors_per_fat(geometry: &Geometry, total_sectors: u32) -> ImageResult<u32> {
    let bps = geometry.bytes_per_sector as u32;
    let spc = geometry.sectors_per_cluster as u32;
    let mut sectors_per_fat = 1u32;

    loop {
        let (_, _, _, data_start) = compute_regions(
            bps,
            geometry.reserved_sectors as u32,
            geometry.fat_count as u32,
            geometry.root_entries as u32,
            sectors_per_fat,
        );
        if data_start >= total_sectors {
            return Err(ImageError::InvalidGeometry(format!(
                "{} sectors leave no room for a data region (metadata ends at sector {})",
                total_sectors, data_start
            )));
        }
        let clusters = (total_sectors - data_start) / spc;
        let needed = fat16_sectors_needed(clusters, bps);
        if needed <= sectors_per_fat {
            return Ok(sectors_per_fat);
        }
        sectors_per_fat = needed;
    }
}

fn check_geometry(geometry: &Geometry) -> ImageResult<()> {
    let bps = geometry.bytes_per_sector;
    if !bps.is_power_of_two() || !(512..=4096).contains(&bps) {
        return Err(ImageError::InvalidGeometry(format!("Invalid bytes per sector: {}", bps)));
    }

    let spc = geometry.sectors_per_cluster;
    if !spc.is_power_of_two() {
        return Err(ImageError::InvalidGeometry(format!(
            "Sectors per cluster not a power of 2: {}",
            spc
        )));
    }

    if geometry.reserved_sectors == 0 {
        return Err(ImageError::InvalidGeometry("Reserved sector count cannot be 0".to_string()));
    }

    if geometry.fat_count == 0 {
        return Err(ImageError::InvalidGeometry("Number of FATs cannot be 0".to_string()));
    }

    let root_bytes = geometry.root_entries as u32 * DIR_ENTRY_SIZE as u32;
    if root_bytes == 0 {
        return Err(ImageError::InvalidGeometry(
            "Root directory must hold at least one sector of entries".to_string(),
        ));
    }
    if root_bytes % bps as u32 != 0 {
        return Err(ImageError::InvalidGeometry(format!(
            "{} root entries do not fill a whole number of {}-byte sectors",
            geometry.root_entries, bps
        )));
    }

    Ok(())
}

impl Layout {
    /// Validate `geometry` against `total_sectors` and derive every region.
    pub fn compute(geometry: &Geometry, total_sectors: u32) -> ImageResult<Self> {
        check_geometry(geometry)?;

        let bps = geometry.bytes_per_sector as u32;
        let sectors_per_fat = match geometry.sectors_per_fat {
            Some(0) => {
                return Err(ImageError::InvalidGeometry("Sectors per FAT cannot be 0".to_string()))
            }
            Some(fixed) => fixed as u32,
            None => calculate_fat16_sectors_per_fat(geometry, total_sectors)?,
        };
        let sectors_per_fat = u16::try_from(sectors_per_fat).map_err(|_| {
            ImageError::InvalidGeometry(format!("FAT of {} sectors exceeds the 16-bit BPB field", sectors_per_fat))
        })?;

        let (root_dir_sectors, fat_start, root_start, data_start) = compute_regions(
            bps,
            geometry.reserved_sectors as u32,
            geometry.fat_count as u32,
            geometry.root_entries as u32,
            sectors_per_fat as u32,
        );

        if data_start >= total_sectors {
            return Err(ImageError::InvalidGeometry(format!(
                "{} sectors leave no room for a data region (metadata ends at sector {})",
                total_sectors, data_start
            )));
        }

        let cluster_count = (total_sectors - data_start) / geometry.sectors_per_cluster as u32;
        if !(FAT16_MIN_CLUSTERS..=FAT16_MAX_CLUSTERS).contains(&cluster_count) {
            return Err(ImageError::InvalidGeometry(format!(
                "{} data clusters is outside the FAT16 range {}..={}",
                cluster_count, FAT16_MIN_CLUSTERS, FAT16_MAX_CLUSTERS
            )));
        }

        let needed = fat16_sectors_needed(cluster_count, bps);
        if (sectors_per_fat as u32) < needed {
            return Err(ImageError::InvalidGeometry(format!(
                "FAT of {} sectors cannot address {} clusters (needs {})",
                sectors_per_fat, cluster_count, needed
            )));
        }

        Ok(Self {
            bytes_per_sector: geometry.bytes_per_sector,
            sectors_per_cluster: geometry.sectors_per_cluster,
            reserved_sectors: geometry.reserved_sectors,
            fat_count: geometry.fat_count,
            root_entries: geometry.root_entries,
            sectors_per_fat,
            total_sectors,
            root_dir_sectors,
            fat_start,
            root_start,
            data_start,
            cluster_count,
        })
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    pub fn entries_per_cluster(&self) -> u32 {
        self.bytes_per_cluster() / DIR_ENTRY_SIZE as u32
    }

    pub fn image_bytes(&self) -> u64 {
        self.total_sectors as u64 * self.bytes_per_sector as u64
    }

    /// Highest cluster number backed by the data region.
    pub fn max_cluster(&self) -> u32 {
        self.cluster_count + 1
    }

    fn sector_offset(&self, sector: u32) -> u64 {
        sector as u64 * self.bytes_per_sector as u64
    }

    /// Byte offset of FAT copy `copy` (0-based).
    pub fn fat_offset(&self, copy: u8) -> u64 {
        self.sector_offset(self.fat_start + copy as u32 * self.sectors_per_fat as u32)
    }

    pub fn root_offset(&self) -> u64 {
        self.sector_offset(self.root_start)
    }

    pub fn data_offset(&self) -> u64 {
        self.sector_offset(self.data_start)
    }

    pub fn cluster_offset(&self, cluster: u16) -> u64 {
        cluster_to_offset(
            cluster,
            self.sectors_per_cluster as u32,
            self.bytes_per_sector as u32,
            self.data_offset(),
        )
    }
}
