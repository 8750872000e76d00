// FAT16 table over an in-memory image
// Every write fans out to all FAT copies so the mirrors cannot drift apart

use super::cluster_calc::Layout;
use super::cluster_io::ImageBuffer;
use super::constants::*;
use log::trace;
use superfloppy_core::{ImageError, ImageResult};

/// Check if a FAT16 entry value ends a chain
pub fn is_end_of_chain(value: u16) -> bool {
    value >= FAT16_EOC
}

/// Logical FAT: one table, mirrored into `fat_count` copies on disk.
///
/// Clusters are handed out from a cursor that only moves forward, so every
/// chain returned by [`FatTable::allocate`] is contiguous.
#[derive(Debug, Clone)]
pub struct FatTable {
    layout: Layout,
    next_cluster: u32,
}

impl FatTable {
    pub fn new(layout: &Layout) -> Self {
        Self {
            layout: *layout,
            next_cluster: FIRST_DATA_CLUSTER as u32,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Next cluster the allocator will hand out
    pub fn next_cluster(&self) -> u32 {
        self.next_cluster
    }

    pub fn free_clusters(&self) -> u32 {
        (self.layout.max_cluster() + 1).saturating_sub(self.next_cluster)
    }

    fn entry_offset(&self, copy: u8, cluster: u16) -> u64 {
        self.layout.fat_offset(copy) + cluster as u64 * FAT16_ENTRY_SIZE as u64
    }

    /// Write the two reserved entries in every copy:
    /// FAT[0] carries the media descriptor, FAT[1] is all ones.
    pub fn init(&self, image: &mut ImageBuffer, media_descriptor: u8) -> ImageResult<()> {
        let fat0 = 0xFF00 | media_descriptor as u16;
        self.write_entry(image, 0, fat0)?;
        self.write_entry(image, 1, FAT16_RESERVED_ENTRY)
    }

    /// Read an entry from the first copy.
    pub fn read_entry(&self, image: &ImageBuffer, cluster: u16) -> ImageResult<u16> {
        image.read_u16(self.entry_offset(0, cluster))
    }

    /// Write an entry into every copy.
    pub fn write_entry(&self, image: &mut ImageBuffer, cluster: u16, value: u16) -> ImageResult<()> {
        for copy in 0..self.layout.fat_count {
            image.write_u16(self.entry_offset(copy, cluster), value)?;
        }
        Ok(())
    }

    /// Reserve `count` contiguous clusters and chain them together.
    /// Returns the first cluster of the chain.
    pub fn allocate(&mut self, image: &mut ImageBuffer, count: u32) -> ImageResult<u16> {
        if count == 0 {
            return Err(ImageError::InvalidInput("cannot allocate an empty cluster chain".to_string()));
        }
        if count > self.free_clusters() {
            return Err(ImageError::CapacityExceeded(format!(
                "need {} clusters but only {} of {} remain",
                count,
                self.free_clusters(),
                self.layout.cluster_count
            )));
        }

        // max_cluster <= 65525, so these fit in u16
        let first = self.next_cluster as u16;
        let last = (self.next_cluster + count - 1) as u16;
        for cluster in first..last {
            self.write_entry(image, cluster, cluster + 1)?;
        }
        self.write_entry(image, last, FAT16_EOC_MARK)?;
        self.next_cluster += count;

        trace!("Allocated clusters {}..={} ({} clusters)", first, last, count);
        Ok(first)
    }

    /// Point the chain ending at `last_cluster` to `new_cluster`.
    pub fn link(&self, image: &mut ImageBuffer, last_cluster: u16, new_cluster: u16) -> ImageResult<()> {
        let current = self.read_entry(image, last_cluster)?;
        if !is_end_of_chain(current) {
            return Err(ImageError::InvalidInput(format!(
                "cluster {} is not the end of its chain (links to {})",
                last_cluster, current
            )));
        }
        trace!("Linking cluster {} -> {}", last_cluster, new_cluster);
        self.write_entry(image, last_cluster, new_cluster)
    }

    pub fn is_data_cluster(&self, cluster: u16) -> bool {
        cluster >= FIRST_DATA_CLUSTER && (cluster as u32) <= self.layout.max_cluster()
    }

    /// Walk the chain starting at `first`.
    pub fn chain<'a>(&'a self, image: &'a ImageBuffer, first: u16) -> ClusterChain<'a> {
        ClusterChain {
            fat: self,
            image,
            current: Some(first).filter(|&c| self.is_data_cluster(c)),
            remaining: self.layout.cluster_count,
        }
    }

    /// Last cluster of the chain starting at `first`, found by following links.
    pub fn chain_tail(&self, image: &ImageBuffer, first: u16) -> ImageResult<u16> {
        let mut tail = None;
        for cluster in self.chain(image, first) {
            tail = Some(cluster?);
        }
        tail.ok_or_else(|| ImageError::InvalidInput(format!("cluster {} does not start a chain", first)))
    }
}

/// Cursor over the clusters of one chain, in link order.
///
/// Stops after an end-of-chain entry, at a link that does not name a data
/// cluster, or after visiting as many clusters as the volume has.
pub struct ClusterChain<'a> {
    fat: &'a FatTable,
    image: &'a ImageBuffer,
    current: Option<u16>,
    remaining: u32,
}

impl Iterator for ClusterChain<'_> {
    type Item = ImageResult<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.current.take()?;
        if self.remaining == 0 {
            return Some(Err(ImageError::InvalidInput(format!(
                "cluster chain through {} does not terminate",
                cluster
            ))));
        }
        self.remaining -= 1;

        match self.fat.read_entry(self.image, cluster) {
            Ok(next) => {
                if !is_end_of_chain(next) && self.fat.is_data_cluster(next) {
                    self.current = Some(next);
                }
                Some(Ok(cluster))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
