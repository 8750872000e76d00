// FAT16 superfloppy image assembly
// Sizes the image, lays down the boot sector and FATs, then adds entries in caller order

use super::file_ops::StoredFile;
use super::root_directory::RootDirectory;
use super::sizing::resolve_total_sectors;
use super::subdirectory_ops::SubdirectoryOps;
use crate::fat_common::{build_fat16_boot_sector, FatBootSectorParams, FatTable, ImageBuffer, Layout};
use log::debug;
use superfloppy_core::{FileSpec, ImageError, ImageOptions, ImageRequest, ImageResult};

/// Something written into the image, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedEntry {
    /// Parent directory name; `None` for the root
    pub directory: Option<String>,
    pub name: String,
    pub first_cluster: u16,
    pub clusters: u32,
    pub size: u32,
    pub is_directory: bool,
}

impl PlacedEntry {
    pub fn path(&self) -> String {
        match &self.directory {
            Some(dir) => format!("/{}/{}", dir, self.name),
            None => format!("/{}", self.name),
        }
    }
}

/// A finished image and what went into it.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub bytes: Vec<u8>,
    pub layout: Layout,
    pub entries: Vec<PlacedEntry>,
}

impl BuiltImage {
    pub fn total_sectors(&self) -> u32 {
        self.layout.total_sectors
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Incremental FAT16 image builder. Owns the image buffer for the whole build.
pub struct Fat16ImageBuilder {
    image: ImageBuffer,
    fat: FatTable,
    root: RootDirectory,
    directories: Vec<(u16, String)>,
    entries: Vec<PlacedEntry>,
}

impl Fat16ImageBuilder {
    /// Validate geometry, allocate a zeroed image of `total_sectors` and
    /// write the boot sector and reserved FAT entries.
    pub fn new(options: &ImageOptions, total_sectors: u32) -> ImageResult<Self> {
        let layout = Layout::compute(&options.geometry, total_sectors)?;
        let params = FatBootSectorParams::from_volume(&options.volume)?;
        let len = usize::try_from(layout.image_bytes()).map_err(|_| {
            ImageError::InvalidGeometry(format!("image of {} bytes does not fit in memory", layout.image_bytes()))
        })?;

        debug!(
            "FAT16 layout: {} sectors, FAT at {} ({} x {} sectors), root at {}, data at {}, {} clusters",
            layout.total_sectors,
            layout.fat_start,
            layout.fat_count,
            layout.sectors_per_fat,
            layout.root_start,
            layout.data_start,
            layout.cluster_count
        );

        let mut image = ImageBuffer::zeroed(len);
        image.write_at(0, &build_fat16_boot_sector(&params, &layout))?;

        let fat = FatTable::new(&layout);
        fat.init(&mut image, params.media_descriptor)?;

        Ok(Self {
            image,
            root: RootDirectory::new(&layout),
            fat,
            directories: Vec::new(),
            entries: Vec::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        self.fat.layout()
    }

    fn record(&mut self, directory: Option<String>, name: &str, stored: StoredFile) {
        self.entries.push(PlacedEntry {
            directory,
            name: name.to_string(),
            first_cluster: stored.first_cluster,
            clusters: stored.clusters,
            size: stored.size,
            is_directory: false,
        });
    }

    /// Add a file to the root directory. Returns its first cluster.
    pub fn add_root_file(&mut self, file: &FileSpec) -> ImageResult<u16> {
        let stored = self.root.add_file(&mut self.image, &mut self.fat, file)?;
        self.record(None, &file.name, stored);
        Ok(stored.first_cluster)
    }

    /// Create a root-level subdirectory. Returns its first cluster.
    pub fn create_subdir(&mut self, name: &str) -> ImageResult<u16> {
        let cluster = SubdirectoryOps::create(&mut self.image, &mut self.fat, &mut self.root, name)?;
        self.directories.push((cluster, name.to_string()));
        self.entries.push(PlacedEntry {
            directory: None,
            name: name.to_string(),
            first_cluster: cluster,
            clusters: 1,
            size: 0,
            is_directory: true,
        });
        Ok(cluster)
    }

    /// Add a file to a subdirectory made by [`Self::create_subdir`].
    pub fn add_file_to_dir(&mut self, dir_cluster: u16, file: &FileSpec) -> ImageResult<u16> {
        let dir_name = self
            .directories
            .iter()
            .find(|(cluster, _)| *cluster == dir_cluster)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| {
                ImageError::InvalidInput(format!("cluster {} is not a directory of this image", dir_cluster))
            })?;

        let clusters_before = self.fat.next_cluster();
        let stored = SubdirectoryOps::add_file(&mut self.image, &mut self.fat, dir_cluster, file)?;
        if self.fat.next_cluster() - clusters_before > stored.clusters {
            if let Some(dir) = self
                .entries
                .iter_mut()
                .find(|e| e.is_directory && e.first_cluster == dir_cluster)
            {
                dir.clusters += 1;
            }
        }

        debug!("Added /{}/{} ({} bytes) at cluster {}", dir_name, file.name, stored.size, stored.first_cluster);
        self.record(Some(dir_name), &file.name, stored);
        Ok(stored.first_cluster)
    }

    /// Hand back the finished image.
    pub fn finish(self) -> BuiltImage {
        let layout = *self.fat.layout();
        BuiltImage {
            bytes: self.image.into_bytes(),
            layout,
            entries: self.entries,
        }
    }
}

/// Build a complete image from `request`: root files first, then each
/// directory followed by its files, all in the order given.
pub fn build_image(request: &ImageRequest, options: &ImageOptions) -> ImageResult<BuiltImage> {
    let total_sectors = resolve_total_sectors(
        options.size,
        request.payload_bytes(),
        options.geometry.bytes_per_sector,
    )?;
    let mut builder = Fat16ImageBuilder::new(options, total_sectors)?;

    for file in &request.root_files {
        builder.add_root_file(file)?;
    }

    for dir in &request.directories {
        let cluster = builder.create_subdir(&dir.name)?;
        for file in &dir.files {
            builder.add_file_to_dir(cluster, file)?;
        }
    }

    let built = builder.finish();
    debug!(
        "Built FAT16 image: {} bytes, {} entries",
        built.size_bytes(),
        built.entries.len()
    );
    Ok(built)
}
