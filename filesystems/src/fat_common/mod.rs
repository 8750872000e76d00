// Building blocks for FAT16 images: constants, layout, boot sector,
// FAT table, directory records and image addressing

pub mod boot_sector;
pub mod cluster_calc;
pub mod cluster_io;
pub mod constants;
pub mod directory;
pub mod fat_table;

pub use boot_sector::{build_fat16_boot_sector, format_volume_label, FatBootSectorParams};
pub use cluster_calc::{compute_regions, Layout};
pub use cluster_io::{cluster_to_offset, ImageBuffer};
pub use directory::{format_83_name, DirEntry};
pub use fat_table::{is_end_of_chain, ClusterChain, FatTable};
