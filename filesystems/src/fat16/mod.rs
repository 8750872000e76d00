// FAT16 superfloppy image builder

pub mod builder;
pub mod file_ops;
pub mod root_directory;
pub mod sizing;
pub mod subdirectory_ops;

pub use builder::{build_image, BuiltImage, Fat16ImageBuilder, PlacedEntry};
pub use root_directory::RootDirectory;
pub use sizing::{auto_size_mb, resolve_total_sectors};
pub use subdirectory_ops::SubdirectoryOps;
