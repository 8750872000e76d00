// FAT16 image construction
pub mod fat16;
pub mod fat_common;

pub use fat16::{build_image, BuiltImage, Fat16ImageBuilder, PlacedEntry};
pub use fat_common::{format_83_name, Layout};
