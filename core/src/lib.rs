pub mod error;
pub mod manifest;
pub mod options;
pub mod payload;

pub use error::{ImageError, ImageResult};
pub use manifest::{DirectoryManifest, Manifest};
pub use options::{Geometry, ImageOptions, SizePolicy, VolumeOptions};
pub use payload::{DirectorySpec, FileSpec, ImageRequest};
