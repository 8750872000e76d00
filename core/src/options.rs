use serde::{Deserialize, Serialize};

/// On-disk geometry for one image build.
///
/// `sectors_per_fat` of `None` means "compute the smallest FAT that addresses
/// every data cluster".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_entries: u16,
    pub sectors_per_fat: Option<u16>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_count: 2,
            root_entries: 512,
            sectors_per_fat: None,
        }
    }
}

impl Geometry {
    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }
}

/// How the total image size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Grow with the payload: at least 16 MiB, at most 32 MiB.
    #[default]
    Auto,
    /// Fixed size in MiB.
    Megabytes(u32),
    /// Fixed size in sectors.
    Sectors(u32),
}

/// Identity fields written into the boot sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeOptions {
    pub oem_name: String,
    pub volume_label: Option<String>,
    pub volume_serial: u32,
    pub media_descriptor: u8,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            oem_name: "MATEFAT".to_string(),
            volume_label: None,
            volume_serial: 0x1234_5678,
            media_descriptor: 0xF8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    pub geometry: Geometry,
    pub size: SizePolicy,
    pub volume: VolumeOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_superfloppy_layout() {
        let geometry = Geometry::default();
        assert_eq!(geometry.bytes_per_sector, 512);
        assert_eq!(geometry.sectors_per_cluster, 1);
        assert_eq!(geometry.fat_count, 2);
        assert_eq!(geometry.root_entries, 512);
        assert_eq!(geometry.bytes_per_cluster(), 512);
        assert_eq!(ImageOptions::default().size, SizePolicy::Auto);
        let volume = VolumeOptions::default();
        assert_eq!(volume.oem_name, "MATEFAT");
        assert_eq!(volume.volume_label, None);
        assert_eq!(volume.volume_serial, 0x1234_5678);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let options: ImageOptions =
            serde_json::from_str(r#"{"size": {"megabytes": 20}, "volume": {"volume_label": "boot"}}"#)
                .unwrap();
        assert_eq!(options.size, SizePolicy::Megabytes(20));
        assert_eq!(options.volume.volume_label.as_deref(), Some("boot"));
        assert_eq!(options.volume.volume_serial, 0x1234_5678);
        assert_eq!(options.geometry, Geometry::default());
    }

    #[test]
    fn auto_policy_serializes_as_plain_string() {
        let json = serde_json::to_string(&SizePolicy::Auto).unwrap();
        assert_eq!(json, r#""auto""#);
    }
}
