// Boot sector builder for FAT16 superfloppy images

use super::cluster_calc::Layout;
use super::constants::*;
use superfloppy_core::{ImageError, ImageResult, VolumeOptions};

/// Boot sector fields that are not derived from the layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatBootSectorParams {
    pub oem_name: [u8; 8],
    pub media_descriptor: u8,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
}

impl Default for FatBootSectorParams {
    fn default() -> Self {
        Self {
            oem_name: *DEFAULT_OEM_NAME,
            media_descriptor: MEDIA_FIXED,
            sectors_per_track: SECTORS_PER_TRACK,
            num_heads: NUM_HEADS,
            hidden_sectors: HIDDEN_SECTORS,
            volume_serial: 0x1234_5678,
            volume_label: *DEFAULT_VOLUME_LABEL,
        }
    }
}

impl FatBootSectorParams {
    pub fn from_volume(volume: &VolumeOptions) -> ImageResult<Self> {
        Ok(Self {
            oem_name: format_padded_ascii::<8>("OEM name", &volume.oem_name)?,
            media_descriptor: volume.media_descriptor,
            volume_serial: volume.volume_serial,
            volume_label: format_volume_label(volume.volume_label.as_deref())?,
            ..Self::default()
        })
    }
}

fn format_padded_ascii<const N: usize>(what: &str, text: &str) -> ImageResult<[u8; N]> {
    if !text.is_ascii() {
        return Err(ImageError::InvalidInput(format!("{} must be ASCII: {:?}", what, text)));
    }
    let mut result = [0x20u8; N];
    let bytes = text.as_bytes();
    let len = bytes.len().min(N);
    result[..len].copy_from_slice(&bytes[..len]);
    Ok(result)
}

/// Convert a label to FAT volume label format (11 bytes, upper-case, space-padded).
/// No label, or a blank one, gives the default "MATEOS DISK".
pub fn format_volume_label(label: Option<&str>) -> ImageResult<[u8; 11]> {
    match label {
        Some(label) if !label.trim().is_empty() => {
            format_padded_ascii::<11>("Volume label", &label.to_ascii_uppercase())
        }
        _ => Ok(*DEFAULT_VOLUME_LABEL),
    }
}

/// Build the 512-byte FAT16 boot sector for `layout`.
pub fn build_fat16_boot_sector(params: &FatBootSectorParams, layout: &Layout) -> [u8; BOOT_SECTOR_SIZE] {
    let mut boot_sector = [0u8; BOOT_SECTOR_SIZE];

    boot_sector[BS_JMP_BOOT..BS_JMP_BOOT + 3].copy_from_slice(&JUMP_BOOT);
    boot_sector[BS_OEM_NAME..BS_OEM_NAME + 8].copy_from_slice(&params.oem_name);

    // BPB
    boot_sector[BPB_BYTES_PER_SEC..BPB_BYTES_PER_SEC + 2]
        .copy_from_slice(&layout.bytes_per_sector.to_le_bytes());
    boot_sector[BPB_SEC_PER_CLUS] = layout.sectors_per_cluster;
    boot_sector[BPB_RSVD_SEC_CNT..BPB_RSVD_SEC_CNT + 2]
        .copy_from_slice(&layout.reserved_sectors.to_le_bytes());
    boot_sector[BPB_NUM_FATS] = layout.fat_count;
    boot_sector[BPB_ROOT_ENT_CNT..BPB_ROOT_ENT_CNT + 2]
        .copy_from_slice(&layout.root_entries.to_le_bytes());

    // Total sectors: the 16-bit field is zero when the count needs 32 bits
    match u16::try_from(layout.total_sectors) {
        Ok(small) => {
            boot_sector[BPB_TOT_SEC16..BPB_TOT_SEC16 + 2].copy_from_slice(&small.to_le_bytes());
        }
        Err(_) => {
            boot_sector[BPB_TOT_SEC32..BPB_TOT_SEC32 + 4]
                .copy_from_slice(&layout.total_sectors.to_le_bytes());
        }
    }

    boot_sector[BPB_MEDIA] = params.media_descriptor;
    boot_sector[BPB_FAT_SZ16..BPB_FAT_SZ16 + 2].copy_from_slice(&layout.sectors_per_fat.to_le_bytes());
    boot_sector[BPB_SEC_PER_TRK..BPB_SEC_PER_TRK + 2]
        .copy_from_slice(&params.sectors_per_track.to_le_bytes());
    boot_sector[BPB_NUM_HEADS..BPB_NUM_HEADS + 2].copy_from_slice(&params.num_heads.to_le_bytes());
    boot_sector[BPB_HIDD_SEC..BPB_HIDD_SEC + 4].copy_from_slice(&params.hidden_sectors.to_le_bytes());

    // Extended BPB
    boot_sector[BS16_DRV_NUM] = DRIVE_NUMBER_HARD_DISK;
    boot_sector[BS16_RESERVED1] = 0;
    boot_sector[BS16_BOOT_SIG] = EXTENDED_BOOT_SIGNATURE;
    boot_sector[BS16_VOL_ID..BS16_VOL_ID + 4].copy_from_slice(&params.volume_serial.to_le_bytes());
    boot_sector[BS16_VOL_LAB..BS16_VOL_LAB + 11].copy_from_slice(&params.volume_label);
    boot_sector[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8].copy_from_slice(FS_TYPE_FAT16);

    boot_sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2].copy_from_slice(&BOOT_SIGNATURE);

    boot_sector
}

#[cfg(test)]
mod tests {
    use super::*;
    use superfloppy_core::Geometry;

    fn le16(bs: &[u8], off: usize) -> u16 {
        u16::from_le_bytes([bs[off], bs[off + 1]])
    }

    fn le32(bs: &[u8], off: usize) -> u32 {
        u32::from_le_bytes([bs[off], bs[off + 1], bs[off + 2], bs[off + 3]])
    }

    #[test]
    fn bpb_fields_land_at_standard_offsets() {
        let layout = Layout::compute(&Geometry::default(), 16 * 2048).unwrap();
        let bs = build_fat16_boot_sector(&FatBootSectorParams::default(), &layout);

        assert_eq!(&bs[0..3], &[0xEB, 0x3C, 0x90]);
        assert_eq!(&bs[3..11], b"MATEFAT ");
        assert_eq!(le16(&bs, 11), 512);
        assert_eq!(bs[13], 1);
        assert_eq!(le16(&bs, 14), 1);
        assert_eq!(bs[16], 2);
        assert_eq!(le16(&bs, 17), 512);
        assert_eq!(le16(&bs, 19), 32768);
        assert_eq!(le32(&bs, 32), 0);
        assert_eq!(bs[21], 0xF8);
        assert_eq!(le16(&bs, 22), layout.sectors_per_fat);
        assert_eq!(le16(&bs, 24), 63);
        assert_eq!(le16(&bs, 26), 16);
        assert_eq!(le32(&bs, 28), 0);
        assert_eq!(bs[36], 0x80);
        assert_eq!(bs[38], 0x29);
        assert_eq!(le32(&bs, 39), 0x1234_5678);
        assert_eq!(&bs[43..54], b"MATEOS DISK");
        assert_eq!(&bs[54..62], b"FAT16   ");
        assert_eq!(&bs[510..512], &[0x55, 0xAA]);
    }

    #[test]
    fn large_volumes_use_32_bit_sector_count() {
        let layout = Layout::compute(&Geometry::default(), 32 * 2048).unwrap();
        let bs = build_fat16_boot_sector(&FatBootSectorParams::default(), &layout);
        assert_eq!(le16(&bs, 19), 0);
        assert_eq!(le32(&bs, 32), 65536);
    }

    #[test]
    fn largest_16_bit_count_stays_in_small_field() {
        let layout = Layout::compute(&Geometry::default(), 0xFFFF).unwrap();
        let bs = build_fat16_boot_sector(&FatBootSectorParams::default(), &layout);
        assert_eq!(le16(&bs, 19), 0xFFFF);
        assert_eq!(le32(&bs, 32), 0);
    }

    #[test]
    fn volume_options_are_encoded() {
        let volume = VolumeOptions {
            oem_name: "TESTOEM".to_string(),
            volume_label: Some("boot disk".to_string()),
            volume_serial: 0xDEAD_BEEF,
            media_descriptor: 0xF8,
        };
        let params = FatBootSectorParams::from_volume(&volume).unwrap();
        assert_eq!(&params.oem_name, b"TESTOEM ");
        assert_eq!(&params.volume_label, b"BOOT DISK  ");
        assert_eq!(params.volume_serial, 0xDEAD_BEEF);
    }

    #[test]
    fn long_labels_are_truncated_and_blank_labels_default() {
        assert_eq!(&format_volume_label(Some("abcdefghijklmnop")).unwrap(), b"ABCDEFGHIJK");
        assert_eq!(&format_volume_label(Some("   ")).unwrap(), b"MATEOS DISK");
        assert_eq!(&format_volume_label(None).unwrap(), b"MATEOS DISK");
    }

    #[test]
    fn default_volume_options_give_default_identity() {
        let params = FatBootSectorParams::from_volume(&VolumeOptions::default()).unwrap();
        assert_eq!(params, FatBootSectorParams::default());
        assert_eq!(&params.oem_name, b"MATEFAT ");
        assert_eq!(&params.volume_label, b"MATEOS DISK");
    }

    #[test]
    fn non_ascii_labels_are_rejected() {
        let err = format_volume_label(Some("d\u{ed}sco")).unwrap_err();
        assert!(matches!(err, ImageError::InvalidInput(_)));
    }
}
