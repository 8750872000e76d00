// FAT16 on-disk constants

use static_assertions::const_assert_eq;

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_SEC_PER_TRK: usize = 0x18;
pub const BPB_NUM_HEADS: usize = 0x1A;
pub const BPB_HIDD_SEC: usize = 0x1C;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT16 extended BPB (starts at 36)
pub const BS16_DRV_NUM: usize = 0x24;
pub const BS16_RESERVED1: usize = 0x25;
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_ID: usize = 0x27;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

pub const BOOT_SECTOR_SIZE: usize = 512;
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

pub const JUMP_BOOT: [u8; 3] = [0xEB, 0x3C, 0x90];
pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
pub const DRIVE_NUMBER_HARD_DISK: u8 = 0x80;
pub const FS_TYPE_FAT16: &[u8; 8] = b"FAT16   ";
pub const DEFAULT_OEM_NAME: &[u8; 8] = b"MATEFAT ";
pub const DEFAULT_VOLUME_LABEL: &[u8; 11] = b"MATEOS DISK";

// Conventional CHS values for a superfloppy
pub const SECTORS_PER_TRACK: u16 = 63;
pub const NUM_HEADS: u16 = 16;
pub const HIDDEN_SECTORS: u32 = 0;

// FAT entry values
pub const FAT16_RESERVED_ENTRY: u16 = 0xFFFF;
pub const FAT16_EOC: u16 = 0xFFF8; // Anything at or above ends a chain
pub const FAT16_EOC_MARK: u16 = 0xFFFF; // What we write
pub const FAT16_ENTRY_SIZE: usize = 2;
pub const FIRST_DATA_CLUSTER: u16 = 2;

// Cluster count thresholds
pub const FAT16_MIN_CLUSTERS: u32 = 4085;
pub const FAT16_MAX_CLUSTERS: u32 = 65524;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_NAME: usize = 0x00;
pub const DIR_ATTR: usize = 0x0B;
pub const DIR_FST_CLUS_LO: usize = 0x1A;
pub const DIR_FILE_SIZE: usize = 0x1C;
pub const DIR_ENTRY_FREE: u8 = 0x00;
pub const DIR_ENTRY_DELETED: u8 = 0xE5;

pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

pub const DOT_NAME: &[u8; 11] = b".          ";
pub const DOTDOT_NAME: &[u8; 11] = b"..         ";

// Media descriptors
pub const MEDIA_FIXED: u8 = 0xF8;

const_assert_eq!(BS16_FIL_SYS_TYPE + FS_TYPE_FAT16.len(), 0x3E);
const_assert_eq!(BOOT_SIGNATURE_OFFSET + BOOT_SIGNATURE.len(), BOOT_SECTOR_SIZE);
const_assert_eq!(DIR_FILE_SIZE + 4, DIR_ENTRY_SIZE);
