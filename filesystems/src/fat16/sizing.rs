// Image size selection

use superfloppy_core::{ImageError, ImageResult, SizePolicy};

const MIB: u64 = 1024 * 1024;

/// Smallest image the automatic policy produces, in MiB
pub const AUTO_MIN_MB: u64 = 16;
/// Largest image the automatic policy produces, in MiB
pub const AUTO_MAX_MB: u64 = 32;

/// Automatic size: payload plus 25% headroom and 1 MiB of overhead,
/// clamped to 16..=32 MiB.
pub fn auto_size_mb(payload_bytes: u64) -> u64 {
    let wanted = (payload_bytes.saturating_mul(5) / 4).saturating_add(MIB) / MIB + 1;
    wanted.clamp(AUTO_MIN_MB, AUTO_MAX_MB)
}

/// Resolve a size policy to a sector count.
pub fn resolve_total_sectors(policy: SizePolicy, payload_bytes: u64, bytes_per_sector: u16) -> ImageResult<u32> {
    if bytes_per_sector == 0 {
        return Err(ImageError::InvalidGeometry("bytes per sector cannot be 0".to_string()));
    }
    let bytes_per_sector = bytes_per_sector as u64;

    let sectors = match policy {
        SizePolicy::Auto => auto_size_mb(payload_bytes) * MIB / bytes_per_sector,
        SizePolicy::Megabytes(0) | SizePolicy::Sectors(0) => {
            return Err(ImageError::InvalidInput("image size cannot be 0".to_string()))
        }
        SizePolicy::Megabytes(mb) => mb as u64 * MIB / bytes_per_sector,
        SizePolicy::Sectors(sectors) => sectors as u64,
    };

    u32::try_from(sectors)
        .map_err(|_| ImageError::InvalidGeometry(format!("{} sectors does not fit a 32-bit sector count", sectors)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_size_has_a_floor() {
        assert_eq!(auto_size_mb(0), 16);
        assert_eq!(auto_size_mb(10 * MIB), 16);
    }

    #[test]
    fn auto_size_grows_with_payload() {
        // 16 MiB * 1.25 + 1 MiB = 21 MiB, plus one
        assert_eq!(auto_size_mb(16 * MIB), 22);
    }

    #[test]
    fn auto_size_is_capped() {
        assert_eq!(auto_size_mb(100 * MIB), 32);
        assert_eq!(auto_size_mb(u64::MAX), 32);
    }

    #[test]
    fn policies_resolve_to_sectors() {
        assert_eq!(resolve_total_sectors(SizePolicy::Auto, 0, 512).unwrap(), 32768);
        assert_eq!(resolve_total_sectors(SizePolicy::Megabytes(20), 0, 512).unwrap(), 40960);
        assert_eq!(resolve_total_sectors(SizePolicy::Megabytes(16), 0, 4096).unwrap(), 4096);
        assert_eq!(resolve_total_sectors(SizePolicy::Sectors(12345), 1 << 30, 512).unwrap(), 12345);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(resolve_total_sectors(SizePolicy::Megabytes(0), 0, 512).is_err());
        assert!(resolve_total_sectors(SizePolicy::Sectors(0), 0, 512).is_err());
    }

    #[test]
    fn huge_sizes_overflow_the_sector_count() {
        let err = resolve_total_sectors(SizePolicy::Megabytes(u32::MAX), 0, 512).unwrap_err();
        assert!(matches!(err, ImageError::InvalidGeometry(_)));
    }
}
