//! The per-device flash geometry table.
//!
//! A device is identified during handshake by a 16-bit product ID read
//! through `GET_ID`; this module maps that ID to the flash layout and
//! default timing the rest of the session needs.

use std::time::Duration;

/// `flash_begin` is constant across every supported device.
pub const FLASH_BEGIN: u32 = 0x0800_0000;

/// Defaults assumed before the device ID is known.
pub const DEFAULT_FLASH_END: u32 = 0x0800_8000;
pub const DEFAULT_PAGE_SIZE: u32 = 1024;
pub const DEFAULT_PAGES_PER_SECTOR: u32 = 4;
pub const DEFAULT_ERASE_DELAY: Duration = Duration::from_millis(40);
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(80);

/// Flash geometry and timing for one product ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub product_id: u16,
    pub name: &'static str,
    pub flash_begin: u32,
    pub flash_end: u32,
    pub page_size: u32,
    pub pages_per_sector: u32,
}

impl DeviceProfile {
    pub fn flash_size(&self) -> u32 {
        self.flash_end - self.flash_begin
    }
}

const PROFILES: &[DeviceProfile] = &[
    DeviceProfile {
        product_id: 0x0412,
        name: "low-density",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0800_8000,
        page_size: 1024,
        pages_per_sector: 4,
    },
    DeviceProfile {
        product_id: 0x0410,
        name: "medium-density",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0802_0000,
        page_size: 1024,
        pages_per_sector: 4,
    },
    DeviceProfile {
        product_id: 0x0414,
        name: "high-density",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0808_0000,
        page_size: 2048,
        pages_per_sector: 2,
    },
    DeviceProfile {
        product_id: 0x0418,
        name: "connectivity-line",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0804_0000,
        page_size: 2048,
        pages_per_sector: 2,
    },
    DeviceProfile {
        product_id: 0x0420,
        name: "medium-density value line",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0802_0000,
        page_size: 1024,
        pages_per_sector: 4,
    },
    DeviceProfile {
        product_id: 0x0428,
        name: "high-density value line",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0808_0000,
        page_size: 2048,
        pages_per_sector: 2,
    },
    DeviceProfile {
        product_id: 0x0430,
        name: "XL-density",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0810_0000,
        page_size: 2048,
        pages_per_sector: 2,
    },
    DeviceProfile {
        product_id: 0x0416,
        name: "high-density ultra-low-power",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0802_0000,
        page_size: 256,
        pages_per_sector: 16,
    },
    DeviceProfile {
        product_id: 0x0436,
        name: "medium-density ultra-low-power",
        flash_begin: FLASH_BEGIN,
        flash_end: 0x0806_0000,
        page_size: 256,
        pages_per_sector: 16,
    },
];

/// Looks up the flash geometry for a product ID read via `GET_ID`.
pub fn lookup(product_id: u16) -> Option<DeviceProfile> {
    PROFILES.iter().copied().find(|p| p.product_id == product_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_id_resolves() {
        let profile = lookup(0x0414).expect("hi-density profile");
        assert_eq!(profile.flash_end, 0x0808_0000);
        assert_eq!(profile.page_size, 2048);
        assert_eq!(profile.pages_per_sector, 2);
    }

    #[test]
    fn unknown_id_fails() {
        assert!(lookup(0xFFFF).is_none());
    }

    #[test]
    fn flash_begin_is_universal() {
        for profile in PROFILES {
            assert_eq!(profile.flash_begin, FLASH_BEGIN);
        }
    }
}
