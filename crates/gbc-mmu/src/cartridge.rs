//! Cartridge header decoding.
//!
//! Bank-select logic lives with the mapper implementations; this module only
//! understands what the header promises: mapper family, whether external RAM
//! exists, and how large it is.

use crate::banks::CART_RAM_SIZE;

/// Offset of the CGB support flag in the cartridge header.
pub const HEADER_CGB_FLAG: usize = 0x0143;
/// Offset of the cartridge type byte in the cartridge header.
pub const HEADER_CART_TYPE: usize = 0x0147;
/// Offset of the RAM size byte in the cartridge header.
pub const HEADER_RAM_SIZE: usize = 0x0149;
const HEADER_END: usize = 0x0150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mmm01,
    Mbc3,
    Mbc5,
    Mbc6,
    Mbc7,
    PocketCamera,
    Tama5,
    HuC3,
    HuC1,
    Unknown(u8),
}

/// Mapper type code supplied at ROM load time, with the capabilities the code
/// implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperType {
    code: u8,
    mbc: MbcType,
    ram: bool,
    battery: bool,
    rtc: bool,
    rumble: bool,
}

impl MapperType {
    /// Decode a cartridge type byte (header offset 0x0147).
    pub const fn from_code(code: u8) -> Self {
        let (mbc, ram, battery, rtc, rumble) = match code {
            0x00 => (MbcType::NoMbc, false, false, false, false),
            0x01 => (MbcType::Mbc1, false, false, false, false),
            0x02 => (MbcType::Mbc1, true, false, false, false),
            0x03 => (MbcType::Mbc1, true, true, false, false),
            0x05 => (MbcType::Mbc2, true, false, false, false),
            0x06 => (MbcType::Mbc2, true, true, false, false),
            0x08 => (MbcType::NoMbc, true, false, false, false),
            0x09 => (MbcType::NoMbc, true, true, false, false),
            0x0B => (MbcType::Mmm01, false, false, false, false),
            0x0C => (MbcType::Mmm01, true, false, false, false),
            0x0D => (MbcType::Mmm01, true, true, false, false),
            0x0F => (MbcType::Mbc3, false, true, true, false),
            0x10 => (MbcType::Mbc3, true, true, true, false),
            0x11 => (MbcType::Mbc3, false, false, false, false),
            0x12 => (MbcType::Mbc3, true, false, false, false),
            0x13 => (MbcType::Mbc3, true, true, false, false),
            0x19 => (MbcType::Mbc5, false, false, false, false),
            0x1A => (MbcType::Mbc5, true, false, false, false),
            0x1B => (MbcType::Mbc5, true, true, false, false),
            0x1C => (MbcType::Mbc5, false, false, false, true),
            0x1D => (MbcType::Mbc5, true, false, false, true),
            0x1E => (MbcType::Mbc5, true, true, false, true),
            0x20 => (MbcType::Mbc6, true, true, false, false),
            0x22 => (MbcType::Mbc7, true, true, false, true),
            0xFC => (MbcType::PocketCamera, true, true, false, false),
            0xFD => (MbcType::Tama5, true, true, true, false),
            0xFE => (MbcType::HuC3, true, true, true, false),
            0xFF => (MbcType::HuC1, true, true, false, false),
            other => (MbcType::Unknown(other), false, false, false, false),
        };
        Self {
            code,
            mbc,
            ram,
            battery,
            rtc,
            rumble,
        }
    }

    /// Read the cartridge type from a ROM header. Images too short to carry a
    /// header are treated as plain 32 KiB ROMs.
    pub fn from_header(rom: &[u8]) -> Self {
        if rom.len() < HEADER_END {
            return Self::from_code(0x00);
        }
        Self::from_code(rom[HEADER_CART_TYPE])
    }

    pub const fn code(&self) -> u8 {
        self.code
    }

    pub const fn mbc(&self) -> MbcType {
        self.mbc
    }

    pub const fn has_ram(&self) -> bool {
        self.ram
    }

    pub const fn has_battery(&self) -> bool {
        self.battery
    }

    pub const fn has_rtc(&self) -> bool {
        self.rtc
    }

    pub const fn has_rumble(&self) -> bool {
        self.rumble
    }

    /// Bytes of cartridge RAM backing this cartridge, before clamping to the
    /// bank store capacity.
    pub fn ram_size(&self, rom: &[u8]) -> usize {
        if !self.ram {
            return 0;
        }

        // MBC2 has 512x4-bit internal RAM regardless of header RAM size.
        if self.mbc == MbcType::Mbc2 {
            return 0x200;
        }

        if rom.len() < HEADER_END {
            return 0x2000;
        }

        match rom[HEADER_RAM_SIZE] {
            0x00 => 0,
            0x01 => 0x800,   // 2KB
            0x02 => 0x2000,  // 8KB
            0x03 => 0x8000,  // 32KB (4 banks)
            0x04 => 0x20000, // 128KB (16 banks)
            0x05 => 0x10000, // 64KB (8 banks)
            _ => 0x2000,
        }
    }

    /// [`Self::ram_size`] limited to what the bank store can hold. This is what
    /// gets mapped at 0xA000.
    pub fn backed_ram_size(&self, rom: &[u8]) -> usize {
        self.ram_size(rom).min(CART_RAM_SIZE)
    }
}

/// Returns whether the header advertises CGB support (0x80 or 0xC0 at 0x0143).
pub fn cgb_supported(rom: &[u8]) -> bool {
    rom.get(HEADER_CGB_FLAG).copied().unwrap_or(0) & 0x80 != 0
}

/// Title bytes from the header, trimmed at the first NUL.
pub fn title(rom: &[u8]) -> String {
    let end = 0x0143.min(rom.len());
    let mut slice = &rom[0x0134.min(rom.len())..end];
    if let Some(pos) = slice.iter().position(|&b| b == 0) {
        slice = &slice[..pos];
    }
    String::from_utf8_lossy(slice).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cart_type: u8, ram_code: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[HEADER_CART_TYPE] = cart_type;
        rom[HEADER_RAM_SIZE] = ram_code;
        rom
    }

    #[test]
    fn battery_backed_mbc1() {
        let ty = MapperType::from_code(0x03);
        assert_eq!(ty.mbc(), MbcType::Mbc1);
        assert!(ty.has_ram());
        assert!(ty.has_battery());
        assert!(!ty.has_rtc());
    }

    #[test]
    fn ram_size_requires_ram_capability() {
        // Header claims 8KB of RAM but the type code has no RAM.
        let rom = header(0x01, 0x02);
        assert_eq!(MapperType::from_header(&rom).ram_size(&rom), 0);
    }

    #[test]
    fn mbc2_has_fixed_internal_ram() {
        let rom = header(0x06, 0x00);
        assert_eq!(MapperType::from_header(&rom).ram_size(&rom), 0x200);
    }

    #[test]
    fn large_ram_is_clamped_to_backing() {
        let rom = header(0x1B, 0x04);
        let ty = MapperType::from_header(&rom);
        assert_eq!(ty.ram_size(&rom), 0x20000);
        assert_eq!(ty.backed_ram_size(&rom), CART_RAM_SIZE);
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let ty = MapperType::from_code(0x42);
        assert_eq!(ty.mbc(), MbcType::Unknown(0x42));
        assert_eq!(ty.code(), 0x42);
    }

    #[test]
    fn title_stops_at_nul() {
        let mut rom = vec![0u8; 0x150];
        rom[0x134..0x139].copy_from_slice(b"TETRI");
        assert_eq!(title(&rom), "TETRI");
    }
}
