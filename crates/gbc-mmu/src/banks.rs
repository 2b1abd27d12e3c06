use crate::{cartridge::MapperType, hardware::ConsoleMode};

pub const ZP_RAM_SIZE: usize = 0x80;
pub const WRAM_SIZE: usize = 0x8000;
pub const WRAM_BANK_SIZE: usize = 0x1000;
pub const VRAM_SIZE: usize = 0x10000;
pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0x10000;
pub const CART_RAM_SIZE: usize = 0x8000;
pub const CART_RAM_BANK_SIZE: usize = 0x2000;
pub const ROM_BANK_SIZE: usize = 0x4000;
pub const UNMAPPED_SIZE: usize = 0x400;

/// Value returned for addresses with no hardware behind them.
pub const UNMAPPED_FILL: u8 = 0xFF;

/// Cartridge image as handed over at load time.
#[derive(Debug)]
pub struct RomImage {
    data: Box<[u8]>,
    mapper: MapperType,
}

impl RomImage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mapper(&self) -> MapperType {
        self.mapper
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bank_count(&self) -> usize {
        self.data.len().div_ceil(ROM_BANK_SIZE).max(1)
    }
}

#[derive(Debug)]
pub struct BiosImage {
    data: Box<[u8]>,
    mode: ConsoleMode,
}

impl BiosImage {
    pub fn mode(&self) -> ConsoleMode {
        self.mode
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Raw backing storage for every memory region on the bus.
///
/// The store only knows sizes and bank arithmetic. Which bank is visible, and
/// whether an access is allowed at all, is decided by the router.
pub struct BankStore {
    pub zp_ram: [u8; ZP_RAM_SIZE],
    pub wram: Box<[u8]>,
    pub vram: Box<[u8]>,
    pub oam: Box<[u8]>,
    pub cart_ram: Box<[u8]>,
    cart_ram_len: usize,
    rom: Option<RomImage>,
    bios: Option<BiosImage>,
    unmapped: [u8; UNMAPPED_SIZE],
}

impl BankStore {
    pub fn new() -> Self {
        Self {
            zp_ram: [0; ZP_RAM_SIZE],
            wram: vec![0; WRAM_SIZE].into_boxed_slice(),
            vram: vec![0; VRAM_SIZE].into_boxed_slice(),
            oam: vec![0; OAM_SIZE].into_boxed_slice(),
            cart_ram: vec![0; CART_RAM_SIZE].into_boxed_slice(),
            cart_ram_len: 0,
            rom: None,
            bios: None,
            unmapped: [UNMAPPED_FILL; UNMAPPED_SIZE],
        }
    }

    pub fn rom(&self) -> Option<&RomImage> {
        self.rom.as_ref()
    }

    pub fn bios(&self) -> Option<&BiosImage> {
        self.bios.as_ref()
    }

    /// Number of cartridge RAM bytes the loaded cartridge actually has.
    pub fn cart_ram_len(&self) -> usize {
        self.cart_ram_len
    }

    pub(crate) fn install_rom(&mut self, data: &[u8], mapper: MapperType, ram_len: usize) {
        self.rom = Some(RomImage {
            data: data.into(),
            mapper,
        });
        self.cart_ram_len = ram_len.min(CART_RAM_SIZE);
        self.cart_ram.fill(0);
    }

    pub(crate) fn install_bios(&mut self, data: &[u8], mode: ConsoleMode) {
        self.bios = Some(BiosImage {
            data: data.into(),
            mode,
        });
    }

    /// Byte of the boot ROM image, if one is loaded and covers `addr`.
    pub fn bios_byte(&self, addr: u16) -> Option<u8> {
        self.bios
            .as_ref()
            .and_then(|b| b.data.get(addr as usize).copied())
    }

    /// Byte at `offset` inside ROM bank `bank`. Banks past the end of the
    /// image mirror the way a mapper with truncated address lines does.
    pub fn rom_byte(&self, bank: usize, offset: usize) -> Option<u8> {
        let rom = self.rom.as_ref()?;
        let bank = bank % rom.bank_count();
        rom.data
            .get(bank * ROM_BANK_SIZE + (offset & (ROM_BANK_SIZE - 1)))
            .copied()
    }

    /// Index into `cart_ram` for `offset` inside RAM bank `bank`, or `None`
    /// when the cartridge has no RAM.
    pub fn cart_ram_index(&self, bank: usize, offset: usize) -> Option<usize> {
        if self.cart_ram_len == 0 {
            return None;
        }
        let banks = self.cart_ram_len.div_ceil(CART_RAM_BANK_SIZE);
        let raw = (bank % banks) * CART_RAM_BANK_SIZE + (offset & (CART_RAM_BANK_SIZE - 1));
        Some(raw % self.cart_ram_len)
    }

    #[inline]
    pub fn wram_index(bank: usize, offset: usize) -> usize {
        (bank & 0x07) * WRAM_BANK_SIZE + (offset & (WRAM_BANK_SIZE - 1))
    }

    #[inline]
    pub fn vram_index(bank: usize, offset: usize) -> usize {
        ((bank * VRAM_BANK_SIZE) + (offset & (VRAM_BANK_SIZE - 1))) & (VRAM_SIZE - 1)
    }

    #[inline]
    pub fn oam_index(offset: usize) -> usize {
        offset & (OAM_SIZE - 1)
    }

    #[inline]
    pub fn unmapped(&self, addr: u16) -> u8 {
        self.unmapped[addr as usize & (UNMAPPED_SIZE - 1)]
    }
}

impl Default for BankStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_store_has_no_rom_or_cart_ram() {
        let store = BankStore::new();
        assert_eq!(store.rom_byte(0, 0), None);
        assert_eq!(store.cart_ram_index(0, 0), None);
        assert_eq!(store.bios_byte(0), None);
        assert_eq!(store.unmapped(0xFEA0), UNMAPPED_FILL);
    }

    #[test]
    fn rom_banks_mirror_past_image_end() {
        let mut store = BankStore::new();
        let mut rom = vec![0u8; 4 * ROM_BANK_SIZE];
        for bank in 0..4 {
            rom[bank * ROM_BANK_SIZE] = bank as u8;
        }
        store.install_rom(&rom, MapperType::from_code(0x01), 0);
        assert_eq!(store.rom_byte(2, 0), Some(2));
        assert_eq!(store.rom_byte(6, 0), Some(2));
    }

    #[test]
    fn small_cart_ram_wraps() {
        let mut store = BankStore::new();
        store.install_rom(&[0u8; 0x8000], MapperType::from_code(0x08), 0x800);
        assert_eq!(store.cart_ram_index(0, 0x800), Some(0));
        assert_eq!(store.cart_ram_index(0, 0x7FF), Some(0x7FF));
    }

    #[test]
    fn out_of_range_ram_bank_wraps_without_overflow() {
        let mut store = BankStore::new();
        store.install_rom(&[0u8; 0x8000], MapperType::from_code(0x1B), 0x8000);
        assert_eq!(store.cart_ram_index(5, 0x10), Some(0x2010));
        assert_eq!(store.cart_ram_index(usize::MAX, 0), Some(0x6000));
    }
}
