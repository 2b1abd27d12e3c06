//! Interfaces to the subsystems that share the bus with the memory core.
//!
//! The router owns one boxed implementation of each trait. Subsystems that
//! live outside this crate (CPU, PPU, APU, timer, serial, cartridge mappers)
//! implement these and are handed to [`crate::mmu::Mmu::new`] by whatever
//! drives the console.

use crate::interrupts::InterruptFlag;

/// Cartridge bank controller.
pub trait Mapper: Send {
    /// Physical 16 KiB ROM bank visible at `addr` (0x0000-0x7FFF).
    fn selected_rom_bank(&self, addr: u16) -> usize;

    /// Physical 8 KiB RAM bank visible at `addr` (0xA000-0xBFFF), or `None`
    /// while external RAM is disabled.
    fn selected_ram_bank(&self, addr: u16) -> Option<usize>;

    /// Write decoded by the mapper itself: 0x0000-0x7FFF always, and
    /// 0xA000-0xBFFF while external RAM is disabled or absent.
    fn write_register(&mut self, addr: u16, value: u8);
}

/// Register window of a subsystem (timer, APU, serial).
pub trait RegisterPort: Send {
    /// CPU read. May have side effects.
    fn read_reg(&mut self, addr: u16) -> u8;

    /// Debugger read. Must not change any state.
    fn peek_reg(&self, addr: u16) -> u8;

    /// CPU write. `if_reg` lets the subsystem raise interrupts synchronously.
    fn write_reg(&mut self, addr: u16, value: u8, if_reg: &mut InterruptFlag);
}

/// Pixel processor as seen from the bus.
pub trait PixelProcessor: RegisterPort {
    /// VRAM is owned by the PPU (mode 3).
    fn is_vram_blocked(&self) -> bool;

    /// OAM is owned by the PPU (modes 2 and 3) or by OAM DMA.
    fn is_oam_blocked(&self) -> bool;

    /// LCDC bit 7.
    fn lcd_enabled(&self) -> bool {
        true
    }

    /// Currently in mode 0.
    fn in_hblank(&self) -> bool {
        false
    }
}

/// Stand-in for a subsystem that is not attached.
///
/// Registers read as 0xFF, writes are dropped and nothing is ever blocked.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBus;

impl RegisterPort for OpenBus {
    fn read_reg(&mut self, _addr: u16) -> u8 {
        0xFF
    }

    fn peek_reg(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write_reg(&mut self, _addr: u16, _value: u8, _if_reg: &mut InterruptFlag) {}
}

impl PixelProcessor for OpenBus {
    fn is_vram_blocked(&self) -> bool {
        false
    }

    fn is_oam_blocked(&self) -> bool {
        false
    }
}

/// Cartridge without a bank controller: bank 0 at 0x0000, bank 1 at 0x4000
/// and, if present, a single always-enabled RAM bank.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMbc;

impl Mapper for NoMbc {
    fn selected_rom_bank(&self, addr: u16) -> usize {
        if addr < 0x4000 { 0 } else { 1 }
    }

    fn selected_ram_bank(&self, _addr: u16) -> Option<usize> {
        Some(0)
    }

    fn write_register(&mut self, _addr: u16, _value: u8) {}
}

/// Everything the router talks to besides its own storage.
pub struct Peripherals {
    pub mapper: Box<dyn Mapper>,
    pub ppu: Box<dyn PixelProcessor>,
    pub timer: Box<dyn RegisterPort>,
    pub apu: Box<dyn RegisterPort>,
    pub serial: Box<dyn RegisterPort>,
}

impl Peripherals {
    /// No collaborators attached: [`NoMbc`] and [`OpenBus`] everywhere.
    pub fn detached() -> Self {
        Self {
            mapper: Box::new(NoMbc),
            ppu: Box::new(OpenBus),
            timer: Box::new(OpenBus),
            apu: Box::new(OpenBus),
            serial: Box::new(OpenBus),
        }
    }

    pub fn with_mapper(mut self, mapper: Box<dyn Mapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_ppu(mut self, ppu: Box<dyn PixelProcessor>) -> Self {
        self.ppu = ppu;
        self
    }

    pub fn with_timer(mut self, timer: Box<dyn RegisterPort>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_apu(mut self, apu: Box<dyn RegisterPort>) -> Self {
        self.apu = apu;
        self
    }

    pub fn with_serial(mut self, serial: Box<dyn RegisterPort>) -> Self {
        self.serial = serial;
        self
    }
}

impl Default for Peripherals {
    fn default() -> Self {
        Self::detached()
    }
}
