#![allow(dead_code)]

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use gbc_mmu::{Interrupt, Mapper, PixelProcessor, RegisterPort, interrupts::InterruptFlag};

/// PPU double whose mode and LCDC the test keeps a handle to after the box
/// has been moved into the MMU.
#[derive(Clone, Default)]
pub struct FakePpu {
    pub mode: Arc<AtomicU8>,
    pub lcdc: Arc<AtomicU8>,
}

impl FakePpu {
    pub fn new() -> Self {
        let ppu = Self::default();
        ppu.lcdc.store(0x91, Ordering::SeqCst);
        ppu.mode.store(1, Ordering::SeqCst);
        ppu
    }

    pub fn set_mode(&self, mode: u8) {
        self.mode.store(mode, Ordering::SeqCst);
    }

    fn lcd_on(&self) -> bool {
        self.lcdc.load(Ordering::SeqCst) & 0x80 != 0
    }

    fn current_mode(&self) -> u8 {
        self.mode.load(Ordering::SeqCst)
    }
}

impl RegisterPort for FakePpu {
    fn read_reg(&mut self, addr: u16) -> u8 {
        self.peek_reg(addr)
    }

    fn peek_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc.load(Ordering::SeqCst),
            0xFF41 => 0x80 | self.current_mode(),
            _ => 0x00,
        }
    }

    fn write_reg(&mut self, addr: u16, value: u8, _if_reg: &mut InterruptFlag) {
        if addr == 0xFF40 {
            self.lcdc.store(value, Ordering::SeqCst);
        }
    }
}

impl PixelProcessor for FakePpu {
    fn is_vram_blocked(&self) -> bool {
        self.lcd_on() && self.current_mode() == 3
    }

    fn is_oam_blocked(&self) -> bool {
        self.lcd_on() && self.current_mode() >= 2
    }

    fn lcd_enabled(&self) -> bool {
        self.lcd_on()
    }

    fn in_hblank(&self) -> bool {
        self.current_mode() == 0
    }
}

/// Register window that remembers every access and optionally raises an
/// interrupt on write.
#[derive(Clone, Default)]
pub struct RecordingPort {
    pub writes: Arc<Mutex<Vec<(u16, u8)>>>,
    pub reads: Arc<Mutex<Vec<u16>>>,
    pub raises: Option<Interrupt>,
    pub value: u8,
}

impl RecordingPort {
    pub fn new(value: u8) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn raising(mut self, irq: Interrupt) -> Self {
        self.raises = Some(irq);
        self
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<u16> {
        self.reads.lock().unwrap().clone()
    }
}

impl RegisterPort for RecordingPort {
    fn read_reg(&mut self, addr: u16) -> u8 {
        self.reads.lock().unwrap().push(addr);
        self.value
    }

    fn peek_reg(&self, _addr: u16) -> u8 {
        self.value
    }

    fn write_reg(&mut self, addr: u16, value: u8, if_reg: &mut InterruptFlag) {
        self.writes.lock().unwrap().push((addr, value));
        if let Some(irq) = self.raises {
            if_reg.request(irq);
        }
    }
}

/// Minimal MBC5-style controller: RAM enable at 0x0000, ROM bank at 0x2000,
/// RAM bank at 0x4000.
#[derive(Clone, Default)]
pub struct BankedMapper {
    rom_bank: usize,
    ram_bank: usize,
    ram_enabled: bool,
    pub dropped_writes: Arc<Mutex<Vec<(u16, u8)>>>,
}

impl BankedMapper {
    pub fn new() -> Self {
        Self {
            rom_bank: 1,
            ..Self::default()
        }
    }
}

impl Mapper for BankedMapper {
    fn selected_rom_bank(&self, addr: u16) -> usize {
        if addr < 0x4000 { 0 } else { self.rom_bank }
    }

    fn selected_ram_bank(&self, _addr: u16) -> Option<usize> {
        self.ram_enabled.then_some(self.ram_bank)
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x3FFF => self.rom_bank = value as usize,
            0x4000..=0x5FFF => self.ram_bank = (value & 0x0F) as usize,
            _ => self.dropped_writes.lock().unwrap().push((addr, value)),
        }
    }
}

/// ROM image whose every bank starts with its own bank number.
pub fn numbered_rom(banks: usize, cart_type: u8, ram_code: u8, cgb_flag: u8) -> Vec<u8> {
    let mut rom = vec![0u8; banks * 0x4000];
    for (i, bank) in rom.chunks_mut(0x4000).enumerate() {
        bank[0] = i as u8;
    }
    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0143] = cgb_flag;
    rom[0x0147] = cart_type;
    rom[0x0149] = ram_code;
    rom
}
