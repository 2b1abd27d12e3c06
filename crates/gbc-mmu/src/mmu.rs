use crate::{
    banks::{BankStore, CART_RAM_SIZE, OAM_SIZE, UNMAPPED_FILL, VRAM_SIZE, WRAM_SIZE, ZP_RAM_SIZE},
    cartridge::{self, MapperType},
    error::{LoadError, SnapshotError},
    hardware::ConsoleMode,
    hdma::{DmaMode, HDMA_BLOCK_SIZE, sanitize_vram_dest},
    interrupts::Interrupt,
    peripherals::{Mapper, Peripherals, PixelProcessor, RegisterPort},
    registers::{BootOverlay, CgbFeatures, EXTENDED_REGISTERS_LEN, RegisterFile},
    state::{StateIo, StateReader, StateWriter},
};

#[cfg(feature = "mmu-trace")]
macro_rules! mmu_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}
#[cfg(not(feature = "mmu-trace"))]
macro_rules! mmu_trace {
    ($($arg:tt)*) => {};
}

/// Width of the work RAM field in the legacy snapshot block.
const LEGACY_WRAM_FIELD: usize = 0x10000;
/// Part of that field past physical WRAM, which holds the low half of VRAM.
const LEGACY_VRAM_SPILL: usize = LEGACY_WRAM_FIELD - WRAM_SIZE;

/// Size of the block written by [`Mmu::save_state`]: three flag bytes, the
/// 64 KiB work RAM field and 32 KiB of cartridge RAM.
pub const LEGACY_STATE_LEN: usize = 3 + LEGACY_WRAM_FIELD + CART_RAM_SIZE;

/// Tag opening the block appended by [`Mmu::save_extended_state`].
pub const EXTENDED_STATE_MAGIC: &[u8; 4] = b"GBX1";

/// Size of the block appended after the legacy block by
/// [`Mmu::save_extended_state`].
pub const EXTENDED_TRAILER_LEN: usize = EXTENDED_STATE_MAGIC.len()
    + 1
    + EXTENDED_REGISTERS_LEN
    + (VRAM_SIZE - LEGACY_VRAM_SPILL)
    + OAM_SIZE
    + ZP_RAM_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Port {
    Serial,
    Timer,
    Audio,
    Ppu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Bios,
    Rom,
    Vram,
    CartRam,
    Wram(usize),
    Oam,
    ZeroPage,
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Storage(Region),
    Port(Port),
    Register,
}

/// The CPU's view of memory.
///
/// Every access is decoded once into a [`Route`] and then served from the
/// bank store, forwarded to a collaborator's register window, or handled by
/// the register file.
pub struct Mmu {
    pub banks: BankStore,
    pub regs: RegisterFile,
    mapper: Box<dyn Mapper>,
    ppu: Box<dyn PixelProcessor>,
    timer: Box<dyn RegisterPort>,
    apu: Box<dyn RegisterPort>,
    serial: Box<dyn RegisterPort>,
}

impl Mmu {
    pub fn new(mode: ConsoleMode, peripherals: Peripherals) -> Self {
        let Peripherals {
            mapper,
            ppu,
            timer,
            apu,
            serial,
        } = peripherals;
        Self {
            banks: BankStore::new(),
            regs: RegisterFile::new(mode),
            mapper,
            ppu,
            timer,
            apu,
            serial,
        }
    }

    /// Memory map with no collaborators attached.
    pub fn new_with_mode(cgb: bool) -> Self {
        let mode = if cgb {
            ConsoleMode::Cgb
        } else {
            ConsoleMode::Dmg
        };
        Self::new(mode, Peripherals::detached())
    }

    pub fn mode(&self) -> ConsoleMode {
        self.regs.mode()
    }

    /// Install a boot ROM and map it over the start of the address space.
    pub fn load_bios(&mut self, image: &[u8], mode: ConsoleMode) -> Result<(), LoadError> {
        let expected = mode.bios_size();
        if image.len() != expected {
            return Err(LoadError::BiosLength {
                mode,
                expected,
                actual: image.len(),
            });
        }
        if mode != self.mode() {
            return Err(LoadError::BiosModeMismatch {
                bios: mode,
                console: self.mode(),
            });
        }

        self.banks.install_bios(image, mode);
        self.regs.boot = BootOverlay::Active;
        // The boot ROM picks the feature set through KEY0, whatever the header said.
        if let Some(cgb) = self.regs.model.cgb_mut() {
            cgb.features = CgbFeatures::Native;
        }
        log::debug!("{mode} boot ROM mapped ({} bytes)", image.len());
        Ok(())
    }

    /// Install the cartridge image. `len` is the length the caller validated
    /// the image against and must match it exactly.
    pub fn load_rom(
        &mut self,
        image: &[u8],
        len: usize,
        mapper: MapperType,
    ) -> Result<(), LoadError> {
        if image.is_empty() {
            return Err(LoadError::EmptyRom);
        }
        if len != image.len() {
            return Err(LoadError::RomLength {
                declared: len,
                actual: image.len(),
            });
        }

        let ram_len = mapper.backed_ram_size(image);
        if mapper.ram_size(image) > ram_len {
            log::warn!(
                "cartridge declares {} bytes of RAM; only {ram_len} are backed",
                mapper.ram_size(image)
            );
        }
        self.banks.install_rom(image, mapper, ram_len);

        // Without a boot ROM nobody writes KEY0, so take the header's word for it.
        if self.banks.bios().is_none()
            && let Some(cgb) = self.regs.model.cgb_mut()
        {
            cgb.features = if cartridge::cgb_supported(image) {
                CgbFeatures::Native
            } else {
                CgbFeatures::DmgCompat
            };
        }

        log::debug!(
            "loaded ROM \"{}\": {} bytes, type {:02X} ({:?}), {} bytes cartridge RAM",
            cartridge::title(image),
            image.len(),
            mapper.code(),
            mapper.mbc(),
            self.banks.cart_ram_len()
        );
        Ok(())
    }

    /// Fails if emulation would start without a cartridge.
    pub fn ensure_loaded(&self) -> Result<(), LoadError> {
        if self.banks.rom().is_none() {
            return Err(LoadError::RomMissing);
        }
        Ok(())
    }

    /// Restore power-on register values.
    pub fn reset_registers(&mut self) {
        self.regs.reset();
    }

    fn bios_mapped(&self, addr: u16) -> bool {
        self.regs.boot.is_active()
            && self
                .banks
                .bios()
                .is_some_and(|bios| bios.mode().bios_window_contains(addr))
    }

    fn decode(&self, addr: u16) -> Route {
        match addr {
            0x0000..=0x08FF if self.bios_mapped(addr) => Route::Storage(Region::Bios),
            0x0000..=0x7FFF => Route::Storage(Region::Rom),
            0x8000..=0x9FFF => Route::Storage(Region::Vram),
            0xA000..=0xBFFF => Route::Storage(Region::CartRam),
            0xC000..=0xCFFF | 0xE000..=0xEFFF => Route::Storage(Region::Wram(0)),
            0xD000..=0xDFFF | 0xF000..=0xFDFF => {
                Route::Storage(Region::Wram(self.regs.wram_bank()))
            }
            0xFE00..=0xFE9F => Route::Storage(Region::Oam),
            0xFF01 | 0xFF02 => Route::Port(Port::Serial),
            0xFF04..=0xFF07 => Route::Port(Port::Timer),
            0xFF10..=0xFF3F => Route::Port(Port::Audio),
            0xFF40..=0xFF4B => Route::Port(Port::Ppu),
            0xFF68..=0xFF6B if self.regs.model.cgb().is_some() => Route::Port(Port::Ppu),
            0xFF00
            | 0xFF0F
            | 0xFF4C
            | 0xFF4D
            | 0xFF4F
            | 0xFF50..=0xFF56
            | 0xFF6C
            | 0xFF70
            | 0xFF72..=0xFF77
            | 0xFFFF => Route::Register,
            0xFF80..=0xFFFE => Route::Storage(Region::ZeroPage),
            _ => Route::Storage(Region::Unmapped),
        }
    }

    fn cart_ram_slot(&self, addr: u16) -> Option<usize> {
        let bank = self.mapper.selected_ram_bank(addr)?;
        self.banks.cart_ram_index(bank, (addr - 0xA000) as usize)
    }

    fn vram_slot(&self, addr: u16) -> usize {
        BankStore::vram_index(self.regs.vram_bank(), (addr - 0x8000) as usize)
    }

    fn read_region(&self, region: Region, addr: u16) -> u8 {
        match region {
            Region::Bios => self.banks.bios_byte(addr).unwrap_or(UNMAPPED_FILL),
            Region::Rom => {
                let bank = self.mapper.selected_rom_bank(addr);
                self.banks
                    .rom_byte(bank, addr as usize)
                    .unwrap_or(UNMAPPED_FILL)
            }
            Region::Vram => {
                if self.ppu.is_vram_blocked() {
                    mmu_trace!("VRAM read blocked addr={addr:04X}");
                    UNMAPPED_FILL
                } else {
                    self.banks.vram[self.vram_slot(addr)]
                }
            }
            Region::CartRam => self
                .cart_ram_slot(addr)
                .map_or(UNMAPPED_FILL, |i| self.banks.cart_ram[i]),
            Region::Wram(bank) => self.banks.wram[BankStore::wram_index(bank, addr as usize)],
            Region::Oam => {
                if self.ppu.is_oam_blocked() {
                    mmu_trace!("OAM read blocked addr={addr:04X}");
                    UNMAPPED_FILL
                } else {
                    self.banks.oam[BankStore::oam_index((addr - 0xFE00) as usize)]
                }
            }
            Region::ZeroPage => self.banks.zp_ram[(addr - 0xFF80) as usize],
            Region::Unmapped => self.banks.unmapped(addr),
        }
    }

    fn write_region(&mut self, region: Region, addr: u16, val: u8) {
        match region {
            Region::Bios => {
                mmu_trace!("write to mapped boot ROM dropped addr={addr:04X} val={val:02X}");
            }
            Region::Rom => self.mapper.write_register(addr, val),
            Region::Vram => {
                if self.ppu.is_vram_blocked() {
                    mmu_trace!("VRAM write blocked addr={addr:04X} val={val:02X}");
                } else {
                    let slot = self.vram_slot(addr);
                    self.banks.vram[slot] = val;
                }
            }
            Region::CartRam => match self.cart_ram_slot(addr) {
                Some(i) => self.banks.cart_ram[i] = val,
                None => self.mapper.write_register(addr, val),
            },
            Region::Wram(bank) => {
                self.banks.wram[BankStore::wram_index(bank, addr as usize)] = val;
            }
            Region::Oam => {
                if self.ppu.is_oam_blocked() {
                    mmu_trace!("OAM write blocked addr={addr:04X} val={val:02X}");
                } else {
                    self.banks.oam[BankStore::oam_index((addr - 0xFE00) as usize)] = val;
                }
            }
            Region::ZeroPage => self.banks.zp_ram[(addr - 0xFF80) as usize] = val,
            Region::Unmapped => {}
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        match self.decode(addr) {
            Route::Storage(region) => self.read_region(region, addr),
            Route::Port(Port::Serial) => self.serial.read_reg(addr),
            Route::Port(Port::Timer) => self.timer.read_reg(addr),
            Route::Port(Port::Audio) => self.apu.read_reg(addr),
            Route::Port(Port::Ppu) => self.ppu.read_reg(addr),
            Route::Register => {
                if addr == 0xFF00 {
                    self.regs.lagged = false;
                }
                self.regs.peek(addr)
            }
        }
    }

    /// Read without side effects, for debuggers and tools.
    pub fn peek_byte(&self, addr: u16) -> u8 {
        match self.decode(addr) {
            Route::Storage(region) => self.read_region(region, addr),
            Route::Port(Port::Serial) => self.serial.peek_reg(addr),
            Route::Port(Port::Timer) => self.timer.peek_reg(addr),
            Route::Port(Port::Audio) => self.apu.peek_reg(addr),
            Route::Port(Port::Ppu) => self.ppu.peek_reg(addr),
            Route::Register => self.regs.peek(addr),
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match self.decode(addr) {
            Route::Storage(region) => self.write_region(region, addr, val),
            Route::Port(Port::Serial) => self.serial.write_reg(addr, val, &mut self.regs.if_reg),
            Route::Port(Port::Timer) => self.timer.write_reg(addr, val, &mut self.regs.if_reg),
            Route::Port(Port::Audio) => self.apu.write_reg(addr, val, &mut self.regs.if_reg),
            Route::Port(Port::Ppu) => {
                let lcd_was_on = self.ppu.lcd_enabled();
                self.ppu.write_reg(addr, val, &mut self.regs.if_reg);
                if lcd_was_on && !self.ppu.lcd_enabled() {
                    self.complete_active_hdma();
                }
            }
            Route::Register => match addr {
                0xFF51..=0xFF54 => {
                    if let Some(hdma) = self.regs.hdma_mut() {
                        hdma.write_address(addr, val);
                    }
                }
                0xFF55 => self.write_hdma_control(val),
                _ => self.regs.write(addr, val),
            },
        }
    }

    pub fn request_interrupt(&mut self, irq: Interrupt) {
        self.regs.request_interrupt(irq);
    }

    pub fn acknowledge_interrupt(&mut self, irq: Interrupt) {
        self.regs.if_reg.clear(irq);
    }

    /// IE & IF, restricted to the five real interrupt lines.
    pub fn pending_interrupts(&self) -> u8 {
        self.regs.ie & self.regs.if_reg.bits() & 0x1F
    }

    pub fn highest_pending_interrupt(&self) -> Option<Interrupt> {
        let pending = self.pending_interrupts();
        Interrupt::ALL
            .into_iter()
            .find(|irq| pending & irq.mask() != 0)
    }

    /// Called by the CPU on STOP. Returns the stall in cycles, 0 when no
    /// switch happened.
    pub fn speed_switch(&mut self) -> u32 {
        self.regs.speed_switch()
    }

    pub fn double_speed(&self) -> bool {
        self.regs.double_speed()
    }

    /// Host-supplied button state, bit set = pressed:
    /// A, B, Select, Start, Right, Left, Up, Down from bit 0.
    pub fn set_controller_state(&mut self, pressed: u8) {
        self.regs.set_controller_state(pressed);
    }

    /// Start lag tracking for a new frame; cleared by the next joypad read.
    pub fn begin_frame(&mut self) {
        self.regs.lagged = true;
    }

    pub fn lagged(&self) -> bool {
        self.regs.lagged
    }

    pub fn start_pressed(&self) -> bool {
        self.regs.start_pressed
    }

    fn write_hdma_control(&mut self, val: u8) {
        let lcd_on = self.ppu.lcd_enabled();
        let in_hblank = self.ppu.in_hblank();
        let Some(hdma) = self.regs.hdma_mut() else {
            return;
        };
        let requested_blocks = (val & 0x7F) + 1;
        if hdma.active && val & 0x80 == 0 {
            // Abort ongoing HDMA.
            hdma.cancel();
            log::debug!("HDMA cancelled");
        } else if val & 0x80 == 0 {
            self.start_gdma(requested_blocks);
        } else {
            hdma.arm_hblank(requested_blocks);
            if !lcd_on || in_hblank {
                self.perform_hdma_block();
            }
        }
    }

    /// Read a DMA source byte. Bypasses VRAM/OAM blocking and never touches
    /// registers.
    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.read_region(Region::Rom, addr),
            0x8000..=0x9FFF => UNMAPPED_FILL,
            0xA000..=0xBFFF => self.read_region(Region::CartRam, addr),
            0xC000..=0xCFFF => self.read_region(Region::Wram(0), addr),
            0xD000..=0xDFFF => self.read_region(Region::Wram(self.regs.wram_bank()), addr),
            // The top source lines are not decoded; E000-FFFF reads A000-BFFF.
            0xE000..=0xFFFF => self.dma_read(addr - 0x4000),
        }
    }

    /// Write to VRAM bypassing mode checks (used by DMA transfers)
    fn vram_dma_write(&mut self, addr: u16, val: u8) {
        let slot = self.vram_slot(addr);
        self.banks.vram[slot] = val;
    }

    fn hdma_block_cycle_cost(&self) -> u32 {
        if self.regs.double_speed() { 16 } else { 8 }
    }

    /// Perform a General DMA transfer immediately, consuming CPU cycles.
    fn start_gdma(&mut self, blocks: u8) {
        let Some(hdma) = self.regs.hdma() else {
            return;
        };
        let mut src = hdma.src;
        let mut dst = sanitize_vram_dest(hdma.dst);

        for _ in 0..blocks as u16 * HDMA_BLOCK_SIZE {
            let byte = self.dma_read(src);
            self.vram_dma_write(dst, byte);
            src = src.wrapping_add(1);
            dst = 0x8000 | (dst.wrapping_add(1) & 0x1FFF);
        }

        let stall = blocks as u32 * self.hdma_block_cycle_cost();
        if let Some(hdma) = self.regs.hdma_mut() {
            hdma.src = src;
            hdma.dst = sanitize_vram_dest(dst);
            hdma.mode = DmaMode::Gdma;
            hdma.active = false;
            hdma.blocks = 0;
            hdma.cancelled = false;
            hdma.stall_cycles = stall;
        }
        log::debug!("GDMA copied {blocks} blocks");
    }

    /// Execute a single 0x10-byte HDMA burst. The driver calls this on every
    /// H-Blank entry.
    pub fn hdma_hblank_transfer(&mut self) {
        let running = self
            .regs
            .hdma()
            .is_some_and(|h| h.active && h.mode == DmaMode::Hdma);
        if running {
            self.perform_hdma_block();
        }
    }

    fn perform_hdma_block(&mut self) {
        let Some(hdma) = self.regs.hdma() else {
            return;
        };
        let mut src = hdma.src;
        let mut dst = sanitize_vram_dest(hdma.dst);

        for _ in 0..HDMA_BLOCK_SIZE {
            let byte = self.dma_read(src);
            self.vram_dma_write(dst, byte);
            src = src.wrapping_add(1);
            dst = 0x8000 | (dst.wrapping_add(1) & 0x1FFF);
        }

        let cost = self.hdma_block_cycle_cost();
        if let Some(hdma) = self.regs.hdma_mut() {
            hdma.src = src;
            hdma.dst = sanitize_vram_dest(dst);
            hdma.blocks = hdma.blocks.saturating_sub(1);
            if hdma.blocks == 0 {
                hdma.active = false;
                hdma.cancelled = false;
            }
            hdma.stall_cycles += cost;
        }
    }

    fn complete_active_hdma(&mut self) {
        while self
            .regs
            .hdma()
            .is_some_and(|h| h.active && h.mode == DmaMode::Hdma)
        {
            self.perform_hdma_block();
        }
    }

    /// Return true if a General or HBlank DMA stall is in progress.
    pub fn gdma_active(&self) -> bool {
        self.regs.hdma().is_some_and(|h| h.stall_cycles > 0)
    }

    /// Decrement the DMA stall counter by the given number of cycles.
    pub fn gdma_step(&mut self, cycles: u16) {
        if let Some(hdma) = self.regs.hdma_mut() {
            hdma.stall_cycles = hdma.stall_cycles.saturating_sub(cycles as u32);
        }
    }

    fn sync_legacy<S: StateIo>(&mut self, io: &mut S) {
        let mut overlay = self.regs.boot.is_active();
        io.flag(&mut overlay);
        self.regs.boot = if overlay {
            BootOverlay::Active
        } else {
            BootOverlay::Disabled
        };
        io.flag(&mut self.regs.lagged);
        io.flag(&mut self.regs.start_pressed);
        // The work RAM field is twice the size of physical WRAM; existing
        // snapshots carry the low half of VRAM in the remainder.
        io.bytes(&mut self.banks.wram);
        io.bytes(&mut self.banks.vram[..LEGACY_VRAM_SPILL]);
        io.bytes(&mut self.banks.cart_ram);
    }

    fn sync_extended<S: StateIo>(&mut self, io: &mut S) {
        let mut magic = *EXTENDED_STATE_MAGIC;
        io.bytes(&mut magic);
        let mut model = u8::from(self.mode().is_cgb());
        io.byte(&mut model);
        self.regs.sync_extended(io);
        io.bytes(&mut self.banks.vram[LEGACY_VRAM_SPILL..]);
        io.bytes(&mut self.banks.oam);
        io.bytes(&mut self.banks.zp_ram);
    }

    /// Append the legacy snapshot block. Returns the writer position after it.
    ///
    /// Takes `&mut self` because saving and loading walk the same field list.
    pub fn save_state(&mut self, out: &mut StateWriter) -> usize {
        self.sync_legacy(out);
        out.position()
    }

    /// Restore from a legacy snapshot block. Nothing is modified unless the
    /// whole block is available.
    pub fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<usize, SnapshotError> {
        input.require(LEGACY_STATE_LEN)?;
        self.sync_legacy(input);
        Ok(input.position())
    }

    /// Legacy block followed by the registers, banks, HDMA progress and memory
    /// the legacy block leaves out.
    pub fn save_extended_state(&mut self, out: &mut StateWriter) -> usize {
        self.sync_legacy(out);
        self.sync_extended(out);
        out.position()
    }

    pub fn load_extended_state(
        &mut self,
        input: &mut StateReader<'_>,
    ) -> Result<usize, SnapshotError> {
        let needed = LEGACY_STATE_LEN + EXTENDED_TRAILER_LEN;
        input.require(needed)?;
        let header = input
            .peek(LEGACY_STATE_LEN, EXTENDED_STATE_MAGIC.len() + 1)
            .ok_or(SnapshotError::Truncated {
                needed,
                available: input.remaining(),
            })?;
        if &header[..EXTENDED_STATE_MAGIC.len()] != EXTENDED_STATE_MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let saved = if header[EXTENDED_STATE_MAGIC.len()] == 1 {
            ConsoleMode::Cgb
        } else {
            ConsoleMode::Dmg
        };
        if saved != self.mode() {
            return Err(SnapshotError::ModelMismatch {
                saved,
                current: self.mode(),
            });
        }

        self.sync_legacy(input);
        self.sync_extended(input);
        Ok(input.position())
    }

    /// Legacy snapshot as a standalone buffer.
    pub fn snapshot(&mut self) -> Vec<u8> {
        let mut out = StateWriter::with_capacity(LEGACY_STATE_LEN);
        self.save_state(&mut out);
        out.into_bytes()
    }

    pub fn restore(&mut self, bytes: &[u8]) -> Result<usize, SnapshotError> {
        self.load_state(&mut StateReader::new(bytes))
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new(ConsoleMode::Dmg, Peripherals::detached())
    }
}
