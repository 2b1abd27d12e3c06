//! Registers owned by the memory core itself.

use crate::{
    hardware::{ConsoleMode, DOTS_PER_FRAME},
    hdma::HdmaState,
    interrupts::{Interrupt, InterruptFlag},
    state::StateIo,
};

/// Joypad value with no lines selected and nothing pressed.
const JOYPAD_POWER_ON: u8 = 0xCF;

/// Stall reported to the CPU when a speed switch completes.
pub const SPEED_SWITCH_STALL: u32 = DOTS_PER_FRAME * 2;

/// Boot ROM overlay. `Active` is only entered by loading a boot ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootOverlay {
    Active,
    #[default]
    Disabled,
}

impl BootOverlay {
    pub fn is_active(self) -> bool {
        self == BootOverlay::Active
    }
}

/// Which feature set a CGB exposes to the running cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CgbFeatures {
    #[default]
    Native,
    /// Locked into DMG compatibility by the boot ROM (KEY0) or the header.
    DmgCompat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    Single,
    Double,
}

/// Undocumented CGB registers FF6C and FF72-FF77.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndocRegs {
    pub ff6c: u8,
    pub ff72: u8,
    pub ff73: u8,
    pub ff74: u8,
    pub ff75: u8,
    pub ff76: u8,
    pub ff77: u8,
}

impl UndocRegs {
    pub const POWER_ON: Self = Self {
        ff6c: 0xFE,
        ff72: 0,
        ff73: 0,
        ff74: 0,
        ff75: 0x8F,
        ff76: 0,
        ff77: 0,
    };
}

impl Default for UndocRegs {
    fn default() -> Self {
        Self::POWER_ON
    }
}

/// Registers that only exist on CGB hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgbState {
    pub features: CgbFeatures,
    pub speed: Speed,
    /// KEY1 bit 0: switch requested, performed on the next STOP.
    pub speed_armed: bool,
    /// SVBK, always 1-7.
    pub wram_bank: u8,
    /// VBK, 0 or 1.
    pub vram_bank: u8,
    /// RP infrared port (bits 0, 6, 7).
    pub rp: u8,
    pub undoc: UndocRegs,
    pub hdma: HdmaState,
}

impl CgbState {
    pub fn new() -> Self {
        Self {
            features: CgbFeatures::Native,
            speed: Speed::Single,
            speed_armed: false,
            wram_bank: 1,
            vram_bank: 0,
            rp: 0,
            undoc: UndocRegs::POWER_ON,
            hdma: HdmaState::new(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.features == CgbFeatures::Native
    }

    pub(crate) fn sync<S: StateIo>(&mut self, io: &mut S) {
        let mut features = u8::from(self.features == CgbFeatures::DmgCompat);
        io.byte(&mut features);
        self.features = if features == 1 {
            CgbFeatures::DmgCompat
        } else {
            CgbFeatures::Native
        };
        let mut double = self.speed == Speed::Double;
        io.flag(&mut double);
        self.speed = if double { Speed::Double } else { Speed::Single };
        io.flag(&mut self.speed_armed);
        io.byte(&mut self.wram_bank);
        self.wram_bank = (self.wram_bank & 0x07).max(1);
        io.byte(&mut self.vram_bank);
        self.vram_bank &= 0x01;
        io.byte(&mut self.rp);
        io.byte(&mut self.undoc.ff6c);
        io.byte(&mut self.undoc.ff72);
        io.byte(&mut self.undoc.ff73);
        io.byte(&mut self.undoc.ff74);
        io.byte(&mut self.undoc.ff75);
        io.byte(&mut self.undoc.ff76);
        io.byte(&mut self.undoc.ff77);
        self.hdma.sync(io);
    }
}

impl Default for CgbState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes written by [`CgbState::sync`].
pub(crate) const CGB_STATE_LEN: usize = 6 + 7 + crate::hdma::HDMA_STATE_LEN;

/// Console hardware plus the state only that hardware has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Dmg,
    Cgb(CgbState),
}

impl Model {
    pub fn new(mode: ConsoleMode) -> Self {
        match mode {
            ConsoleMode::Dmg => Model::Dmg,
            ConsoleMode::Cgb => Model::Cgb(CgbState::new()),
        }
    }

    pub fn mode(&self) -> ConsoleMode {
        match self {
            Model::Dmg => ConsoleMode::Dmg,
            Model::Cgb(_) => ConsoleMode::Cgb,
        }
    }

    /// CGB hardware, whatever feature set is exposed.
    pub fn cgb(&self) -> Option<&CgbState> {
        match self {
            Model::Cgb(cgb) => Some(cgb),
            Model::Dmg => None,
        }
    }

    pub fn cgb_mut(&mut self) -> Option<&mut CgbState> {
        match self {
            Model::Cgb(cgb) => Some(cgb),
            Model::Dmg => None,
        }
    }

    /// CGB hardware running with CGB features enabled.
    pub fn native(&self) -> Option<&CgbState> {
        self.cgb().filter(|cgb| cgb.is_native())
    }

    pub fn native_mut(&mut self) -> Option<&mut CgbState> {
        self.cgb_mut().filter(|cgb| cgb.is_native())
    }
}

/// Flags and bytes the CPU sees as hardware registers.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    pub ie: u8,
    pub if_reg: InterruptFlag,
    pub model: Model,
    pub boot: BootOverlay,
    /// P1 line select (bits 4-5).
    joypad_select: u8,
    /// Pressed buttons, bit set = pressed: A B Select Start Right Left Up Down.
    pressed: u8,
    /// No joypad read happened since the frame started.
    pub lagged: bool,
    pub start_pressed: bool,
}

impl RegisterFile {
    pub fn new(mode: ConsoleMode) -> Self {
        let mut regs = Self {
            ie: 0,
            if_reg: InterruptFlag::new(),
            model: Model::new(mode),
            boot: BootOverlay::Disabled,
            joypad_select: 0,
            pressed: 0,
            lagged: false,
            start_pressed: false,
        };
        regs.reset();
        regs
    }

    /// Power-on values for the interrupt, joypad and undocumented registers.
    pub fn reset(&mut self) {
        self.joypad_select = JOYPAD_POWER_ON & 0x30;
        self.ie = 0;
        self.if_reg = InterruptFlag::new();
        if let Some(cgb) = self.model.cgb_mut() {
            cgb.undoc = UndocRegs::POWER_ON;
        }
    }

    pub fn mode(&self) -> ConsoleMode {
        self.model.mode()
    }

    /// WRAM bank mapped at 0xD000. Always 1 outside native CGB mode.
    pub fn wram_bank(&self) -> usize {
        self.model.native().map_or(1, |cgb| cgb.wram_bank as usize)
    }

    /// VRAM bank mapped at 0x8000. Always 0 outside native CGB mode.
    pub fn vram_bank(&self) -> usize {
        self.model.native().map_or(0, |cgb| cgb.vram_bank as usize)
    }

    pub fn double_speed(&self) -> bool {
        self.model
            .cgb()
            .is_some_and(|cgb| cgb.speed == Speed::Double)
    }

    pub fn hdma(&self) -> Option<&HdmaState> {
        self.model.native().map(|cgb| &cgb.hdma)
    }

    pub fn hdma_mut(&mut self) -> Option<&mut HdmaState> {
        self.model.native_mut().map(|cgb| &mut cgb.hdma)
    }

    pub fn request_interrupt(&mut self, irq: Interrupt) {
        self.if_reg.request(irq);
    }

    pub fn set_controller_state(&mut self, pressed: u8) {
        self.pressed = pressed;
        self.start_pressed = pressed & 0x08 != 0;
    }

    fn joypad(&self) -> u8 {
        let mut lines = 0x0F;
        if self.joypad_select & 0x20 == 0 {
            lines &= !(self.pressed & 0x0F);
        }
        if self.joypad_select & 0x10 == 0 {
            lines &= !(self.pressed >> 4);
        }
        0xC0 | self.joypad_select | lines
    }

    /// Perform a pending speed switch. Called by the CPU when it executes STOP;
    /// the return value is the number of cycles the CPU stalls for.
    pub fn speed_switch(&mut self) -> u32 {
        let Some(cgb) = self.model.cgb_mut() else {
            return 0;
        };
        if !cgb.speed_armed {
            return 0;
        }
        cgb.speed_armed = false;
        cgb.speed = match cgb.speed {
            Speed::Single => Speed::Double,
            Speed::Double => Speed::Single,
        };
        log::debug!("speed switch -> {:?}", cgb.speed);
        SPEED_SWITCH_STALL
    }

    /// Value of a core-owned register. Never has side effects.
    pub fn peek(&self, addr: u16) -> u8 {
        let cgb = self.model.cgb();
        let native = self.model.native();
        match addr {
            0xFF00 => self.joypad(),
            0xFF0F => self.if_reg.bits(),
            0xFF4D => native.map_or(0xFF, |c| {
                let double = u8::from(c.speed == Speed::Double) << 7;
                0x7E | double | u8::from(c.speed_armed)
            }),
            0xFF4F => native.map_or(0xFF, |c| 0xFE | c.vram_bank),
            0xFF51..=0xFF55 => native.map_or(0xFF, |c| c.hdma.read(addr)),
            // Bit 1 set means no infrared light is being received.
            0xFF56 => cgb.map_or(0xFF, |c| (c.rp & 0xC1) | 0x3E),
            0xFF6C => native.map_or(0xFF, |c| c.undoc.ff6c),
            0xFF70 => native.map_or(0xFF, |c| 0xF8 | c.wram_bank),
            0xFF72 => cgb.map_or(0xFF, |c| c.undoc.ff72),
            0xFF73 => cgb.map_or(0xFF, |c| c.undoc.ff73),
            0xFF74 => native.map_or(0xFF, |c| c.undoc.ff74),
            0xFF75 => cgb.map_or(0xFF, |c| 0x8F | c.undoc.ff75),
            0xFF76 => cgb.map_or(0xFF, |c| c.undoc.ff76),
            0xFF77 => cgb.map_or(0xFF, |c| c.undoc.ff77),
            0xFFFF => self.ie,
            _ => 0xFF,
        }
    }

    /// Write a core-owned register that has no bus side effects. FF51-FF55
    /// are handled by the router since starting a transfer touches memory.
    pub fn write(&mut self, addr: u16, val: u8) {
        let boot_active = self.boot.is_active();
        match addr {
            0xFF00 => self.joypad_select = val & 0x30,
            0xFF0F => self.if_reg.set_bits(val),
            0xFF4C => {
                if boot_active
                    && val & 0x04 != 0
                    && let Some(cgb) = self.model.cgb_mut()
                {
                    log::debug!("KEY0 write {val:02X}: DMG compatibility mode");
                    cgb.features = CgbFeatures::DmgCompat;
                }
            }
            0xFF4D => {
                if let Some(cgb) = self.model.native_mut() {
                    cgb.speed_armed = val & 0x01 != 0;
                }
            }
            0xFF4F => {
                if let Some(cgb) = self.model.native_mut() {
                    cgb.vram_bank = val & 0x01;
                }
            }
            0xFF50 => {
                if val != 0 && boot_active {
                    log::debug!("boot ROM unmapped");
                    self.boot = BootOverlay::Disabled;
                }
            }
            0xFF56 => {
                if let Some(cgb) = self.model.cgb_mut() {
                    cgb.rp = val & 0xC1;
                }
            }
            0xFF6C => {
                if let Some(cgb) = self.model.native_mut() {
                    cgb.undoc.ff6c = 0xFE | (val & 0x01);
                }
            }
            0xFF70 => {
                if let Some(cgb) = self.model.native_mut() {
                    let bank = val & 0x07;
                    cgb.wram_bank = if bank == 0 { 1 } else { bank };
                }
            }
            0xFF72 => {
                if let Some(cgb) = self.model.cgb_mut() {
                    cgb.undoc.ff72 = val;
                }
            }
            0xFF73 => {
                if let Some(cgb) = self.model.cgb_mut() {
                    cgb.undoc.ff73 = val;
                }
            }
            0xFF74 => {
                if let Some(cgb) = self.model.native_mut() {
                    cgb.undoc.ff74 = val;
                }
            }
            0xFF75 => {
                if let Some(cgb) = self.model.cgb_mut() {
                    cgb.undoc.ff75 = val & 0x70;
                }
            }
            0xFFFF => self.ie = val,
            _ => {}
        }
    }

    /// Everything the legacy snapshot block leaves out.
    pub(crate) fn sync_extended<S: StateIo>(&mut self, io: &mut S) {
        io.byte(&mut self.ie);
        let mut if_bits = self.if_reg.bits();
        io.byte(&mut if_bits);
        self.if_reg.set_bits(if_bits);
        io.byte(&mut self.joypad_select);
        self.joypad_select &= 0x30;
        match &mut self.model {
            Model::Cgb(cgb) => cgb.sync(io),
            Model::Dmg => CgbState::new().sync(io),
        }
    }
}

/// Bytes written by [`RegisterFile::sync_extended`].
pub(crate) const EXTENDED_REGISTERS_LEN: usize = 3 + CGB_STATE_LEN;
