use std::fmt;

/// Size of the DMG boot ROM.
pub const DMG_BIOS_SIZE: usize = 0x100;
/// Size of the CGB boot ROM (0x0000-0x00FF plus 0x0200-0x08FF).
pub const CGB_BIOS_SIZE: usize = 0x900;

/// Dots per frame at single speed.
pub const DOTS_PER_FRAME: u32 = 70224;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Console hardware the memory map is wired for.
///
/// The mode is fixed at construction. A CGB can still run in DMG
/// compatibility mode, which is tracked separately by the register file.
pub enum ConsoleMode {
    #[default]
    Dmg,
    Cgb,
}

impl ConsoleMode {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, ConsoleMode::Cgb)
    }

    /// Boot ROM image length expected for this console.
    #[inline]
    pub const fn bios_size(self) -> usize {
        match self {
            ConsoleMode::Dmg => DMG_BIOS_SIZE,
            ConsoleMode::Cgb => CGB_BIOS_SIZE,
        }
    }

    /// Returns whether `addr` is covered by the boot ROM overlay.
    ///
    /// On CGB the cartridge header at 0x0100-0x01FF stays visible while the
    /// boot ROM is mapped.
    #[inline]
    pub const fn bios_window_contains(self, addr: u16) -> bool {
        match self {
            ConsoleMode::Dmg => addr <= 0x00FF,
            ConsoleMode::Cgb => addr <= 0x00FF || (addr >= 0x0200 && addr <= 0x08FF),
        }
    }
}

impl fmt::Display for ConsoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleMode::Dmg => f.write_str("DMG"),
            ConsoleMode::Cgb => f.write_str("CGB"),
        }
    }
}
