/// Bits of IF that are not wired and always read back as 1.
const IF_UNUSED_BITS: u8 = 0xE0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Interrupt sources in priority order.
pub enum Interrupt {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::Stat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    #[inline]
    pub const fn mask(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::Stat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }
}

/// The IF register (0xFF0F).
///
/// Collaborators get a mutable reference to this when their registers are
/// written so they can raise interrupt lines without reaching into the rest of
/// the register file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptFlag(u8);

impl InterruptFlag {
    pub const fn new() -> Self {
        Self(IF_UNUSED_BITS)
    }

    /// Value as seen on the bus. The top three bits are always set.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0 | IF_UNUSED_BITS
    }

    #[inline]
    pub fn set_bits(&mut self, value: u8) {
        self.0 = value | IF_UNUSED_BITS;
    }

    #[inline]
    pub fn request(&mut self, irq: Interrupt) {
        self.0 |= irq.mask();
    }

    #[inline]
    pub fn clear(&mut self, irq: Interrupt) {
        self.0 &= !irq.mask();
    }
}

impl Default for InterruptFlag {
    fn default() -> Self {
        Self::new()
    }
}
