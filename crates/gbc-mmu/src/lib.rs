//! Memory core for Game Boy / Game Boy Color emulation.
//!
//! Decodes CPU addresses into storage banks, collaborator register windows and
//! core-owned registers, and saves/restores the memory state. The CPU, PPU,
//! APU, timer, serial port and cartridge mappers plug in through the traits in
//! [`peripherals`].

/// Backing storage for every memory region.
pub mod banks;

/// Cartridge header decoding.
pub mod cartridge;

pub mod error;

/// Console models and fixed hardware constants.
pub mod hardware;

/// CGB VRAM DMA registers.
pub mod hdma;

pub mod interrupts;

/// Address decoding and the bus-facing API.
pub mod mmu;

pub mod peripherals;

pub mod registers;

pub mod state;

pub use cartridge::{MapperType, MbcType};
pub use error::{LoadError, SnapshotError};
pub use hardware::ConsoleMode;
pub use interrupts::Interrupt;
pub use mmu::Mmu;
pub use peripherals::{Mapper, Peripherals, PixelProcessor, RegisterPort};
pub use state::{StateIo, StateReader, StateWriter};
