use thiserror::Error;

use crate::hardware::ConsoleMode;

/// Problems detected while loading images, before emulation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("{mode} boot ROM must be {expected} bytes, got {actual}")]
    BiosLength {
        mode: ConsoleMode,
        expected: usize,
        actual: usize,
    },

    #[error("{bios} boot ROM cannot be used on a {console} memory map")]
    BiosModeMismatch {
        bios: ConsoleMode,
        console: ConsoleMode,
    },

    #[error("ROM length {declared} does not match image size {actual}")]
    RomLength { declared: usize, actual: usize },

    #[error("ROM image is empty")]
    EmptyRom,

    #[error("no ROM loaded")]
    RomMissing,
}

/// Problems detected while restoring a snapshot. State is untouched when any
/// of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot truncated: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("extended snapshot block has an unrecognised header")]
    BadMagic,

    #[error("snapshot was taken on a {saved} but this is a {current}")]
    ModelMismatch {
        saved: ConsoleMode,
        current: ConsoleMode,
    },
}
