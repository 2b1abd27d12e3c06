use std::fmt::{self, Write as _};
use std::path::Path;

use gbc_mmu::{
    ConsoleMode, LoadError, MapperType, Mmu, Peripherals, SnapshotError, StateReader,
    cartridge,
    mmu::{EXTENDED_STATE_MAGIC, EXTENDED_TRAILER_LEN, LEGACY_STATE_LEN},
};
use log::info;
use thiserror::Error;

use crate::config::{ConsoleSelect, ProbeConfig};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, ProbeError> {
    std::fs::read(path).map_err(|source| ProbeError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ProbeError> {
    std::fs::write(path, bytes).map_err(|source| ProbeError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn resolve_mode(select: ConsoleSelect, rom: &[u8]) -> ConsoleMode {
    match select {
        ConsoleSelect::Dmg => ConsoleMode::Dmg,
        ConsoleSelect::Cgb => ConsoleMode::Cgb,
        ConsoleSelect::Auto if cartridge::cgb_supported(rom) => ConsoleMode::Cgb,
        ConsoleSelect::Auto => ConsoleMode::Dmg,
    }
}

/// Build a detached memory map around `rom`, with a boot ROM if one is
/// configured for the resulting model.
pub fn open(
    rom: &[u8],
    select: ConsoleSelect,
    bootrom: Option<&Path>,
    cfg: &ProbeConfig,
) -> Result<Mmu, ProbeError> {
    let mode = resolve_mode(select, rom);
    let mut mmu = Mmu::new(mode, Peripherals::detached());

    let bootrom = bootrom.or_else(|| cfg.bootrom_path(mode.is_cgb()));
    if let Some(path) = bootrom {
        let image = read_file(path)?;
        mmu.load_bios(&image, mode)?;
    }

    let mapper = MapperType::from_header(rom);
    mmu.load_rom(rom, rom.len(), mapper)?;
    mmu.ensure_loaded()?;
    info!(
        "\"{}\" opened in {mode} mode ({} bytes, {:?}{})",
        cartridge::title(rom),
        rom.len(),
        mapper.mbc(),
        capabilities(mapper)
    );
    Ok(mmu)
}

/// Header capabilities as a `+RAM+BATTERY` style suffix.
pub fn capabilities(mapper: MapperType) -> String {
    [
        (mapper.has_ram(), "+RAM"),
        (mapper.has_battery(), "+BATTERY"),
        (mapper.has_rtc(), "+RTC"),
        (mapper.has_rumble(), "+RUMBLE"),
    ]
    .into_iter()
    .filter_map(|(present, tag)| present.then_some(tag))
    .collect()
}

/// Restore a snapshot file, extended if it carries the trailer.
pub fn restore(mmu: &mut Mmu, bytes: &[u8]) -> Result<usize, ProbeError> {
    let mut reader = StateReader::new(bytes);
    let consumed = if SnapshotSummary::parse(bytes)?.extended.is_some() {
        mmu.load_extended_state(&mut reader)?
    } else {
        mmu.load_state(&mut reader)?
    };
    Ok(consumed)
}

/// Hex dump through `peek_byte`, `width` bytes per line.
pub fn format_dump(mmu: &Mmu, start: u16, len: usize, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::new();
    let end = (start as usize + len).min(0x10000);
    let mut line = start as usize;
    while line < end {
        let _ = write!(out, "{line:04X}:");
        for addr in line..(line + width).min(end) {
            let _ = write!(out, " {:02X}", mmu.peek_byte(addr as u16));
        }
        out.push('\n');
        line += width;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub len: usize,
    pub boot_overlay: bool,
    pub lagged: bool,
    pub start_pressed: bool,
    /// Model recorded in the extended trailer, if there is one.
    pub extended: Option<ConsoleMode>,
}

impl SnapshotSummary {
    pub fn parse(bytes: &[u8]) -> Result<Self, SnapshotError> {
        StateReader::new(bytes).require(LEGACY_STATE_LEN)?;
        let trailer = &bytes[LEGACY_STATE_LEN..];
        let extended = if trailer.len() >= EXTENDED_TRAILER_LEN
            && trailer.starts_with(EXTENDED_STATE_MAGIC)
        {
            Some(match trailer[EXTENDED_STATE_MAGIC.len()] {
                1 => ConsoleMode::Cgb,
                _ => ConsoleMode::Dmg,
            })
        } else {
            None
        };
        Ok(Self {
            len: bytes.len(),
            boot_overlay: bytes[0] == 1,
            lagged: bytes[1] == 1,
            start_pressed: bytes[2] == 1,
            extended,
        })
    }
}

impl fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "size:          {} bytes", self.len)?;
        writeln!(f, "boot overlay:  {}", self.boot_overlay)?;
        writeln!(f, "lagged:        {}", self.lagged)?;
        writeln!(f, "start pressed: {}", self.start_pressed)?;
        match self.extended {
            Some(mode) => write!(f, "extended:      yes ({mode})"),
            None => write!(f, "extended:      no"),
        }
    }
}
