use crate::state::StateIo;

/// Bytes moved per HDMA block.
pub const HDMA_BLOCK_SIZE: u16 = 0x10;

/// Transfer mode for CGB VRAM DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmaMode {
    /// General DMA (immediate)
    #[default]
    Gdma,
    /// HBlank DMA
    Hdma,
}

/// FF51-FF55 state. The copy loop itself lives in the router because it
/// needs bus access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdmaState {
    /// 16-bit source pointer (low nibble always clear)
    pub(crate) src: u16,
    /// Destination in VRAM (0x8000 | (dst & 0x1FF0))
    pub(crate) dst: u16,
    /// Remaining 0x10-byte blocks
    pub(crate) blocks: u8,
    pub(crate) mode: DmaMode,
    pub(crate) active: bool,
    /// Whether the previous transfer was explicitly cancelled (FF55 <- bit7 clear)
    pub(crate) cancelled: bool,
    /// CPU cycles still owed to completed transfers
    pub(crate) stall_cycles: u32,
}

impl HdmaState {
    pub fn new() -> Self {
        Self {
            src: 0,
            dst: sanitize_vram_dest(0),
            blocks: 0,
            mode: DmaMode::Gdma,
            active: false,
            cancelled: false,
            stall_cycles: 0,
        }
    }

    /// An HBlank transfer is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF51 => (self.src >> 8) as u8,
            0xFF52 => (self.src & 0x00F0) as u8,
            0xFF53 => ((self.dst & 0x1F00) >> 8) as u8,
            0xFF54 => (self.dst & 0x00F0) as u8,
            0xFF55 => {
                if self.active {
                    // Busy flag (bit 7) is cleared while the DMA is running.
                    self.blocks.saturating_sub(1) & 0x7F
                } else if self.cancelled {
                    0x80
                } else {
                    0xFF
                }
            }
            _ => 0xFF,
        }
    }

    /// Latch FF51-FF54. The address registers are frozen while a transfer runs.
    pub(crate) fn write_address(&mut self, addr: u16, val: u8) {
        if self.active {
            return;
        }
        match addr {
            0xFF51 => self.src = (val as u16) << 8 | (self.src & 0x00FF),
            0xFF52 => self.src = (self.src & 0xFF00) | (val & 0xF0) as u16,
            0xFF53 => {
                let raw = ((val & 0x1F) as u16) << 8 | (self.dst & 0x00F0);
                self.dst = sanitize_vram_dest(raw);
            }
            0xFF54 => {
                let raw = (self.dst & 0x1F00) | (val & 0xF0) as u16;
                self.dst = sanitize_vram_dest(raw);
            }
            _ => {}
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.active = false;
        self.blocks = 0;
        self.cancelled = true;
    }

    pub(crate) fn arm_hblank(&mut self, blocks: u8) {
        self.mode = DmaMode::Hdma;
        self.blocks = blocks;
        self.active = true;
        self.cancelled = false;
    }

    pub(crate) fn sync<S: StateIo>(&mut self, io: &mut S) {
        io.word(&mut self.src);
        io.word(&mut self.dst);
        io.byte(&mut self.blocks);
        let mut mode = match self.mode {
            DmaMode::Gdma => 0,
            DmaMode::Hdma => 1,
        };
        io.byte(&mut mode);
        self.mode = if mode == 1 {
            DmaMode::Hdma
        } else {
            DmaMode::Gdma
        };
        io.flag(&mut self.active);
        io.flag(&mut self.cancelled);
        io.dword(&mut self.stall_cycles);
        self.dst = sanitize_vram_dest(self.dst);
        self.src &= 0xFFF0;
    }
}

impl Default for HdmaState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes written by [`HdmaState::sync`].
pub(crate) const HDMA_STATE_LEN: usize = 2 + 2 + 1 + 1 + 1 + 1 + 4;

#[inline]
pub(crate) fn sanitize_vram_dest(addr: u16) -> u16 {
    0x8000 | (addr & 0x1FF0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateReader, StateWriter};

    #[test]
    fn destination_is_confined_to_vram() {
        let mut hdma = HdmaState::new();
        hdma.write_address(0xFF53, 0xFF);
        hdma.write_address(0xFF54, 0xFF);
        assert_eq!(hdma.dst, 0x9FF0);
    }

    #[test]
    fn addresses_frozen_while_active() {
        let mut hdma = HdmaState::new();
        hdma.write_address(0xFF51, 0xC0);
        hdma.arm_hblank(2);
        hdma.write_address(0xFF51, 0xD0);
        assert_eq!(hdma.read(0xFF51), 0xC0);
    }

    #[test]
    fn ff55_reports_remaining_then_idle() {
        let mut hdma = HdmaState::new();
        assert_eq!(hdma.read(0xFF55), 0xFF);
        hdma.arm_hblank(3);
        assert_eq!(hdma.read(0xFF55), 0x02);
        hdma.cancel();
        assert_eq!(hdma.read(0xFF55), 0x80);
    }

    #[test]
    fn sync_len_matches_constant() {
        let mut hdma = HdmaState::new();
        let mut w = StateWriter::new();
        hdma.sync(&mut w);
        assert_eq!(w.position(), HDMA_STATE_LEN);

        hdma.arm_hblank(5);
        let mut w = StateWriter::new();
        hdma.sync(&mut w);
        let bytes = w.into_bytes();
        let mut restored = HdmaState::new();
        restored.sync(&mut StateReader::new(&bytes));
        assert_eq!(restored, hdma);
    }
}
