//! Snapshot cursors.
//!
//! Components describe their state once, as a sequence of calls on a
//! [`StateIo`]. Saving runs that sequence against a [`StateWriter`], loading
//! runs the same sequence against a [`StateReader`], so the two directions
//! cannot drift apart. Both cursors can be shared by several components in a
//! row; each one picks up where the previous left off.

use crate::error::SnapshotError;

/// One direction of a snapshot transfer.
///
/// Writers copy the referenced value out; readers overwrite it.
pub trait StateIo {
    /// Single byte, 0 or 1. Only an exact 1 reads back as `true`.
    fn flag(&mut self, value: &mut bool);
    fn byte(&mut self, value: &mut u8);
    /// Little-endian.
    fn word(&mut self, value: &mut u16);
    /// Little-endian.
    fn dword(&mut self, value: &mut u32);
    /// Verbatim block.
    fn bytes(&mut self, buf: &mut [u8]);
}

/// Appends state to a growable buffer.
#[derive(Debug, Default)]
pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far, i.e. the offset the next component starts at.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl StateIo for StateWriter {
    fn flag(&mut self, value: &mut bool) {
        self.buf.push(u8::from(*value));
    }

    fn byte(&mut self, value: &mut u8) {
        self.buf.push(*value);
    }

    fn word(&mut self, value: &mut u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn dword(&mut self, value: &mut u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn bytes(&mut self, buf: &mut [u8]) {
        self.buf.extend_from_slice(buf);
    }
}

/// Reads state back from a caller-provided buffer.
///
/// Callers check [`StateReader::require`] for the full length of what they
/// are about to read before touching any live state. Individual reads past
/// the end leave the destination untouched.
#[derive(Debug)]
pub struct StateReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Fails unless at least `needed` bytes are left.
    pub fn require(&self, needed: usize) -> Result<(), SnapshotError> {
        let available = self.remaining();
        if available < needed {
            return Err(SnapshotError::Truncated { needed, available });
        }
        Ok(())
    }

    /// Bytes at `offset` past the cursor, without consuming them.
    pub fn peek(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let start = self.pos.checked_add(offset)?;
        buf.get(start..start.checked_add(len)?)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let slice = buf.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(slice)
    }
}

impl StateIo for StateReader<'_> {
    fn flag(&mut self, value: &mut bool) {
        if let Some(b) = self.take(1) {
            *value = b[0] == 1;
        }
    }

    fn byte(&mut self, value: &mut u8) {
        if let Some(b) = self.take(1) {
            *value = b[0];
        }
    }

    fn word(&mut self, value: &mut u16) {
        if let Some(b) = self.take(2) {
            *value = u16::from_le_bytes([b[0], b[1]]);
        }
    }

    fn dword(&mut self, value: &mut u32) {
        if let Some(b) = self.take(4) {
            *value = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        }
    }

    fn bytes(&mut self, buf: &mut [u8]) {
        if let Some(b) = self.take(buf.len()) {
            buf.copy_from_slice(b);
        }
    }
}
