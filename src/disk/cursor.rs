//! Mapped region and control-plane accessors
//!
//! [`Region`] owns the memory map and is the only place that touches the head
//! and tail cursors. Every access goes through a checked slice of the map, so
//! an offset error panics in tests instead of reading past the mapping.

use crate::disk::{Layout, HEAD_OFFSET, TAIL_OFFSET};
use memmap2::MmapMut;
use std::io;

/// A mapped ring buffer file
pub struct Region {
    /// Memory-mapped file
    mmap: MmapMut,
    /// Offset arithmetic for this capacity
    layout: Layout,
}

impl Region {
    /// Wrap a mapping whose length is the layout's capacity
    pub fn new(mmap: MmapMut, layout: Layout) -> Self {
        debug_assert_eq!(mmap.len(), layout.capacity() as usize);
        Self { mmap, layout }
    }

    /// The layout of this region
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Read both cursors as `(head, tail)`
    pub fn head_tail(&self) -> (u32, u32) {
        (self.read_u32(HEAD_OFFSET), self.read_u32(TAIL_OFFSET))
    }

    /// Overwrite the head cursor
    pub fn set_head(&mut self, head: u32) {
        self.write_u32(HEAD_OFFSET, head);
    }

    /// Overwrite the tail cursor
    pub fn set_tail(&mut self, tail: u32) {
        self.write_u32(TAIL_OFFSET, tail);
    }

    /// Read a little-endian u32 at `offset`
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.mmap[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Write a little-endian u32 at `offset`
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.mmap[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Copy `data` in starting at `offset`, wrapping at the end of the region
    ///
    /// Returns the offset following the last byte written.
    pub fn write_wrapped(&mut self, offset: u32, data: &[u8]) -> u32 {
        let (first, second) = self.layout.spans(offset, data.len() as u32);
        let split = first.len();

        self.mmap[first].copy_from_slice(&data[..split]);
        self.mmap[second].copy_from_slice(&data[split..]);

        self.layout.advance(offset, data.len() as u32)
    }

    /// Fill `out` from the region starting at `offset`, wrapping at the end
    ///
    /// Returns the offset following the last byte read.
    pub fn read_wrapped(&self, offset: u32, out: &mut [u8]) -> u32 {
        let (first, second) = self.layout.spans(offset, out.len() as u32);
        let split = first.len();

        out[..split].copy_from_slice(&self.mmap[first]);
        out[split..].copy_from_slice(&self.mmap[second]);

        self.layout.advance(offset, out.len() as u32)
    }

    /// Zero the whole region, header included
    pub fn zero(&mut self) {
        self.mmap.fill(0);
    }

    /// Synchronously flush the mapping to the backing file
    pub fn flush(&self) -> io::Result<()> {
        self.mmap.flush()
    }
}
