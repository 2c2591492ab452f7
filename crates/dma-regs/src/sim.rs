//! Simulated register block and write engine.
//!
//! [`SimRegisters`] is a cheap cloneable handle: hand one clone to the code
//! under test and keep another to play the hardware side.

use alloc::sync::Arc;
use core::ops::DerefMut;

use log::trace;
use spinning_top::Spinlock;

use crate::{DmaRegisters, InterruptStatus};

/// Register contents and bookkeeping of the simulated engine.
#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub packet_length: u32,
    pub enabled: bool,
    pub interrupt_status: InterruptStatus,
    pub interrupt_mask: InterruptStatus,
    pub start_address: u32,
    pub end_address: u32,
    pub written_address: u32,
    pub read_address: u32,
    /// Number of `buffer_written_address` reads.
    pub written_address_reads: usize,
    /// Number of `interrupt_status` reads.
    pub status_reads: usize,
}

impl SimState {
    fn buffer_size(&self) -> u32 {
        self.end_address.saturating_sub(self.start_address)
    }

    /// Bytes written by the engine that have not been released back to it.
    pub fn unreleased_bytes(&self) -> u32 {
        let size = self.buffer_size();
        if size == 0 {
            return 0;
        }
        let written = self.written_address.wrapping_sub(self.start_address) % size;
        let read = self.read_address.wrapping_sub(self.start_address) % size;
        (written + size - read) % size
    }

    /// Bytes the engine may still write before it would catch up with the
    /// release pointer. One packet is always kept free so that a full buffer
    /// is distinguishable from an empty one.
    pub fn free_bytes(&self) -> u32 {
        self.buffer_size()
            .saturating_sub(self.packet_length)
            .saturating_sub(self.unreleased_bytes())
    }

    fn check_aligned(&mut self, address: u32, bit: InterruptStatus) {
        if self.packet_length != 0 && address % self.packet_length != 0 {
            self.interrupt_status |= bit;
        }
    }
}

/// Shared handle onto a simulated register block.
#[derive(Debug, Clone)]
pub struct SimRegisters {
    state: Arc<Spinlock<SimState>>,
}

impl SimRegisters {
    /// Create a disabled engine that writes in units of `packet_length`.
    pub fn new(packet_length: u32) -> Self {
        assert!(packet_length > 0, "packet length must be > 0");
        Self {
            state: Arc::new(Spinlock::new(SimState {
                packet_length,
                ..SimState::default()
            })),
        }
    }

    /// Lock the state for inspection or direct manipulation.
    pub fn state(&self) -> impl DerefMut<Target = SimState> + '_ {
        self.state.lock()
    }

    /// Set status bits as the engine would on an event.
    pub fn raise(&self, status: InterruptStatus) {
        self.state.lock().interrupt_status |= status;
    }

    /// Force the hardware write pointer, bypassing the free-space check.
    pub fn set_written_address(&self, address: u32) {
        self.state.lock().written_address = address;
    }

    /// Let the engine write up to `num_bytes`.
    ///
    /// Returns how many bytes were actually written, which is limited by the
    /// free space and rounded down to whole packets.
    pub fn produce(&self, num_bytes: u32) -> u32 {
        self.produce_with(num_bytes, |_, _| {})
    }

    /// Like [`produce`](Self::produce), but first calls `fill(offset, len)`
    /// for each contiguous span about to be written, so a test can place
    /// payload bytes in the buffer memory. At most two spans are reported.
    pub fn produce_with(&self, num_bytes: u32, mut fill: impl FnMut(usize, usize)) -> u32 {
        let mut state = self.state.lock();
        let size = state.buffer_size();
        if !state.enabled || size == 0 {
            return 0;
        }

        let n = num_bytes.min(state.free_bytes());
        let n = n - n % state.packet_length;
        if n == 0 {
            return 0;
        }

        let offset = state.written_address.wrapping_sub(state.start_address) % size;
        let first = n.min(size - offset);
        fill(offset as usize, first as usize);
        if first < n {
            fill(0, (n - first) as usize);
        }

        state.written_address = state.start_address + (offset + n) % size;
        state.interrupt_status |= InterruptStatus::WRITE_DONE;
        trace!("sim engine wrote {n} bytes, written_address = {:#x}", state.written_address);
        n
    }
}

impl DmaRegisters for SimRegisters {
    fn set_enabled(&mut self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    fn interrupt_status(&mut self) -> InterruptStatus {
        let mut state = self.state.lock();
        state.status_reads += 1;
        state.interrupt_status
    }

    fn clear_interrupt_status(&mut self, status: InterruptStatus) {
        self.state.lock().interrupt_status.remove(status);
    }

    fn set_interrupt_mask(&mut self, mask: InterruptStatus) {
        self.state.lock().interrupt_mask = mask;
    }

    fn set_buffer_start_address(&mut self, address: u32) {
        let mut state = self.state.lock();
        state.check_aligned(address, InterruptStatus::START_ADDRESS_UNALIGNED);
        state.start_address = address;
        state.written_address = address;
    }

    fn set_buffer_end_address(&mut self, address: u32) {
        let mut state = self.state.lock();
        state.check_aligned(address, InterruptStatus::END_ADDRESS_UNALIGNED);
        state.end_address = address;
    }

    fn buffer_written_address(&mut self) -> u32 {
        let mut state = self.state.lock();
        state.written_address_reads += 1;
        state.written_address
    }

    fn set_buffer_read_address(&mut self, address: u32) {
        let mut state = self.state.lock();
        state.check_aligned(address, InterruptStatus::READ_ADDRESS_UNALIGNED);
        state.read_address = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(size: u32) -> SimRegisters {
        let mut regs = SimRegisters::new(64);
        regs.set_buffer_start_address(0x1000);
        regs.set_buffer_end_address(0x1000 + size);
        regs.set_buffer_read_address(0x1000);
        regs.set_enabled(true);
        regs
    }

    #[test]
    fn disabled_engine_writes_nothing() {
        let regs = SimRegisters::new(64);
        assert_eq!(regs.produce(256), 0);
    }

    #[test]
    fn produce_rounds_down_to_packets() {
        let regs = engine(4096);
        assert_eq!(regs.produce(200), 192);
        assert_eq!(regs.state().written_address, 0x1000 + 192);
        assert!(regs.state().interrupt_status.write_done());
    }

    #[test]
    fn full_buffer_keeps_one_packet_free() {
        let regs = engine(4096);
        assert_eq!(regs.produce(8192), 4096 - 64);
        assert_eq!(regs.produce(64), 0);
        assert_eq!(regs.state().free_bytes(), 0);
    }

    #[test]
    fn produce_wraps_and_reports_two_spans() {
        let mut regs = engine(1024);
        assert_eq!(regs.produce(960), 960);
        regs.set_buffer_read_address(0x1000 + 960);

        let mut spans = Vec::new();
        assert_eq!(regs.produce_with(192, |off, len| spans.push((off, len))), 192);
        assert_eq!(spans, vec![(960, 64), (0, 128)]);
        assert_eq!(regs.state().written_address, 0x1000 + 128);
    }

    #[test]
    fn status_is_write_one_to_clear() {
        let mut regs = engine(1024);
        regs.raise(InterruptStatus::WRITE_DONE | InterruptStatus::WRITE_ERROR);
        regs.clear_interrupt_status(InterruptStatus::WRITE_DONE);
        assert_eq!(regs.interrupt_status(), InterruptStatus::WRITE_ERROR);
        assert_eq!(regs.state().status_reads, 1);
    }

    #[test]
    fn unaligned_start_address_raises_error_bit() {
        let mut regs = SimRegisters::new(64);
        regs.set_buffer_start_address(0x1020);
        assert_eq!(
            regs.interrupt_status(),
            InterruptStatus::START_ADDRESS_UNALIGNED
        );
    }

    #[test]
    fn unaligned_end_address_raises_error_bit() {
        let mut regs = SimRegisters::new(64);
        regs.set_buffer_start_address(0x1000);
        regs.set_buffer_end_address(0x1410);
        assert_eq!(
            regs.interrupt_status(),
            InterruptStatus::END_ADDRESS_UNALIGNED
        );
    }

    #[test]
    fn unaligned_read_address_raises_error_bit() {
        let mut regs = engine(1024);
        regs.set_buffer_read_address(0x1010);
        assert!(
            regs.interrupt_status()
                .contains(InterruptStatus::READ_ADDRESS_UNALIGNED)
        );
    }
}
