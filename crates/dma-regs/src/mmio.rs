//! Volatile access to a memory-mapped register block.

use core::ptr::{NonNull, read_volatile, write_volatile};

use log::trace;

use crate::{CONFIG_ENABLE, DmaRegisters, InterruptStatus, REGISTER_BLOCK_SIZE, offsets};

/// The engine's register block at a fixed address.
///
/// Every access is a single volatile 32-bit load or store, so the compiler
/// neither merges nor elides register traffic.
///
/// # Example
///
/// ```ignore
/// let regs = unsafe { MmioRegisters::new(NonNull::new(0x4000_0000 as *mut u8).unwrap()) };
/// ```
pub struct MmioRegisters {
    base: NonNull<u8>,
}

impl MmioRegisters {
    /// Wrap the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the engine's register block, mapped as device
    /// memory for at least [`REGISTER_BLOCK_SIZE`] bytes, 4-byte aligned, and
    /// not accessed through any other path while this value exists.
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    /// Address of the register block.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Read the register at the given byte offset.
    ///
    /// # Panics
    ///
    /// Panics if the offset is outside the register block or not word aligned.
    pub fn read(&self, offset: usize) -> u32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= REGISTER_BLOCK_SIZE,
            "register read out of bounds: {offset:#x}"
        );
        // SAFETY: offset checked above; `new` guarantees the block is mapped.
        unsafe { read_volatile(self.base.as_ptr().add(offset).cast::<u32>()) }
    }

    /// Write the register at the given byte offset.
    ///
    /// # Panics
    ///
    /// Panics if the offset is outside the register block or not word aligned.
    pub fn write(&mut self, offset: usize, value: u32) {
        assert!(
            offset % 4 == 0 && offset + 4 <= REGISTER_BLOCK_SIZE,
            "register write out of bounds: {offset:#x}"
        );
        // SAFETY: offset checked above; `new` guarantees the block is mapped.
        unsafe { write_volatile(self.base.as_ptr().add(offset).cast::<u32>(), value) }
    }
}

impl DmaRegisters for MmioRegisters {
    fn set_enabled(&mut self, enabled: bool) {
        let config = self.read(offsets::CONFIG);
        let config = if enabled {
            config | CONFIG_ENABLE
        } else {
            config & !CONFIG_ENABLE
        };
        self.write(offsets::CONFIG, config);
    }

    fn interrupt_status(&mut self) -> InterruptStatus {
        let raw = self.read(offsets::INTERRUPT_STATUS);
        trace!("interrupt_status = {raw:#x}");
        InterruptStatus::from_bits_truncate(raw)
    }

    fn clear_interrupt_status(&mut self, status: InterruptStatus) {
        self.write(offsets::INTERRUPT_STATUS, status.bits());
    }

    fn set_interrupt_mask(&mut self, mask: InterruptStatus) {
        self.write(offsets::INTERRUPT_MASK, mask.bits());
    }

    fn set_buffer_start_address(&mut self, address: u32) {
        self.write(offsets::BUFFER_START_ADDRESS, address);
    }

    fn set_buffer_end_address(&mut self, address: u32) {
        self.write(offsets::BUFFER_END_ADDRESS, address);
    }

    fn buffer_written_address(&mut self) -> u32 {
        self.read(offsets::BUFFER_WRITTEN_ADDRESS)
    }

    fn set_buffer_read_address(&mut self, address: u32) {
        self.write(offsets::BUFFER_READ_ADDRESS, address);
    }
}

// SAFETY: the block is exclusively owned by this value (see `new`).
unsafe impl Send for MmioRegisters {}
