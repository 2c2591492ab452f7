//! Register interface for the ring-buffer DMA write engine.
//!
//! The engine streams data into a circular buffer in memory and is controlled
//! through a small block of 32-bit registers. This crate describes that block
//! and exposes it as the [`DmaRegisters`] capability, so the protocol logic
//! that sits on top can run against real MMIO or a simulated backend.
//!
//! # Register map
//!
//! ```text
//! Offset  Name                     Access
//! 0x00    config                   rw    bit 0: enable
//! 0x04    interrupt_status         r/w1c sticky, write 1 to clear
//! 0x08    interrupt_mask           rw
//! 0x0C    buffer_start_address     rw
//! 0x10    buffer_end_address       rw    one past the last byte
//! 0x14    buffer_written_address   r     hardware write pointer
//! 0x18    buffer_read_address      rw    hardware may write up to here
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "sim")]
extern crate alloc;

mod interrupt;
mod mmio;
#[cfg(feature = "sim")]
mod sim;

pub use interrupt::InterruptStatus;
pub use mmio::MmioRegisters;
#[cfg(feature = "sim")]
pub use sim::{SimRegisters, SimState};

/// Byte offsets of each register within the register block.
pub mod offsets {
    pub const CONFIG: usize = 0x00;
    pub const INTERRUPT_STATUS: usize = 0x04;
    pub const INTERRUPT_MASK: usize = 0x08;
    pub const BUFFER_START_ADDRESS: usize = 0x0C;
    pub const BUFFER_END_ADDRESS: usize = 0x10;
    pub const BUFFER_WRITTEN_ADDRESS: usize = 0x14;
    pub const BUFFER_READ_ADDRESS: usize = 0x18;
}

/// Size of the register block in bytes.
pub const REGISTER_BLOCK_SIZE: usize = 0x1C;

/// `config` register: engine enable bit.
pub const CONFIG_ENABLE: u32 = 1 << 0;

/// Access to the engine's control and status registers.
///
/// All addresses are absolute bus addresses as seen by the engine. Methods
/// take `&mut self` because several reads have side effects in hardware or
/// in a simulation (status polling, read counters).
pub trait DmaRegisters {
    /// Set or clear the `enable` bit of the `config` register.
    fn set_enabled(&mut self, enabled: bool);

    /// Read the sticky interrupt status bits.
    fn interrupt_status(&mut self) -> InterruptStatus;

    /// Clear the given status bits (write-one-to-clear).
    fn clear_interrupt_status(&mut self, status: InterruptStatus);

    /// Select which status bits drive the interrupt line.
    fn set_interrupt_mask(&mut self, mask: InterruptStatus);

    /// Program the address of the first buffer byte.
    fn set_buffer_start_address(&mut self, address: u32);

    /// Program the address one past the last buffer byte.
    fn set_buffer_end_address(&mut self, address: u32);

    /// Read the hardware write pointer.
    fn buffer_written_address(&mut self) -> u32;

    /// Tell the engine it may overwrite memory up to `address`.
    fn set_buffer_read_address(&mut self, address: u32);
}

impl<T: DmaRegisters + ?Sized> DmaRegisters for &mut T {
    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn interrupt_status(&mut self) -> InterruptStatus {
        (**self).interrupt_status()
    }

    fn clear_interrupt_status(&mut self, status: InterruptStatus) {
        (**self).clear_interrupt_status(status)
    }

    fn set_interrupt_mask(&mut self, mask: InterruptStatus) {
        (**self).set_interrupt_mask(mask)
    }

    fn set_buffer_start_address(&mut self, address: u32) {
        (**self).set_buffer_start_address(address)
    }

    fn set_buffer_end_address(&mut self, address: u32) {
        (**self).set_buffer_end_address(address)
    }

    fn buffer_written_address(&mut self) -> u32 {
        (**self).buffer_written_address()
    }

    fn set_buffer_read_address(&mut self, address: u32) {
        (**self).set_buffer_read_address(address)
    }
}
