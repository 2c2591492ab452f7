//! Reader configuration and the description of the caller-owned buffer.

use core::ptr::NonNull;

use dma_regs::InterruptStatus;

use crate::{Error, error::Result};

/// Static parameters of the engine and how the reader drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Alignment granularity, in bytes, of every address and length the
    /// engine deals with.
    pub packet_length: usize,
    /// Status bits that should raise the engine's interrupt line.
    pub interrupt_mask: InterruptStatus,
}

impl ReaderConfig {
    /// Configuration for an engine with the given packet length and no
    /// interrupts enabled.
    pub const fn new(packet_length: usize) -> Self {
        Self {
            packet_length,
            interrupt_mask: InterruptStatus::empty(),
        }
    }

    /// Enable the interrupt line for the given status bits.
    pub const fn with_interrupt_mask(mut self, mask: InterruptStatus) -> Self {
        self.interrupt_mask = mask;
        self
    }

    /// Check that `buffer` can be used by an engine with this configuration.
    pub fn validate(&self, buffer: &DmaBuffer) -> Result<()> {
        let packet_length = self.packet_length;
        if packet_length == 0 {
            return Err(Error::InvalidPacketLength);
        }
        if buffer.size_bytes == 0 {
            return Err(Error::EmptyBuffer);
        }
        if buffer.size_bytes % packet_length != 0 {
            return Err(Error::BufferSizeUnaligned {
                size: buffer.size_bytes,
                packet_length,
            });
        }
        if buffer.bus_address as usize % packet_length != 0 {
            return Err(Error::BufferAddressUnaligned {
                address: buffer.bus_address,
                packet_length,
            });
        }
        buffer.end_address().map(|_| ())
    }
}

/// Memory region the engine writes into.
///
/// The reader never allocates or frees it; it only hands out views.
#[derive(Debug, Clone, Copy)]
pub struct DmaBuffer {
    cpu: NonNull<u8>,
    bus_address: u32,
    size_bytes: usize,
}

impl DmaBuffer {
    /// Describe a buffer seen by the CPU at `cpu` and by the engine at
    /// `bus_address`.
    ///
    /// # Safety
    ///
    /// `cpu` must be valid for reads of `size_bytes` bytes for as long as any
    /// reader built on this buffer exists, and `bus_address` must be where
    /// the engine sees the same memory.
    pub const unsafe fn new(cpu: NonNull<u8>, bus_address: u32, size_bytes: usize) -> Self {
        Self {
            cpu,
            bus_address,
            size_bytes,
        }
    }

    /// Describe a buffer whose CPU address is also its bus address, as on a
    /// bare-metal system without an IOMMU.
    ///
    /// # Safety
    ///
    /// Same requirements as [`DmaBuffer::new`].
    pub unsafe fn identity_mapped(cpu: NonNull<u8>, size_bytes: usize) -> Result<Self> {
        let address = cpu.as_ptr() as usize as u64;
        let bus_address = u32::try_from(address).map_err(|_| Error::BufferAddressOverflow {
            address,
            size: size_bytes,
        })?;
        // SAFETY: forwarded to the caller.
        Ok(unsafe { Self::new(cpu, bus_address, size_bytes) })
    }

    /// CPU address of the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.cpu.as_ptr()
    }

    pub(crate) fn cpu(&self) -> NonNull<u8> {
        self.cpu
    }

    /// Address of the first byte as seen by the engine.
    pub fn bus_address(&self) -> u32 {
        self.bus_address
    }

    /// Size of the buffer in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Bus address one past the last byte.
    pub fn end_address(&self) -> Result<u32> {
        u32::try_from(self.size_bytes)
            .ok()
            .and_then(|size| self.bus_address.checked_add(size))
            .ok_or(Error::BufferAddressOverflow {
                address: self.bus_address as u64,
                size: self.size_bytes,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(bus_address: u32, size_bytes: usize) -> DmaBuffer {
        unsafe { DmaBuffer::new(NonNull::dangling(), bus_address, size_bytes) }
    }

    #[test]
    fn accepts_aligned_buffer() {
        let config = ReaderConfig::new(64);
        assert_eq!(config.validate(&buffer(0x1000, 4096)), Ok(()));
        assert_eq!(buffer(0x1000, 4096).end_address(), Ok(0x2000));
    }

    #[test]
    fn rejects_zero_packet_length() {
        let config = ReaderConfig::new(0);
        assert_eq!(
            config.validate(&buffer(0x1000, 4096)),
            Err(Error::InvalidPacketLength)
        );
    }

    #[test]
    fn rejects_empty_buffer() {
        assert_eq!(
            ReaderConfig::new(64).validate(&buffer(0x1000, 0)),
            Err(Error::EmptyBuffer)
        );
    }

    #[test]
    fn rejects_partial_packet_size() {
        assert_eq!(
            ReaderConfig::new(64).validate(&buffer(0x1000, 4000)),
            Err(Error::BufferSizeUnaligned {
                size: 4000,
                packet_length: 64
            })
        );
    }

    #[test]
    fn rejects_unaligned_address() {
        assert_eq!(
            ReaderConfig::new(64).validate(&buffer(0x1020, 4096)),
            Err(Error::BufferAddressUnaligned {
                address: 0x1020,
                packet_length: 64
            })
        );
    }

    #[test]
    fn rejects_buffer_past_4g() {
        let config = ReaderConfig::new(64);
        assert!(matches!(
            config.validate(&buffer(0xFFFF_F000, 8192)),
            Err(Error::BufferAddressOverflow { .. })
        ));
    }

    #[test]
    fn identity_mapped_low_address() {
        let cpu = NonNull::new(0x1000 as *mut u8).unwrap();
        let buffer = unsafe { DmaBuffer::identity_mapped(cpu, 64) }.unwrap();
        assert_eq!(buffer.bus_address(), 0x1000);
        assert_eq!(buffer.size_bytes(), 64);
        assert_eq!(buffer.as_ptr(), 0x1000 as *const u8);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn identity_mapped_rejects_address_above_4g() {
        let cpu = NonNull::new(0x1_0000_0000_usize as *mut u8).unwrap();
        assert_eq!(
            unsafe { DmaBuffer::identity_mapped(cpu, 64) }.err(),
            Some(Error::BufferAddressOverflow {
                address: 0x1_0000_0000,
                size: 64
            })
        );
    }

    #[test]
    fn interrupt_mask_builder() {
        let config = ReaderConfig::new(64).with_interrupt_mask(InterruptStatus::ERRORS);
        assert_eq!(config.interrupt_mask, InterruptStatus::ERRORS);
        assert_eq!(config.packet_length, 64);
    }
}
