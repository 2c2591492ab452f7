//! Faults reported by the ring-buffer reader.

use dma_regs::InterruptStatus;
use thiserror::Error;

/// Everything that can go wrong while driving the engine.
///
/// Apart from [`Error::StaleResponse`], every variant is a fault that is
/// routed through the reader's [`AssertionHandler`](crate::AssertionHandler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Packet length of zero.
    #[error("packet length must be non-zero")]
    InvalidPacketLength,
    /// Buffer of zero bytes.
    #[error("buffer must not be empty")]
    EmptyBuffer,
    /// Buffer size is not a whole number of packets.
    #[error("buffer size {size} is not a multiple of the packet length {packet_length}")]
    BufferSizeUnaligned { size: usize, packet_length: usize },
    /// Buffer bus address is not packet aligned.
    #[error("buffer address {address:#x} is not aligned to the packet length {packet_length}")]
    BufferAddressUnaligned { address: u32, packet_length: usize },
    /// Buffer does not fit the engine's 32-bit address space.
    #[error("buffer at {address:#x} with {size} bytes exceeds the 32-bit address space")]
    BufferAddressOverflow { address: u64, size: usize },
    /// The engine raised error-class interrupt bits.
    #[error("DMA engine reported error status {0:?}")]
    HardwareError(InterruptStatus),
    /// The hardware write pointer lies outside the buffer.
    #[error("written address {address:#x} is outside the buffer {start:#x}..={end:#x}")]
    WrittenAddressOutOfRange { address: u32, start: u32, end: u32 },
    /// The hardware write pointer is not packet aligned.
    #[error("written address {address:#x} is not aligned to the packet length {packet_length}")]
    WrittenAddressUnaligned { address: u32, packet_length: usize },
    /// A byte count passed in is not a whole number of packets.
    #[error("{num_bytes} bytes is not a multiple of the packet length {packet_length}")]
    UnalignedLength { num_bytes: usize, packet_length: usize },
    /// Minimum receive length above the maximum.
    #[error("minimum of {min} bytes exceeds maximum of {max} bytes")]
    InvalidRange { min: usize, max: usize },
    /// Tried to release more than has been handed out.
    #[error("cannot release {num_bytes} bytes, only {outstanding} bytes are outstanding")]
    ReleaseExceedsOutstanding { num_bytes: usize, outstanding: usize },
    /// The response's bytes were released or reset and may be overwritten.
    #[error("response refers to memory that has been released")]
    StaleResponse,
}

pub type Result<T> = core::result::Result<T, Error>;
