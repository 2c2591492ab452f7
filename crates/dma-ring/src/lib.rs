//! Zero-copy consumer for a hardware ring-buffer DMA write engine.
//!
//! The engine streams data into a fixed circular buffer on its own and
//! publishes how far it has written through a register. This crate finds new
//! data, hands it out as views into the buffer without copying, and tells the
//! engine when it may overwrite memory again.
//!
//! # Usage
//!
//! ```ignore
//! let buffer = unsafe { DmaBuffer::identity_mapped(memory, 64 * 1024)? };
//! let mut reader = RingBufferDmaReader::new(registers, buffer, ReaderConfig::new(64))?;
//! reader.setup_and_enable();
//!
//! loop {
//!     let response = reader.receive_data(64, 4096);
//!     if response.is_empty() {
//!         continue;
//!     }
//!     process(reader.data(&response)?);
//!     reader.done_with_data(response.num_bytes());
//! }
//! ```
//!
//! Faults (hardware error bits, misaligned lengths, over-release) go to an
//! [`AssertionHandler`]. The default [`PanicHandler`] panics.

#![cfg_attr(not(test), no_std)]

mod config;
mod error;
mod handler;
mod reader;
mod response;

pub use config::{DmaBuffer, ReaderConfig};
pub use dma_regs::{DmaRegisters, InterruptStatus};
pub use error::{Error, Result};
pub use handler::{AssertionHandler, PanicHandler};
pub use reader::RingBufferDmaReader;
pub use response::Response;
