//! The consumer side of the ring-buffer protocol.
//!
//! Three cursors split the buffer, all as offsets from its start:
//!
//! ```text
//!   done_offset      outstanding_offset      written (hardware)
//!        |-- handed out --|------ available ------|---- free ----|
//! ```
//!
//! The engine only writes into the free region, the caller only reads the
//! handed-out region, so neither side needs a lock. Ordering between the two
//! is carried by fences around the register accesses.

use core::slice;
use core::sync::atomic::{Ordering, fence};

use dma_regs::DmaRegisters;
use log::{debug, error, info, trace, warn};

use crate::{
    AssertionHandler, DmaBuffer, Error, PanicHandler, ReaderConfig, Response, error::Result,
};

/// Zero-copy reader for a buffer filled by the DMA write engine.
///
/// Data is handed out with [`receive_data`](Self::receive_data) and must
/// eventually be given back, in order, with
/// [`done_with_data`](Self::done_with_data) before the engine may write
/// there again.
pub struct RingBufferDmaReader<R, H = PanicHandler> {
    registers: R,
    handler: H,
    buffer: DmaBuffer,
    config: ReaderConfig,
    start_address: u32,
    end_address: u32,
    enabled: bool,
    /// Data before this offset has been handed out.
    outstanding_offset: usize,
    /// Data before this offset has been released to the engine.
    done_offset: usize,
    /// Bytes handed out since the last clear.
    received_total: u64,
    /// Bytes released since the last clear.
    released_total: u64,
    /// Bumped on every clear so that earlier responses go stale.
    epoch: u32,
}

impl<R: DmaRegisters> RingBufferDmaReader<R> {
    /// Create a reader that panics on faults.
    pub fn new(registers: R, buffer: DmaBuffer, config: ReaderConfig) -> Result<Self> {
        Self::with_handler(registers, buffer, config, PanicHandler)
    }
}

impl<R: DmaRegisters, H: AssertionHandler> RingBufferDmaReader<R, H> {
    /// Create a reader that reports faults to `handler`.
    ///
    /// An invalid configuration is passed to the handler and, if it returns,
    /// also returned as the error.
    pub fn with_handler(
        registers: R,
        buffer: DmaBuffer,
        config: ReaderConfig,
        mut handler: H,
    ) -> Result<Self> {
        let end_address = match config.validate(&buffer).and_then(|()| buffer.end_address()) {
            Ok(end_address) => end_address,
            Err(err) => {
                error!("invalid DMA ring configuration: {err}");
                handler.assertion_failed(&err);
                return Err(err);
            }
        };

        Ok(Self {
            registers,
            handler,
            start_address: buffer.bus_address(),
            end_address,
            buffer,
            config,
            enabled: false,
            outstanding_offset: 0,
            done_offset: 0,
            received_total: 0,
            released_total: 0,
            epoch: 0,
        })
    }

    /// Program the buffer bounds and start the engine.
    ///
    /// Meant to be called once. Calling it again while data is flowing is
    /// not supported.
    pub fn setup_and_enable(&mut self) {
        info!(
            "enabling DMA ring at {:#x}..{:#x} ({} bytes, {} byte packets)",
            self.start_address,
            self.end_address,
            self.buffer.size_bytes(),
            self.config.packet_length
        );
        let read_address = self.address_of(self.done_offset);
        self.registers.set_buffer_start_address(self.start_address);
        self.registers.set_buffer_end_address(self.end_address);
        self.registers.set_buffer_read_address(read_address);
        self.registers.set_interrupt_mask(self.config.interrupt_mask);
        self.registers.set_enabled(true);
        self.enabled = true;
    }

    /// Stop the engine. Data already in the buffer stays readable.
    pub fn disable(&mut self) {
        info!("disabling DMA ring");
        self.registers.set_enabled(false);
        self.enabled = false;
    }

    /// Read and clear the interrupt status.
    ///
    /// Returns whether the engine has written data since the last check.
    /// Error bits are reported to the assertion handler. The bits are cleared
    /// by reading them, so every call consumes the status.
    pub fn check_status(&mut self) -> bool {
        let result = self.poll_status();
        self.or_fault(result, false)
    }

    /// Number of bytes written by the engine and not yet handed out.
    ///
    /// This costs a register read. Prefer calling
    /// [`receive_data`](Self::receive_data) with a range and looking at what
    /// comes back over polling this first.
    pub fn get_num_bytes_available(&mut self) -> usize {
        let result = self.written_offset().map(|written| self.available_from(written));
        self.or_fault(result, 0)
    }

    /// Receive everything available, up to the end of the buffer.
    pub fn receive_all_data(&mut self) -> Response {
        self.receive_data(0, self.buffer.size_bytes())
    }

    /// Hand out between `min_num_bytes` and `max_num_bytes` of new data.
    ///
    /// Returns an empty response if fewer than `min_num_bytes` are available.
    /// Both limits must be multiples of the packet length.
    ///
    /// The returned span never crosses the end of the buffer. When the data
    /// wraps around, the response stops at the end and may be shorter than
    /// `min_num_bytes` even though more is available; always check
    /// [`Response::num_bytes`].
    ///
    /// Every non-empty response must later be released with
    /// [`done_with_data`](Self::done_with_data).
    pub fn receive_data(&mut self, min_num_bytes: usize, max_num_bytes: usize) -> Response {
        let result = self.try_receive(min_num_bytes, max_num_bytes);
        self.or_fault(result, Response::EMPTY)
    }

    /// Give the oldest `num_bytes` handed-out bytes back to the engine.
    ///
    /// Responses covering those bytes go stale.
    pub fn done_with_data(&mut self, num_bytes: usize) {
        let result = self.try_release(num_bytes);
        self.or_fault(result, ())
    }

    /// Release the whole buffer to the engine and forget all handed-out data.
    ///
    /// The cursors collapse onto the current hardware write pointer, so data
    /// already written but not yet received is discarded too. Any response
    /// still in use becomes stale and its memory may be overwritten at once.
    pub fn clear_all_data(&mut self) {
        let result = self.try_clear();
        self.or_fault(result, ())
    }

    /// The bytes of a response, as long as they are still handed out.
    pub fn data(&self, response: &Response) -> Result<&[u8]> {
        let Some(ptr) = response.data else {
            return Ok(&[]);
        };
        let stale = response.epoch != self.epoch
            || response.position < self.released_total
            || response.offset + response.num_bytes > self.buffer.size_bytes()
            || self.buffer.as_ptr().wrapping_add(response.offset) != ptr.as_ptr().cast_const();
        if stale {
            return Err(Error::StaleResponse);
        }

        // SAFETY: the span lies inside the buffer (checked above) and is
        // outstanding, so the engine will not write it until it is released,
        // which needs `&mut self`.
        Ok(unsafe { slice::from_raw_parts(ptr.as_ptr(), response.num_bytes) })
    }

    /// Bytes handed out and not yet released.
    pub fn outstanding_bytes(&self) -> usize {
        (self.received_total - self.released_total) as usize
    }

    /// Offset up to which data has been handed out.
    pub fn outstanding_offset(&self) -> usize {
        self.outstanding_offset
    }

    /// Offset up to which data has been released to the engine.
    pub fn done_offset(&self) -> usize {
        self.done_offset
    }

    /// Size of the ring buffer in bytes.
    pub fn buffer_size_bytes(&self) -> usize {
        self.buffer.size_bytes()
    }

    /// Alignment granularity of every length passed in or out.
    pub fn packet_length(&self) -> usize {
        self.config.packet_length
    }

    /// Whether [`setup_and_enable`](Self::setup_and_enable) has started the engine.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The register backend.
    pub fn registers(&self) -> &R {
        &self.registers
    }

    /// Mutable access to the register backend.
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    /// Consume the reader and hand back the register backend.
    pub fn into_registers(self) -> R {
        self.registers
    }

    fn try_receive(&mut self, min_num_bytes: usize, max_num_bytes: usize) -> Result<Response> {
        // Hardware errors are reported ahead of argument errors.
        self.poll_status()?;
        self.check_length(min_num_bytes)?;
        self.check_length(max_num_bytes)?;
        if min_num_bytes > max_num_bytes {
            return Err(Error::InvalidRange {
                min: min_num_bytes,
                max: max_num_bytes,
            });
        }

        let written = self.written_offset()?;
        let available = self.available_from(written);
        if available < min_num_bytes {
            trace!("{available} bytes available, want at least {min_num_bytes}");
            return Ok(Response::EMPTY);
        }

        let offset = self.outstanding_offset;
        let size = self.buffer.size_bytes();
        let num_bytes = available.min(max_num_bytes).min(size - offset);
        // Both the buffer end and every cursor are packet aligned.
        debug_assert_eq!(num_bytes % self.config.packet_length, 0);
        if num_bytes == 0 {
            return Ok(Response::EMPTY);
        }

        // SAFETY: offset < size, so the pointer stays inside the buffer.
        let data = unsafe { self.buffer.cpu().add(offset) };
        let response = Response {
            num_bytes,
            data: Some(data),
            offset,
            position: self.received_total,
            epoch: self.epoch,
        };

        self.outstanding_offset = (offset + num_bytes) % size;
        self.received_total += num_bytes as u64;
        debug!(
            "handed out {num_bytes} bytes at offset {offset:#x} ({available} were available, {} outstanding)",
            self.outstanding_bytes()
        );
        Ok(response)
    }

    fn try_release(&mut self, num_bytes: usize) -> Result<()> {
        self.check_length(num_bytes)?;
        let outstanding = self.outstanding_bytes();
        if num_bytes > outstanding {
            return Err(Error::ReleaseExceedsOutstanding {
                num_bytes,
                outstanding,
            });
        }
        if num_bytes == 0 {
            return Ok(());
        }

        self.done_offset = (self.done_offset + num_bytes) % self.buffer.size_bytes();
        self.released_total += num_bytes as u64;
        debug!(
            "released {num_bytes} bytes, done offset now {:#x}",
            self.done_offset
        );
        self.release_up_to(self.done_offset);
        Ok(())
    }

    fn try_clear(&mut self) -> Result<()> {
        let written = self.written_offset()?;
        warn!(
            "clearing DMA ring: dropping {} outstanding and {} unread bytes",
            self.outstanding_bytes(),
            self.available_from(written)
        );

        self.outstanding_offset = written;
        self.done_offset = written;
        self.received_total = 0;
        self.released_total = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.release_up_to(written);
        Ok(())
    }

    fn poll_status(&mut self) -> Result<bool> {
        let status = self.registers.interrupt_status();
        trace!("interrupt status {status:?}");
        if !status.is_empty() {
            self.registers.clear_interrupt_status(status);
        }
        if status.has_errors() {
            return Err(Error::HardwareError(status.errors()));
        }
        Ok(status.write_done())
    }

    /// Read the hardware write pointer as a buffer offset.
    fn written_offset(&mut self) -> Result<usize> {
        let address = self.registers.buffer_written_address();
        // Buffer reads justified by this pointer must not move above it.
        fence(Ordering::Acquire);
        trace!("buffer written address {address:#x}");

        if address < self.start_address || address > self.end_address {
            return Err(Error::WrittenAddressOutOfRange {
                address,
                start: self.start_address,
                end: self.end_address,
            });
        }
        let offset = (address - self.start_address) as usize;
        if offset % self.config.packet_length != 0 {
            return Err(Error::WrittenAddressUnaligned {
                address,
                packet_length: self.config.packet_length,
            });
        }
        // The end address is the same position as the start.
        Ok(offset % self.buffer.size_bytes())
    }

    fn available_from(&self, written: usize) -> usize {
        let size = self.buffer.size_bytes();
        (written + size - self.outstanding_offset) % size
    }

    fn release_up_to(&mut self, offset: usize) {
        // The caller's reads of released bytes must complete before the
        // engine learns it may overwrite them.
        let address = self.address_of(offset);
        fence(Ordering::Release);
        self.registers.set_buffer_read_address(address);
    }

    fn address_of(&self, offset: usize) -> u32 {
        // offset < size and start + size fits in u32, checked at construction.
        self.start_address + offset as u32
    }

    fn check_length(&self, num_bytes: usize) -> Result<()> {
        if num_bytes % self.config.packet_length != 0 {
            return Err(Error::UnalignedLength {
                num_bytes,
                packet_length: self.config.packet_length,
            });
        }
        Ok(())
    }

    fn or_fault<T>(&mut self, result: Result<T>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                error!("DMA ring fault: {err}");
                self.handler.assertion_failed(&err);
                fallback
            }
        }
    }
}
