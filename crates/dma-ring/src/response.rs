use core::ptr::{self, NonNull};

/// A view of bytes the engine has written, handed out without copying.
///
/// A `Response` does not own or borrow the memory; it only records where the
/// bytes are. Read them through
/// [`RingBufferDmaReader::data`](crate::RingBufferDmaReader::data), which
/// refuses once the bytes have been released or the reader was cleared.
///
/// A response with `num_bytes() == 0` means nothing was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub(crate) num_bytes: usize,
    pub(crate) data: Option<NonNull<u8>>,
    pub(crate) offset: usize,
    /// Stream position of the first byte, counted since the last clear.
    pub(crate) position: u64,
    pub(crate) epoch: u32,
}

impl Response {
    pub(crate) const EMPTY: Self = Self {
        num_bytes: 0,
        data: None,
        offset: 0,
        position: 0,
        epoch: 0,
    };

    /// Number of bytes handed out, zero if nothing was available.
    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    /// Whether this is the "nothing available" response.
    pub fn is_empty(&self) -> bool {
        self.num_bytes == 0
    }

    /// Offset of the first byte from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Raw pointer to the first byte, or null for an empty response.
    ///
    /// Dereferencing it is only sound until the bytes are released with
    /// `done_with_data` or the reader is cleared.
    pub fn as_ptr(&self) -> *const u8 {
        self.data
            .map_or(ptr::null(), |data| data.as_ptr().cast_const())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::EMPTY
    }
}
