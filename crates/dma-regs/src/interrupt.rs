use bitflags::bitflags;

bitflags! {
    /// Bits of the `interrupt_status` and `interrupt_mask` registers.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct InterruptStatus: u32 {
        /// The engine has written at least one packet since the last clear.
        const WRITE_DONE = 1 << 0;
        /// A bus write returned an error response.
        const WRITE_ERROR = 1 << 1;
        /// `buffer_start_address` was programmed with an unaligned value.
        const START_ADDRESS_UNALIGNED = 1 << 2;
        /// `buffer_end_address` was programmed with an unaligned value.
        const END_ADDRESS_UNALIGNED = 1 << 3;
        /// `buffer_read_address` was programmed with an unaligned value.
        const READ_ADDRESS_UNALIGNED = 1 << 4;
    }
}

impl InterruptStatus {
    /// Every bit that indicates a fault rather than progress.
    pub const ERRORS: Self = Self::WRITE_ERROR
        .union(Self::START_ADDRESS_UNALIGNED)
        .union(Self::END_ADDRESS_UNALIGNED)
        .union(Self::READ_ADDRESS_UNALIGNED);

    /// The error-class subset of these bits.
    pub fn errors(self) -> Self {
        self & Self::ERRORS
    }

    /// Whether any error-class bit is set.
    pub fn has_errors(self) -> bool {
        self.intersects(Self::ERRORS)
    }

    /// Whether the engine reported progress.
    pub fn write_done(self) -> bool {
        self.contains(Self::WRITE_DONE)
    }
}
