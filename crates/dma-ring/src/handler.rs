//! The fatal-fault channel.

use crate::Error;

/// Receives faults the reader cannot recover from.
///
/// A handler is expected not to return on a real fault: halt, reset the
/// system, or panic. When it does return (for example a recording handler in
/// tests), the reader abandons the operation that faulted without touching
/// its cursors.
pub trait AssertionHandler {
    fn assertion_failed(&mut self, error: &Error);
}

/// Panics with the fault's message. The default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicHandler;

impl AssertionHandler for PanicHandler {
    fn assertion_failed(&mut self, error: &Error) {
        panic!("DMA ring assertion failed: {error}");
    }
}

impl<F: FnMut(&Error)> AssertionHandler for F {
    fn assertion_failed(&mut self, error: &Error) {
        self(error)
    }
}
