//! Shared fixtures: a heap buffer wired to a simulated engine.

#![allow(dead_code)]

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use dma_regs::SimRegisters;
use dma_ring::{DmaBuffer, Error, ReaderConfig, RingBufferDmaReader};

pub const BUS_ADDRESS: u32 = 0x4000_0000;

pub type Faults = Rc<RefCell<Vec<Error>>>;

pub type Reader = RingBufferDmaReader<SimRegisters, Box<dyn FnMut(&Error)>>;

/// Engine, reader and the memory they share. The memory is boxed so its
/// address stays put while the fixture moves.
pub struct Fixture {
    pub sim: SimRegisters,
    pub faults: Faults,
    pub reader: Reader,
    memory: Box<[u8]>,
}

impl Fixture {
    pub fn new(buffer_size: usize, packet_length: usize) -> Self {
        let mut memory = vec![0u8; buffer_size].into_boxed_slice();
        let cpu = NonNull::new(memory.as_mut_ptr()).unwrap();
        let buffer = unsafe { DmaBuffer::new(cpu, BUS_ADDRESS, buffer_size) };

        let sim = SimRegisters::new(packet_length as u32);
        let faults = Faults::default();
        let sink = faults.clone();
        let handler: Box<dyn FnMut(&Error)> = Box::new(move |e: &Error| sink.borrow_mut().push(*e));

        let mut reader =
            RingBufferDmaReader::with_handler(sim.clone(), buffer, ReaderConfig::new(packet_length), handler)
                .unwrap();
        reader.setup_and_enable();

        Self {
            sim,
            faults,
            reader,
            memory,
        }
    }

    pub fn base(&self) -> *const u8 {
        self.memory.as_ptr()
    }

    /// Let the engine write `num_bytes`, stamping each byte with its stream
    /// position modulo 251 so content can be checked after wraparound.
    pub fn produce(&mut self, num_bytes: u32, stream_position: &mut u64) -> u32 {
        let base = self.memory.as_mut_ptr();
        self.sim.produce_with(num_bytes, |offset, len| {
            for i in 0..len {
                unsafe { *base.add(offset + i) = (*stream_position % 251) as u8 };
                *stream_position += 1;
            }
        })
    }

    pub fn faults(&self) -> Vec<Error> {
        self.faults.borrow().clone()
    }
}
