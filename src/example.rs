//! Mocks for doc examples
use crate::serial::SerialPort;
use core::convert::Infallible;
use heapless::{Deque, Vec};

/// Scripted serial port used by the doc examples.
///
/// Holds a queue of canned modem responses; each completed outbound line
/// (or an outbound payload byte `\n`) releases the next one for reading.
/// Panics when the driver keeps waiting after the script ran dry, so a
/// broken example fails instead of hanging.
pub struct ExampleSerialPort {
    /// Pending responses, released in order
    scripted: Deque<&'static [u8], 8>,

    /// Remainder of the currently released response
    current: &'static [u8],

    /// Everything the driver wrote
    written: Vec<u8, 256>,

    /// Consecutive idle calls without a byte read
    starved: usize,
}

impl ExampleSerialPort {
    pub fn new() -> Self {
        Self {
            scripted: Deque::new(),
            current: &[],
            written: Vec::new(),
            starved: 0,
        }
    }

    /// Queues one canned response, released by the next outbound `\n`.
    pub fn add_response(&mut self, response: &'static [u8]) {
        self.scripted.push_back(response).unwrap();
    }

    /// Everything the driver has written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Default for ExampleSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialPort for ExampleSerialPort {
    fn write_byte(&mut self, byte: u8) {
        let _ = self.written.push(byte);
        if byte == b'\n' && self.current.is_empty() {
            if let Some(response) = self.scripted.pop_front() {
                self.current = response;
            }
        }
    }

    fn read_byte(&mut self) -> nb::Result<u8, Infallible> {
        match self.current.split_first() {
            Some((byte, rest)) => {
                self.current = rest;
                self.starved = 0;
                Ok(*byte)
            }
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn idle(&mut self) {
        self.starved += 1;
        if self.starved > 16 {
            panic!("ExampleSerialPort ran out of scripted responses");
        }
    }
}
