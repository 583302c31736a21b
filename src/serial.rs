//! # Serial transport abstraction
//!
//! The driver talks to the modem through exactly one trait. The embedder
//! supplies the byte-level primitives; the driver knows nothing else about
//! the host environment (no port configuration, no timers, no buffering
//! policy).
use core::convert::Infallible;

/// Byte-level access to the UART the ESP8266 is attached to.
///
/// [read_byte](SerialPort::read_byte) doubles as the readiness poll: an
/// implementation returns [nb::Error::WouldBlock] while no byte is pending.
/// The driver drains bytes until `WouldBlock` and then calls
/// [idle](SerialPort::idle) once, so a cooperative scheduler can be yielded
/// to from there. An implementation is also free to block inside
/// `read_byte` until a byte arrives.
pub trait SerialPort {
    /// Writes a single byte. Blocking and infallible from the driver's view.
    fn write_byte(&mut self, byte: u8);

    /// Returns the next received byte, or [nb::Error::WouldBlock] if none
    /// is pending.
    fn read_byte(&mut self) -> nb::Result<u8, Infallible>;

    /// Called whenever the driver has drained all pending bytes while
    /// waiting for a response. May yield, sleep or do nothing.
    ///
    /// Timeout policy lives here: the driver itself waits indefinitely.
    fn idle(&mut self) {}
}

/// Spins on [SerialPort::read_byte] until a byte arrives.
///
/// Used while consuming the interior of a recognized response line, where
/// the protocol guarantees more bytes are in flight.
pub(crate) fn read_blocking<S: SerialPort>(serial: &mut S) -> u8 {
    loop {
        match serial.read_byte() {
            Ok(byte) => return byte,
            Err(nb::Error::WouldBlock) => continue,
        }
    }
}

/// Writes every byte of `data`.
pub(crate) fn write_all<S: SerialPort>(serial: &mut S, data: &[u8]) {
    for byte in data {
        serial.write_byte(*byte);
    }
}
