//! # no_std ESP8266 AT socket driver
//!
//! Multiplexed TCP/UDP socket driver for ESP8266 modems speaking the
//! Espressif [AT command set](https://docs.espressif.com/projects/esp-at/)
//! over a byte-oriented serial link.
//!
//! Currently this crate offers the following features
//! * Joining a WIFI access point and interface queries, s. [wifi module](crate::wifi)
//! * Up to five concurrent TCP/UDP sessions with callback delivery, s. [stack module](crate::stack)
//! * Server mode with accept notifications
//!
//! ## Setup
//! The driver consumes one [SerialPort](crate::serial::SerialPort)
//! implementation supplied by the embedder and needs nothing else from the
//! host environment. It is blocking and cooperative: command methods pump
//! the receive engine until the modem's verdict arrives, timeout policy
//! belongs to the transport's idle hook.
//!
//! ## Example
//!
//! ````
//! use esp8266_at::example::ExampleSerialPort;
//! use esp8266_at::stack::SocketEvent;
//! use esp8266_at::wifi::Adapter;
//!
//! fn on_data(_link_id: usize, _event: SocketEvent) {}
//!
//! let mut serial = ExampleSerialPort::new();
//! serial.add_response(b"OK\r\n");               // AT+CWJAP
//! serial.add_response(b"0,CONNECT\r\nOK\r\n");  // AT+CIPSTART
//! serial.add_response(b"OK\r\n> ");             // AT+CIPSEND
//! serial.add_response(b"\r\nSEND OK\r\n");      // payload delivered
//! serial.add_response(b"OK\r\n");               // AT+CIPCLOSE
//!
//! let mut adapter = Adapter::new(serial);
//!
//! // Joining a WIFI access point
//! adapter.ap_join("test_wifi", "secret").unwrap();
//!
//! // Creating a TCP connection
//! let link_id = adapter.tcp_connect("10.0.0.1", 21, on_data).unwrap();
//!
//! // Sending some data
//! let sent = adapter.write(link_id, b"hallo!\n", None).unwrap();
//! assert_eq!(7, sent);
//!
//! adapter.close(link_id).unwrap();
//! ````
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[cfg(test)]
extern crate alloc;

pub(crate) mod commands;
pub(crate) mod engine;
pub mod error;
pub mod example;
pub(crate) mod numeric;
pub mod responses;
pub mod serial;
pub mod stack;
pub mod wifi;

#[cfg(test)]
mod tests;
