//! # TCP/UDP socket stack
//!
//! Up to [SOCKET_COUNT] concurrent sessions multiplexed over the one
//! serial link, each identified by its link id and delivering inbound
//! bytes through a per-session receive handler. Server mode hands new
//! connections to an accept handler.
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
//! serial.add_response(b"0,CONNECT\r\nOK\r\n");
//! serial.add_response(b"OK\r\n> ");
//! serial.add_response(b"\r\nSEND OK\r\n");
//! serial.add_response(b"OK\r\n");
//!
//! let mut adapter = Adapter::new(serial);
//!
//! let link_id = adapter.tcp_connect("10.0.0.1", 21, on_data).unwrap();
//! assert_eq!(0, link_id);
//!
//! let sent = adapter.write(link_id, b"hallo!\n", None).unwrap();
//! assert_eq!(7, sent);
//!
//! adapter.close(link_id).unwrap();
//! ````
use crate::error::Error;
use crate::serial::{write_all, SerialPort};
use crate::wifi::Adapter;

/// Number of multiplexed sessions the modem offers.
pub const SOCKET_COUNT: usize = 5;

/// Payload bytes announced per `AT+CIPSEND` round.
pub(crate) const TX_CHUNK_SIZE: usize = 1500;

/// Delivery to a session's receive handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketEvent {
    /// One inbound payload byte, in wire order
    Data(u8),

    /// End of stream: the remote peer closed the connection, the datagram
    /// ended (UDP), or the modem reset. Delivered at most once per
    /// connection, strictly after its last data byte.
    End,
}

/// Delivery to the accept handler installed by [listen](Adapter::listen).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcceptEvent {
    /// A remote peer connected to the listening port; the link id is open
    /// and connected, attach a receive handler via [accept](Adapter::accept)
    Connection(usize),

    /// The modem reset, all sessions are gone
    ModuleReset,
}

/// Per-session byte sink, invoked from within the receive engine.
pub type ReceiveHandler = fn(link_id: usize, event: SocketEvent);

/// Server-side connection sink, invoked from within the receive engine.
pub type AcceptHandler = fn(event: AcceptEvent);

/// State of one session slot.
#[derive(Copy, Clone, Default)]
pub(crate) struct Session {
    /// Slot occupied by a logical socket
    pub(crate) open: bool,

    /// Remote peer currently connected
    pub(crate) connected: bool,

    /// A close was observed since the slot was opened, sticky until reuse
    pub(crate) disconnected: bool,

    /// Datagram semantics: receive handler is told each datagram's end
    pub(crate) udp: bool,

    /// Byte sink for inbound payloads
    pub(crate) recv: Option<ReceiveHandler>,
}

/// Transport protocol of a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionKind {
    Tcp,
    Udp,
}

impl ConnectionKind {
    pub(crate) fn token(self) -> &'static str {
        match self {
            ConnectionKind::Tcp => "TCP",
            ConnectionKind::Udp => "UDP",
        }
    }
}

impl<S: SerialPort> Adapter<S> {
    /// Opens a TCP connection to `host:port`, delivering inbound bytes to
    /// `recv`. Returns the link id.
    ///
    /// `host` may be a hostname; a failed lookup surfaces as
    /// [Error::DnsFail].
    pub fn tcp_connect(&mut self, host: &str, port: u16, recv: ReceiveHandler) -> Result<usize, Error> {
        self.open_socket(ConnectionKind::Tcp, host, port, recv, None)
    }

    /// Opens a UDP socket sending to `host:port`, optionally bound to
    /// `local_port` for inbound datagrams, which are delivered to `recv`
    /// with a [SocketEvent::End] after each datagram.
    pub fn udp_socket(
        &mut self,
        host: &str,
        port: u16,
        recv: ReceiveHandler,
        local_port: Option<u16>,
    ) -> Result<usize, Error> {
        self.open_socket(ConnectionKind::Udp, host, port, recv, local_port)
    }

    fn open_socket(
        &mut self,
        kind: ConnectionKind,
        host: &str,
        port: u16,
        recv: ReceiveHandler,
        local_port: Option<u16>,
    ) -> Result<usize, Error> {
        let link_id = match self.sessions.iter().position(|session| !session.open) {
            Some(link_id) => link_id,
            None => return Err(self.fail(Error::Resource)),
        };

        self.receive();

        {
            let session = &mut self.sessions[link_id];
            session.open = true;
            session.udp = kind == ConnectionKind::Udp;
            session.disconnected = false;
        }

        self.parser.resp_id = 0;
        self.resp_closed = false;
        self.resp_dnsfail = false;
        self.clear_result_flags();

        self.send_cipstart(link_id, kind, host, port, local_port);

        loop {
            self.receive();
            if self.resp_error {
                let error = if self.resp_dnsfail { Error::DnsFail } else { Error::Fail };
                self.sessions[link_id].open = false;
                return Err(self.fail(error));
            }
            if self.resp_ok {
                break;
            }
        }

        let session = &mut self.sessions[link_id];
        session.connected = true;
        session.recv = Some(recv);
        Ok(link_id)
    }

    /// Writes `data` to an open session, chunked into `AT+CIPSEND` rounds
    /// of at most 1500 bytes. Returns the number of bytes the modem
    /// confirmed.
    ///
    /// For UDP sessions `udp_address` redirects the datagrams to a
    /// different target; on TCP it is rejected as [Error::Invalid]. A write
    /// to a session that observed a remote close fails with
    /// [Error::Disconnected]. An empty `data` is a no-op returning 0.
    pub fn write(&mut self, link_id: usize, data: &[u8], udp_address: Option<&str>) -> Result<usize, Error> {
        let session = match self.sessions.get(link_id) {
            Some(session) if session.open => *session,
            _ => return Err(self.fail(Error::Invalid)),
        };

        if session.disconnected {
            return Err(self.fail(Error::Disconnected));
        }
        if udp_address.is_some() && !session.udp {
            return Err(self.fail(Error::Invalid));
        }
        if data.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        for chunk in data.chunks(TX_CHUNK_SIZE) {
            self.send_ready = false;
            self.send_ok = false;
            self.send_fail = false;

            self.send_cipsend(link_id, chunk.len(), udp_address);
            if !self.wait_ok_fail() {
                return Err(self.fail(Error::Fail));
            }

            self.wait_until(|adapter| adapter.send_ready);

            // The modem echoes the payload; silence the matcher for the
            // rest of this "line"
            self.parser.first = 0;
            write_all(&mut self.serial, chunk);

            self.wait_until(|adapter| adapter.send_ok || adapter.send_fail);
            if self.send_fail {
                break;
            }

            written += chunk.len();
        }

        if !self.send_ok {
            return Err(self.fail(Error::Fail));
        }
        Ok(written)
    }

    /// Closes a session.
    ///
    /// The local slot is released in every case; the result reflects
    /// whether the modem acknowledged `AT+CIPCLOSE`. Closing a session the
    /// remote side already closed skips the command and succeeds. Closing
    /// a released slot is [Error::Invalid].
    pub fn close(&mut self, link_id: usize) -> Result<(), Error> {
        let connected = match self.sessions.get(link_id) {
            Some(session) if session.open => session.connected,
            _ => return Err(self.fail(Error::Invalid)),
        };

        self.sessions[link_id].open = false;
        if !connected {
            return Ok(());
        }

        self.command_with_int("AT+CIPCLOSE=", link_id as i32);
        self.sessions[link_id].connected = false;

        self.ok_or_fail()
    }

    /// Closes every session, ignoring per-socket errors and forcing all
    /// local slots free.
    pub fn close_all(&mut self) {
        for link_id in 0..SOCKET_COUNT {
            let _ = self.close(link_id);
            self.sessions[link_id].open = false;
        }
    }

    /// Starts the server on `port` (`AT+CIPSERVER=1`), announcing new
    /// connections to `accept`. The handler is installed before the
    /// command is issued, so no early connection is lost.
    pub fn listen(&mut self, port: u16, accept: AcceptHandler) -> Result<(), Error> {
        self.accept_handler = Some(accept);
        self.command_with_int("AT+CIPSERVER=1,", i32::from(port));
        self.ok_or_fail()
    }

    /// Attaches a receive handler to a session announced via
    /// [AcceptEvent::Connection].
    pub fn accept(&mut self, link_id: usize, recv: ReceiveHandler) -> Result<(), Error> {
        match self.sessions.get_mut(link_id) {
            Some(session) => {
                session.recv = Some(recv);
                Ok(())
            }
            None => Err(self.fail(Error::Invalid)),
        }
    }

    /// Stops the server (`AT+CIPSERVER=0`) and uninstalls the accept
    /// handler.
    pub fn unlisten(&mut self) -> Result<(), Error> {
        self.accept_handler = None;
        self.command("AT+CIPSERVER=0");
        self.ok_or_fail()
    }
}
