//! # WIFI adapter
//!
//! Central driver state plus the Wi-Fi surface: reset/start, joining an
//! access point and the interface queries backed by the capture slots.
//!
//! ## Example
//!
//! ````
//! use esp8266_at::example::ExampleSerialPort;
//! use esp8266_at::wifi::Adapter;
//!
//! let mut serial = ExampleSerialPort::new();
//! serial.add_response(b"OK\r\n");
//! serial.add_response(b"+CWJAP:\"test_wifi\",\"c0:ff:d4:95:80:04\",7,-66\r\nOK\r\n");
//!
//! let mut adapter = Adapter::new(serial);
//! adapter.ap_join("test_wifi", "secret").unwrap();
//!
//! let ap = adapter.get_ap_ssid().unwrap();
//! assert_eq!("test_wifi", ap.ssid.as_str());
//! assert_eq!(7, ap.channel);
//! assert_eq!(-66, ap.strength);
//! ````
use crate::engine::{CaptureSlot, Parser, CAPTURE_SLOTS};
use crate::error::Error;
use crate::responses::{ApEcn, ApInfo, IpConfig, SoftApConfig};
use crate::serial::SerialPort;
use crate::stack::{AcceptHandler, Session, SOCKET_COUNT};
use heapless::String;

/// Central driver for one ESP8266 modem.
///
/// Owns the transport, the multiplexed session table, the receive engine
/// state and the response flags the command methods rendezvous on. All
/// operations are blocking: they pump [receive](Adapter::receive) until the
/// modem's verdict arrives, without any timeout of their own (timeout
/// policy belongs to the transport's idle hook).
///
/// Not reentrant: one foreground operation at a time.
pub struct Adapter<S: SerialPort> {
    /// Byte transport to the modem
    pub(crate) serial: S,

    /// Per-socket session records, array index = link id
    pub(crate) sessions: [Session; SOCKET_COUNT],

    /// Accept handler installed by listen()
    pub(crate) accept_handler: Option<AcceptHandler>,

    /// Last error observed, None while nominal
    pub(crate) last_error: Option<Error>,

    /// Receive engine matcher state
    pub(crate) parser: Parser,

    /// Field destinations for structured query responses
    pub(crate) captures: [CaptureSlot; CAPTURE_SLOTS],

    /// Channel of the joined AP, cached by get_ap_ssid(), -1 if unknown
    pub(crate) channel: i32,

    /// Signal strength of the joined AP in dBm, -1 if unknown
    pub(crate) strength: i32,

    /// Modem announced `ready` after reset
    pub(crate) ready: bool,

    /// `WIFI CONNECT` seen and not revoked
    pub(crate) wifi_connected: bool,

    /// `WIFI GOT IP` seen and not revoked
    pub(crate) wifi_got_ip: bool,

    /// Command verdict: `OK`
    pub(crate) resp_ok: bool,

    /// Command verdict: `FAIL`
    pub(crate) resp_fail: bool,

    /// Command verdict: `ERROR`
    pub(crate) resp_error: bool,

    /// A `DNS Fail` line accompanied the verdict
    pub(crate) resp_dnsfail: bool,

    /// A remote close (`<n>,CLOSED`) was observed
    #[allow(unused)]
    pub(crate) resp_closed: bool,

    /// Transmission prompt `>` received
    pub(crate) send_ready: bool,

    /// `SEND OK` received
    pub(crate) send_ok: bool,

    /// `SEND FAIL` received
    pub(crate) send_fail: bool,
}

impl<S: SerialPort> Adapter<S> {
    /// Creates a driver over the given transport, with everything cleared.
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            sessions: [Session::default(); SOCKET_COUNT],
            accept_handler: None,
            last_error: None,
            parser: Parser::default(),
            captures: [
                CaptureSlot::new(),
                CaptureSlot::new(),
                CaptureSlot::new(),
                CaptureSlot::new(),
            ],
            channel: -1,
            strength: -1,
            ready: false,
            wifi_connected: false,
            wifi_got_ip: false,
            resp_ok: false,
            resp_fail: false,
            resp_error: false,
            resp_dnsfail: false,
            resp_closed: false,
            send_ready: false,
            send_ok: false,
            send_fail: false,
        }
    }

    /// Last error observed, sticky until the next failing operation
    /// overwrites it. `None` while nominal.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Channel of the joined access point, cached by the last
    /// [get_ap_ssid](Adapter::get_ap_ssid). -1 if unknown.
    pub fn ap_channel(&self) -> i32 {
        self.channel
    }

    /// Signal strength of the joined access point in dBm, cached by the
    /// last [get_ap_ssid](Adapter::get_ap_ssid). -1 if unknown.
    pub fn ap_strength(&self) -> i32 {
        self.strength
    }

    /// Consumes the driver, handing the transport back.
    pub fn release(self) -> S {
        self.serial
    }

    pub(crate) fn fail(&mut self, error: Error) -> Error {
        self.last_error = Some(error);
        error
    }

    /// Software-resets the modem (`AT+RST`), waits for its `ready`
    /// announcement and re-establishes the operational parameters via
    /// [start](Adapter::start).
    ///
    /// The `ready` handler clears every session and flag first; receive
    /// handlers of open sessions observe an end-of-stream.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.receive();

        self.ready = false;
        self.parser.first = b'\n';
        self.command("AT+RST");

        self.wait_until(|adapter| adapter.ready);
        self.start()
    }

    /// Like [reset](Adapter::reset), but without sending `AT+RST`: waits
    /// for the `ready` announcement of an externally asserted hardware
    /// reset, then runs [start](Adapter::start).
    pub fn wait_reset(&mut self) -> Result<(), Error> {
        self.ready = false;
        self.wait_until(|adapter| adapter.ready);
        self.start()
    }

    /// Establishes the operational parameters: echo off (`ATE0`), normal
    /// transmission mode (`CIPMODE=0`) and multiplexing (`CIPMUX=1`), then
    /// force-closes all sockets.
    ///
    /// Both modes are queried first and only set on mismatch; the modem
    /// rejects mode changes while sockets or a server are live.
    pub fn start(&mut self) -> Result<(), Error> {
        self.command("ATE0");
        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }

        self.ensure_transfer_mode(0)?;
        self.ensure_multiplexing(1)?;

        self.close_all();
        Ok(())
    }

    /// Blocks until `WIFI CONNECT` was observed, and with `got_ip` also
    /// until `WIFI GOT IP`.
    pub fn wait_wifi(&mut self, got_ip: bool) {
        self.wait_until(|adapter| adapter.wifi_connected);
        if got_ip {
            self.wait_until(|adapter| adapter.wifi_got_ip);
        }
    }

    /// Returns true if an access point is joined, and with `got_ip` only
    /// if an IP lease is held as well.
    ///
    /// Queries `AT+CWJAP?` (refreshing the connection flag), and for the
    /// lease additionally `AT+CIPAP?` whose ip handler refreshes the
    /// got-ip flag against `0.0.0.0`.
    pub fn is_wifi(&mut self, got_ip: bool) -> bool {
        if self.get_ap_ssid().is_err() {
            return false;
        }

        if !got_ip {
            return self.wifi_connected;
        }

        if self.get_ap_info().is_err() {
            return false;
        }

        self.wifi_got_ip
    }

    /// Joins the given access point: `AT+CWJAP="ssid","password"`.
    pub fn ap_join(&mut self, ssid: &str, password: &str) -> Result<(), Error> {
        self.parser.resp_id = 0;
        self.resp_closed = false;
        self.resp_dnsfail = false;

        self.clear_result_flags();
        self.write_str("AT+CWJAP=\"");
        self.write_str(ssid);
        self.write_str("\",\"");
        self.write_str(password);
        self.write_str("\"");
        self.crlf();

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(())
    }

    /// Queries the joined access point (`AT+CWJAP?`).
    ///
    /// With no AP joined the modem answers `No AP`; the result then carries
    /// an empty SSID and the connection flag is dropped.
    pub fn get_ap_ssid(&mut self) -> Result<ApInfo, Error> {
        self.clear_captures();
        self.parser.resp_id = 0;
        self.command("AT+CWJAP?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }

        let info = ApInfo {
            ssid: self.capture_string(0),
            mac: self.capture_string(1),
            channel: self.capture_int(2),
            strength: self.capture_int(3),
        };
        self.channel = info.channel;
        self.strength = info.strength;
        Ok(info)
    }

    /// Queries the soft access point configuration (`AT+CWSAP?`).
    pub fn query_softap(&mut self) -> Result<SoftApConfig, Error> {
        self.clear_captures();
        self.command("AT+CWSAP?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }

        let ecn = match ApEcn::from_code(self.capture_int(3)) {
            Some(ecn) => ecn,
            None => return Err(self.fail(Error::Fail)),
        };

        Ok(SoftApConfig {
            ssid: self.capture_string(0),
            password: self.capture_string(1),
            channel: self.capture_int(2),
            ecn,
        })
    }

    /// Queries address, gateway and netmask of the soft-AP interface
    /// (`AT+CIPAP?`).
    pub fn get_ap_info(&mut self) -> Result<IpConfig, Error> {
        self.query_ip_config("AT+CIPAP?")
    }

    /// Queries address, gateway and netmask of the station interface
    /// (`AT+CIPSTA?`).
    pub fn get_station_info(&mut self) -> Result<IpConfig, Error> {
        self.query_ip_config("AT+CIPSTA?")
    }

    fn query_ip_config(&mut self, cmd: &str) -> Result<IpConfig, Error> {
        self.clear_captures();
        self.command(cmd);

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }

        Ok(IpConfig {
            ip: self.capture_string(0),
            gateway: self.capture_string(1),
            netmask: self.capture_string(2),
        })
    }

    /// Sets the soft-AP interface address (`AT+CIPAP="…"`).
    pub fn set_ap_addr(&mut self, ip_addr: &str) -> Result<(), Error> {
        self.command_quoted("AT+CIPAP=\"", ip_addr);
        self.ok_or_fail()
    }

    /// Sets the station interface address (`AT+CIPSTA="…"`).
    pub fn set_station_addr(&mut self, ip_addr: &str) -> Result<(), Error> {
        self.command_quoted("AT+CIPSTA=\"", ip_addr);
        self.ok_or_fail()
    }

    /// Queries the soft-AP MAC address (`AT+CIPAPMAC?`).
    pub fn get_ap_mac(&mut self) -> Result<String<20>, Error> {
        self.query_mac("AT+CIPAPMAC?")
    }

    /// Sets the soft-AP MAC address (`AT+CIPAPMAC="…"`).
    pub fn set_ap_mac(&mut self, mac: &str) -> Result<(), Error> {
        self.command_quoted("AT+CIPAPMAC=\"", mac);
        self.ok_or_fail()
    }

    /// Queries the station MAC address (`AT+CIPSTAMAC?`).
    pub fn get_station_mac(&mut self) -> Result<String<20>, Error> {
        self.query_mac("AT+CIPSTAMAC?")
    }

    /// Sets the station MAC address (`AT+CIPSTAMAC="…"`).
    pub fn set_station_mac(&mut self, mac: &str) -> Result<(), Error> {
        self.command_quoted("AT+CIPSTAMAC=\"", mac);
        self.ok_or_fail()
    }

    fn query_mac(&mut self, cmd: &str) -> Result<String<20>, Error> {
        self.clear_captures();
        self.command(cmd);

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.capture_string(0))
    }

    /// Queries the server timeout in seconds (`AT+CIPSTO?`).
    pub fn get_timeout(&mut self) -> Result<i32, Error> {
        self.parser.resp_id = 0;
        self.command("AT+CIPSTO?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.parser.resp_id)
    }

    /// Sets the server timeout in seconds (`AT+CIPSTO=<s>`).
    pub fn set_timeout(&mut self, seconds: i32) -> Result<(), Error> {
        self.command_with_int("AT+CIPSTO=", seconds);
        self.ok_or_fail()
    }

    /// Queries whether the modem auto-joins its stored access point
    /// (`AT+CWAUTOCONN?`).
    pub fn get_autoconn(&mut self) -> Result<bool, Error> {
        self.parser.resp_id = 0;
        self.command("AT+CWAUTOCONN?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.parser.resp_id != 0)
    }

    /// Enables/disables access point auto-join (`AT+CWAUTOCONN=<0|1>`).
    pub fn set_autoconn(&mut self, on: bool) -> Result<(), Error> {
        self.command(if on { "AT+CWAUTOCONN=1" } else { "AT+CWAUTOCONN=0" });
        self.ok_or_fail()
    }

    /// Enables/disables station DHCP (`AT+CWDHCP=2,<0|1>`).
    pub fn dhcp(&mut self, on: bool) -> Result<(), Error> {
        self.command(if on { "AT+CWDHCP=2,1" } else { "AT+CWDHCP=2,0" });
        self.ok_or_fail()
    }

    /// Queries the firmware version (`AT+GMR`), returning the `AT version:`
    /// line only.
    pub fn get_version(&mut self) -> Result<String<64>, Error> {
        self.clear_captures();
        self.command("AT+GMR");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.capture_string(0))
    }

    fn query_transfer_mode(&mut self) -> Result<i32, Error> {
        self.parser.resp_id = 0;
        self.command("AT+CIPMODE?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.parser.resp_id)
    }

    fn ensure_transfer_mode(&mut self, mode: i32) -> Result<(), Error> {
        if self.query_transfer_mode()? == mode {
            return Ok(());
        }

        self.command_with_int("AT+CIPMODE=", mode);
        self.ok_or_fail()
    }

    fn query_multiplexing(&mut self) -> Result<i32, Error> {
        self.parser.resp_id = 0;
        self.command("AT+CIPMUX?");

        if !self.wait_ok_fail() {
            return Err(self.fail(Error::Fail));
        }
        Ok(self.parser.resp_id)
    }

    fn ensure_multiplexing(&mut self, mode: i32) -> Result<(), Error> {
        if self.query_multiplexing()? == mode {
            return Ok(());
        }

        self.command_with_int("AT+CIPMUX=", mode);
        self.ok_or_fail()
    }

    pub(crate) fn ok_or_fail(&mut self) -> Result<(), Error> {
        if self.wait_ok_fail() {
            Ok(())
        } else {
            Err(self.fail(Error::Fail))
        }
    }
}
