//! # Receive engine
//!
//! Byte-at-a-time state machine consuming the modem's output: response
//! verdicts (`OK`/`FAIL`/`ERROR`), unsolicited notifications (`WIFI …`,
//! `<n>,CONNECT`, `ready`), structured query responses (`+CWJAP:…`) and
//! inline socket payloads (`+IPD,<id>,<len>:…`).
//!
//! Recognition works on line-leading tokens. A pattern table holds each
//! token together with the prefix length it shares with its predecessor;
//! when a longer pattern fails mid-way, the shared-prefix hint chains the
//! match over to the next candidate without re-reading bytes. Matched tokens
//! dispatch to a handler which flips a response flag, mutates the session
//! table, extracts fields into the capture slots or streams a payload into
//! a socket callback. Everything else on a line is discarded.
use crate::serial::{read_blocking, SerialPort};
use crate::stack::{AcceptEvent, Session, SocketEvent, SOCKET_COUNT};
use crate::wifi::Adapter;

/// Number of capture slots for structured response fields.
pub(crate) const CAPTURE_SLOTS: usize = 4;

/// Capacity of a single capture slot in bytes.
pub(crate) const CAPTURE_CAPACITY: usize = 64;

/// One field destination written by the response handlers.
pub(crate) type CaptureSlot = heapless::Vec<u8, CAPTURE_CAPACITY>;

/// Transient matcher state, reset on every line feed.
pub(crate) struct Parser {
    /// Anchor of the current line: `\n` between lines, `0` while the rest
    /// of a rejected line is discarded, `9` while accumulating a leading
    /// decimal session id, otherwise the line's first byte.
    pub(crate) first: u8,

    /// Index of the candidate pattern currently being matched.
    pub(crate) s0: usize,

    /// Count of already matched pattern bytes.
    pub(crate) ss: usize,

    /// Decimal accumulator fed by leading-digit lines and `read_id`.
    pub(crate) resp_id: i32,

    /// Session id of the payload currently streamed by `+IPD`.
    pub(crate) ipd_id: i32,

    /// Remaining byte count of that payload.
    pub(crate) ipd_len: i32,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            first: b'\n',
            s0: 0,
            ss: 0,
            resp_id: 0,
            ipd_id: 0,
            ipd_len: 0,
        }
    }
}

/// Handler selected by a completed pattern match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Action {
    InboundData,
    AutoConnect,
    JoinedAp,
    SoftAp,
    ApIp,
    ApGateway,
    ApNetmask,
    ApMac,
    StationIp,
    StationGateway,
    StationNetmask,
    StationMac,
    Timeout,
    TransferMode,
    Multiplexing,
    Ok,
    Fail,
    Error,
    SendOk,
    SendFail,
    Connected,
    Closed,
    DnsFail,
    WifiDisconnect,
    WifiConnect,
    WifiGotIp,
    Version,
    NoAp,
    Ready,
}

struct Pattern {
    /// Recognition token, anchored at the line start (the `,CONNECT` and
    /// `,CLOSED` forms anchor after the leading decimal session id).
    text: &'static [u8],

    /// Prefix length shared with the previous entry. Fallback walks use it
    /// to chain onto the next candidate when a match diverges exactly at
    /// the point two patterns split.
    shared: usize,

    action: Action,
}

const fn pat(text: &'static [u8], shared: usize, action: Action) -> Pattern {
    Pattern { text, shared, action }
}

/// Entries sharing a prefix must stay adjacent, ordered so every split
/// point equals the `shared` value of the entry it diverges into.
static PATTERNS: [Pattern; 29] = [
    pat(b"+IPD,", 0, Action::InboundData),
    pat(b"+CWAUTOCONN:", 1, Action::AutoConnect),
    pat(b"+CWJAP:\"", 3, Action::JoinedAp),
    pat(b"+CWSAP:\"", 3, Action::SoftAp),
    pat(b"+CIPAP:ip:\"", 2, Action::ApIp),
    pat(b"+CIPAP:gateway:\"", 7, Action::ApGateway),
    pat(b"+CIPAP:netmask:\"", 7, Action::ApNetmask),
    pat(b"+CIPAPMAC:\"", 6, Action::ApMac),
    pat(b"+CIPSTA:ip:\"", 4, Action::StationIp),
    pat(b"+CIPSTA:gateway:\"", 8, Action::StationGateway),
    pat(b"+CIPSTA:netmask:\"", 8, Action::StationNetmask),
    pat(b"+CIPSTAMAC:\"", 7, Action::StationMac),
    pat(b"+CIPSTO:", 6, Action::Timeout),
    pat(b"+CIPMODE:", 4, Action::TransferMode),
    pat(b"+CIPMUX:", 5, Action::Multiplexing),
    pat(b"OK", 0, Action::Ok),
    pat(b"FAIL", 0, Action::Fail),
    pat(b"ERROR", 0, Action::Error),
    pat(b"SEND OK", 0, Action::SendOk),
    pat(b"SEND FAIL", 5, Action::SendFail),
    pat(b",CONNECT", 0, Action::Connected),
    pat(b",CLOSED", 2, Action::Closed),
    pat(b"DNS Fail", 0, Action::DnsFail),
    pat(b"WIFI DISCONNECT", 0, Action::WifiDisconnect),
    pat(b"WIFI CONNECT", 5, Action::WifiConnect),
    pat(b"WIFI GOT IP", 5, Action::WifiGotIp),
    pat(b"AT version:", 0, Action::Version),
    pat(b"No AP", 0, Action::NoAp),
    pat(b"ready\r", 0, Action::Ready),
];

impl<S: SerialPort> Adapter<S> {
    /// Drains and processes every currently pending byte, then calls the
    /// transport's [idle](SerialPort::idle) hook once.
    ///
    /// The foreground command methods pump this internally while waiting
    /// for their response flags. An embedder may also call it directly,
    /// e.g. from a main loop, to deliver unsolicited socket data promptly.
    ///
    /// Concurrency: the driver is built for cooperative scheduling. Running
    /// `receive()` on a dedicated thread requires a mutex serialising it
    /// against every foreground operation; concurrent foreground commands
    /// are not supported in any mode.
    pub fn receive(&mut self) {
        loop {
            match self.serial.read_byte() {
                Ok(byte) => self.feed(byte),
                Err(nb::Error::WouldBlock) => break,
            }
        }
        self.serial.idle();
    }

    /// Spins [receive](Self::receive) until `done` observes the adapter in
    /// the awaited state.
    pub(crate) fn wait_until(&mut self, done: fn(&Self) -> bool) {
        while !done(self) {
            self.receive();
        }
    }

    /// Clears the verdict flags, then pumps the engine until the modem
    /// answers `OK`, `FAIL` or `ERROR`. True iff the answer was `OK`.
    pub(crate) fn wait_ok_fail(&mut self) -> bool {
        self.resp_ok = false;
        self.resp_fail = false;
        self.resp_error = false;
        self.wait_until(|adapter| adapter.resp_ok || adapter.resp_fail || adapter.resp_error);
        self.resp_ok
    }

    /// Resets every flag, session and the matcher, as after power-on.
    ///
    /// With `notify` set, an installed accept handler receives
    /// [AcceptEvent::ModuleReset] and every open not-yet-disconnected
    /// session's receive handler gets [SocketEvent::End] first. This is the
    /// recovery path when the modem announces `ready` mid-stream after an
    /// unexpected reset.
    pub fn clear(&mut self, notify: bool) {
        if notify {
            if let Some(accept) = self.accept_handler {
                accept(AcceptEvent::ModuleReset);
            }
        }

        for link_id in 0..SOCKET_COUNT {
            let session = &mut self.sessions[link_id];
            if notify && session.open && !session.disconnected {
                if let Some(callback) = session.recv {
                    callback(link_id, SocketEvent::End);
                }
            }
            *session = Session::default();
        }

        self.parser = Parser::default();
        for slot in &mut self.captures {
            slot.clear();
        }

        self.channel = -1;
        self.strength = -1;

        self.ready = false;
        self.wifi_connected = false;
        self.wifi_got_ip = false;
        self.resp_ok = false;
        self.resp_fail = false;
        self.resp_error = false;
        self.resp_dnsfail = false;
        self.resp_closed = false;
        self.send_ready = false;
        self.send_ok = false;
        self.send_fail = false;

        self.last_error = None;
        self.accept_handler = None;
    }

    /// Advances the matcher by one inbound byte.
    fn feed(&mut self, byte: u8) {
        if byte == b'\n' {
            self.parser.first = b'\n';
            self.parser.s0 = 0;
            self.parser.ss = 0;
            return;
        }

        if self.parser.first == b'\n' {
            // Adopt the line anchor
            self.parser.first = byte;
            if byte.is_ascii_digit() {
                self.parser.first = b'9';
                self.parser.resp_id = 0;
            } else if byte == b'>' {
                // CIPSEND prompt, no line terminator follows
                self.send_ready = true;
                self.parser.first = 0;
                return;
            }
        } else if self.parser.first == 0 {
            return;
        }

        if self.parser.first == b'9' {
            if byte == b',' {
                // Session id complete, match ",CONNECT" / ",CLOSED" next
                self.parser.first = b',';
                self.parser.s0 = 0;
                self.parser.ss = 0;
            } else {
                if byte.is_ascii_digit() {
                    self.parser.resp_id = self
                        .parser
                        .resp_id
                        .wrapping_mul(10)
                        .wrapping_add(i32::from(byte - b'0'));
                }
                return;
            }
        }

        if self.parser.ss == 0 {
            let anchor = self.parser.first;
            match PATTERNS.iter().position(|pattern| pattern.text[0] == anchor) {
                Some(index) => self.parser.s0 = index,
                None => {
                    self.parser.first = 0;
                    return;
                }
            }
        }

        if byte != PATTERNS[self.parser.s0].text[self.parser.ss] && !self.fallback(byte) {
            self.parser.first = 0;
            return;
        }

        self.parser.ss += 1;
        let pattern = &PATTERNS[self.parser.s0];
        if self.parser.ss == pattern.text.len() {
            let action = pattern.action;
            self.dispatch(action);
            if action != Action::InboundData {
                self.parser.first = 0;
            }
        }
    }

    /// Walks forward over consecutive patterns sharing the already matched
    /// prefix and adopts the one diverging into `byte`. Returns false if
    /// none does.
    fn fallback(&mut self, byte: u8) -> bool {
        let matched = self.parser.ss;
        let current = PATTERNS[self.parser.s0].text;

        for index in self.parser.s0 + 1..PATTERNS.len() {
            let candidate = &PATTERNS[index];
            if candidate.text.len() < matched || candidate.text[..matched] != current[..matched] {
                break;
            }
            if candidate.shared == matched && candidate.text[matched] == byte {
                self.parser.s0 = index;
                return true;
            }
        }

        false
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::InboundData => self.on_inbound_data(),
            Action::AutoConnect => {
                let byte = read_blocking(&mut self.serial);
                self.parser.resp_id = i32::from(byte != b'0');
            }
            Action::JoinedAp => {
                // +CWJAP:"ssid","mac",channel,rssi
                self.wifi_connected = true;
                let _ = self.read_field(0, b'"');
                let _ = self.skip_until(0, b'"');
                let stop = self.read_field(1, b'"');
                let _ = self.skip_until(stop, b',');
                let _ = self.read_field(2, b',');
                let _ = self.read_field(3, b'\r');
            }
            Action::SoftAp => {
                // +CWSAP:"ssid","password",channel,ecn
                let stop = self.read_field(0, b'"');
                let stop = self.skip_until(stop, b',');
                let _ = self.skip_until(stop, b'"');
                let stop = self.read_field(1, b'"');
                let _ = self.skip_until(stop, b',');
                let _ = self.read_field(2, b',');
                let _ = self.read_field(3, b'\r');
            }
            Action::ApIp => {
                let _ = self.read_field(0, b'"');
                // Refreshes the IP flag for is_wifi(); 0.0.0.0 means the
                // interface has no lease yet
                if !self.wifi_got_ip && self.capture_str(0) != "0.0.0.0" {
                    self.wifi_got_ip = true;
                }
            }
            Action::ApGateway => {
                let _ = self.read_field(1, b'"');
            }
            Action::ApNetmask => {
                let _ = self.read_field(2, b'"');
            }
            Action::ApMac | Action::StationMac => {
                let _ = self.read_field(0, b'"');
            }
            Action::StationIp => {
                let _ = self.read_field(0, b'"');
            }
            Action::StationGateway => {
                let _ = self.read_field(1, b'"');
            }
            Action::StationNetmask => {
                let _ = self.read_field(2, b'"');
            }
            Action::Timeout | Action::TransferMode | Action::Multiplexing => {
                let _ = self.read_id();
            }
            Action::Ok => self.resp_ok = true,
            Action::Fail => self.resp_fail = true,
            Action::Error => self.resp_error = true,
            Action::SendOk => self.send_ok = true,
            Action::SendFail => self.send_fail = true,
            Action::Connected => {
                let link_id = self.parser.resp_id;
                if let Ok(link_id) = usize::try_from(link_id) {
                    if let Some(session) = self.sessions.get_mut(link_id) {
                        if !session.open {
                            session.open = true;
                            session.connected = true;
                            session.disconnected = false;
                            if let Some(accept) = self.accept_handler {
                                accept(AcceptEvent::Connection(link_id));
                            }
                        }
                    }
                }
            }
            Action::Closed => {
                self.resp_closed = true;
                if let Ok(link_id) = usize::try_from(self.parser.resp_id) {
                    if let Some(session) = self.sessions.get_mut(link_id) {
                        if session.open && !session.disconnected {
                            session.connected = false;
                            if let Some(callback) = session.recv {
                                callback(link_id, SocketEvent::End);
                            }
                            session.disconnected = true;
                        }
                    }
                }
            }
            Action::DnsFail => self.resp_dnsfail = true,
            Action::WifiDisconnect | Action::NoAp => {
                self.wifi_connected = false;
                self.wifi_got_ip = false;
            }
            Action::WifiConnect => self.wifi_connected = true,
            Action::WifiGotIp => self.wifi_got_ip = true,
            Action::Version => {
                let _ = self.read_field(0, b'\r');
            }
            Action::Ready => {
                self.clear(true);
                self.ready = true;
            }
        }
    }

    /// `+IPD,<id>,<len>:` — streams exactly `<len>` payload bytes into the
    /// target session's receive handler. Unknown or closed sessions drain
    /// the payload with no side effect. UDP sessions get a trailing
    /// [SocketEvent::End] marking the datagram boundary.
    fn on_inbound_data(&mut self) {
        let _ = self.read_id(); // stops on ','
        self.parser.ipd_id = self.parser.resp_id;
        let _ = self.read_id(); // stops on ':'
        self.parser.ipd_len = self.parser.resp_id;

        let link_id = usize::try_from(self.parser.ipd_id).unwrap_or(usize::MAX);
        let (recv, udp) = match self.sessions.get(link_id) {
            Some(session) if session.open => (session.recv, session.udp),
            _ => (None, false),
        };

        while self.parser.ipd_len > 0 {
            let byte = read_blocking(&mut self.serial);
            self.parser.ipd_len -= 1;
            if let Some(callback) = recv {
                callback(link_id, SocketEvent::Data(byte));
            }
        }

        if udp {
            if let Some(callback) = recv {
                callback(link_id, SocketEvent::End);
            }
        }

        self.parser.first = b'\n';
        self.parser.s0 = 0;
        self.parser.ss = 0;
        self.parser.resp_id = 0;
        self.parser.ipd_id = 0;
        self.parser.ipd_len = 0;
    }

    /// Reads decimal digits into `resp_id`, returning the stop byte.
    fn read_id(&mut self) -> u8 {
        self.parser.resp_id = 0;
        loop {
            let byte = read_blocking(&mut self.serial);
            if !byte.is_ascii_digit() {
                return byte;
            }
            self.parser.resp_id = self
                .parser
                .resp_id
                .wrapping_mul(10)
                .wrapping_add(i32::from(byte - b'0'));
        }
    }

    /// Copies bytes into capture slot `slot` until `stop` or CR, silently
    /// truncating at the slot capacity, and returns the stop byte.
    fn read_field(&mut self, slot: usize, stop: u8) -> u8 {
        self.captures[slot].clear();
        loop {
            let byte = read_blocking(&mut self.serial);
            if byte == stop || byte == b'\r' {
                return byte;
            }
            let _ = self.captures[slot].push(byte);
        }
    }

    /// Advances past bytes until `stop` is seen, giving up at CR.
    fn skip_until(&mut self, mut byte: u8, stop: u8) -> u8 {
        loop {
            if byte == stop {
                return byte;
            }
            byte = read_blocking(&mut self.serial);
            if byte == b'\r' {
                return byte;
            }
        }
    }

    /// Current content of a capture slot as text.
    pub(crate) fn capture_str(&self, slot: usize) -> &str {
        core::str::from_utf8(&self.captures[slot]).unwrap_or("")
    }

    /// Drains a capture slot into an owned string, truncating to `N`.
    pub(crate) fn capture_string<const N: usize>(&self, slot: usize) -> heapless::String<N> {
        let mut out = heapless::String::new();
        for ch in self.capture_str(slot).chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        out
    }

    /// Parses a capture slot as a decimal integer.
    pub(crate) fn capture_int(&self, slot: usize) -> i32 {
        crate::numeric::parse_decimal(self.capture_str(slot))
    }

    /// Empties every capture slot before a query command is issued.
    pub(crate) fn clear_captures(&mut self) {
        for slot in &mut self.captures {
            slot.clear();
        }
    }
}
