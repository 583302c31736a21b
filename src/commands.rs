//! Outbound AT command emission.
//!
//! Commands are written piecewise straight onto the transport; the only
//! formatting needed is decimal integers, done via [crate::numeric] to keep
//! `core::fmt` out of the build. The verdict flags a command completes with
//! are cleared here, before the first byte leaves.
use crate::numeric::format_decimal;
use crate::serial::SerialPort;
use crate::stack::ConnectionKind;
use crate::wifi::Adapter;

impl<S: SerialPort> Adapter<S> {
    /// Writes a string byte by byte.
    pub(crate) fn write_str(&mut self, text: &str) {
        for byte in text.as_bytes() {
            self.serial.write_byte(*byte);
        }
    }

    /// Writes the command terminator.
    pub(crate) fn crlf(&mut self) {
        self.serial.write_byte(b'\r');
        self.serial.write_byte(b'\n');
    }

    /// Clears the verdict flags the next command completes with.
    pub(crate) fn clear_result_flags(&mut self) {
        self.resp_ok = false;
        self.resp_fail = false;
        self.resp_error = false;
    }

    /// Emits a complete argument-less command line.
    pub(crate) fn command(&mut self, cmd: &str) {
        self.clear_result_flags();
        self.write_str(cmd);
        self.crlf();
    }

    /// Emits `<prefix><value>`, e.g. `AT+CIPSTO=60`.
    pub(crate) fn command_with_int(&mut self, prefix: &str, value: i32) {
        let mut buf = [0u8; 12];
        self.clear_result_flags();
        self.write_str(prefix);
        self.write_str(format_decimal(value, &mut buf));
        self.crlf();
    }

    /// Emits `<prefix><value>"`, e.g. `AT+CIPAP="192.168.4.1"`. The prefix
    /// carries the opening quote.
    pub(crate) fn command_quoted(&mut self, prefix: &str, value: &str) {
        self.clear_result_flags();
        self.write_str(prefix);
        self.write_str(value);
        self.write_str("\"");
        self.crlf();
    }

    /// Emits `AT+CIPSTART=<id>,"TCP"|"UDP","<host>",<port>` plus the
    /// `,<local_port>,2` suffix for UDP sockets bound locally.
    ///
    /// Verdict flags are cleared by the caller together with the rest of
    /// the connect state.
    pub(crate) fn send_cipstart(
        &mut self,
        link_id: usize,
        kind: ConnectionKind,
        host: &str,
        port: u16,
        local_port: Option<u16>,
    ) {
        let mut buf = [0u8; 12];
        self.write_str("AT+CIPSTART=");
        self.write_str(format_decimal(link_id as i32, &mut buf));
        self.write_str(",\"");
        self.write_str(kind.token());
        self.write_str("\",\"");
        self.write_str(host);
        self.write_str("\",");
        self.write_str(format_decimal(i32::from(port), &mut buf));
        if let Some(local_port) = local_port {
            self.write_str(",");
            self.write_str(format_decimal(i32::from(local_port), &mut buf));
            self.write_str(",2");
        }
        self.crlf();
    }

    /// Emits `AT+CIPSEND=<id>,["<addr>",]<len>` announcing a payload of
    /// exactly `length` raw bytes.
    pub(crate) fn send_cipsend(&mut self, link_id: usize, length: usize, udp_address: Option<&str>) {
        let mut buf = [0u8; 12];
        self.clear_result_flags();
        self.write_str("AT+CIPSEND=");
        self.write_str(format_decimal(link_id as i32, &mut buf));
        self.write_str(",");
        if let Some(address) = udp_address {
            // Per-datagram target, not supported by every firmware
            self.write_str("\"");
            self.write_str(address);
            self.write_str("\",");
        }
        self.write_str(format_decimal(length as i32, &mut buf));
        self.crlf();
    }
}
