//! Typed results for the query commands.
//!
//! Each struct is drained from the receive engine's capture slots after the
//! terminating `OK`; field capacities bound what is kept of each captured
//! string.
use heapless::String;

/// Result of `AT+CWJAP?` — the currently joined access point.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct ApInfo {
    /// SSID of the joined access point, empty if none
    pub ssid: String<32>,

    /// BSSID (MAC) of the access point
    pub mac: String<20>,

    /// Radio channel
    pub channel: i32,

    /// Signal strength in dBm (negative)
    pub strength: i32,
}

/// Encryption scheme reported by `AT+CWSAP?`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApEcn {
    Open,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
}

impl ApEcn {
    pub(crate) fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::WpaPsk),
            2 => Some(Self::Wpa2Psk),
            3 => Some(Self::WpaWpa2Psk),
            _ => None,
        }
    }
}

/// Result of `AT+CWSAP?` — the soft access point configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftApConfig {
    /// SSID announced by the soft AP
    pub ssid: String<32>,

    /// Passphrase, empty for an open AP
    pub password: String<64>,

    /// Radio channel
    pub channel: i32,

    /// Encryption scheme
    pub ecn: ApEcn,
}

/// Result of `AT+CIPAP?` / `AT+CIPSTA?` — address, gateway and netmask of
/// the soft-AP respectively station interface.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct IpConfig {
    /// Interface IPv4 address in dotted-quad text form
    pub ip: String<16>,

    /// Gateway address
    pub gateway: String<16>,

    /// Network mask
    pub netmask: String<16>,
}
