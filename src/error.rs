//! Driver error surface.

/// Failure kinds reported by the driver.
///
/// Every failing operation records its kind in the adapter's last-error
/// slot besides returning it, s. [last_error](crate::wifi::Adapter::last_error).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The modem answered `FAIL` or `ERROR`, or a preceding query confirmed
    /// an inconsistent state that could not be rectified
    Fail,

    /// Programmer error: bad socket id, datagram address on a TCP socket
    Invalid,

    /// `ERROR` response accompanied by a `DNS Fail` line
    DnsFail,

    /// Write attempted on a socket whose session observed a remote close
    Disconnected,

    /// No free session slot left
    Resource,
}

impl Error {
    /// Short English text for the error kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Error::Fail => "Fail",
            Error::Invalid => "Invalid",
            Error::DnsFail => "DNS Fail",
            Error::Disconnected => "Disconnected",
            Error::Resource => "Resource",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
