use core::fmt;

/// One wire communication error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying pin.
    Other(E),
    /// No presence pulse was sampled after the reset pulse.
    NoDevicePresent,
    /// The line was still held low at the end of the reset window.
    BusStuck,
    /// Computed CRC of the received block is invalid.
    InvalidCrc,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}

impl<E: fmt::Debug> fmt::Display for OneWireError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(e) => write!(f, "pin error: {e:?}"),
            Self::NoDevicePresent => f.write_str("no presence pulse after reset"),
            Self::BusStuck => f.write_str("line held low after reset window"),
            Self::InvalidCrc => f.write_str("CRC mismatch"),
        }
    }
}
