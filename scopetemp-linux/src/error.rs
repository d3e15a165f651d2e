use std::{error::Error, fmt};

/// Errors from the host side of the link.
#[derive(Debug)]
pub enum HostError {
    /// No connection is held. Call [`connect`](crate::ScopeTemp::connect) first.
    LinkUnavailable,
    /// No attached device matched the identity.
    DeviceNotFound,
    /// A read transfer returned fewer bytes than requested.
    ShortRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes received.
        got: usize,
    },
    /// The USB backend failed.
    Backend(Box<dyn Error + Send + Sync>),
}

impl HostError {
    /// Wrap a backend error.
    pub fn backend<E: Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Backend(Box::new(e))
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkUnavailable => f.write_str("not connected"),
            Self::DeviceNotFound => f.write_str("no matching device found"),
            Self::ShortRead { expected, got } => {
                write!(f, "short read: expected {expected} bytes, got {got}")
            }
            Self::Backend(e) => write!(f, "usb: {e}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
