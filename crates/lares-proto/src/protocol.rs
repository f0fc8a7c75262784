//! Resolution protocols the codec speaks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The protocol a packet belongs to.
///
/// The protocol is fixed at packet construction and selects the header
/// flag layout, the IDNA direction of the name codec, the cache-flush
/// handling of the class field and the per-protocol validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Classic unicast DNS (RFC 1035).
    Dns,
    /// Multicast DNS (RFC 6762).
    Mdns,
    /// Link-Local Multicast Name Resolution (RFC 4795).
    Llmnr,
}

impl Protocol {
    /// Returns the lowercase protocol name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Mdns => "mdns",
            Self::Llmnr => "llmnr",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dns" => Ok(Self::Dns),
            "mdns" => Ok(Self::Mdns),
            "llmnr" => Ok(Self::Llmnr),
            _ => Err(crate::Error::malformed(0, "unknown protocol name")),
        }
    }
}
