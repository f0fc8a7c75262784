//! DNS response codes.
//!
//! Defined in RFC 1035 §4.1.1 with extensions from RFC 2136, RFC 6891 and
//! RFC 7873. With EDNS(0) the code is 12 bits wide: 4 bits in the header
//! plus 8 bits in the OPT TTL field.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS response code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum Rcode {
    /// No error condition - RFC 1035
    NoError = 0,
    /// Format error - RFC 1035
    FormErr = 1,
    /// Server failure - RFC 1035
    ServFail = 2,
    /// The queried name does not exist - RFC 1035
    NXDomain = 3,
    /// Query kind not implemented - RFC 1035
    NotImp = 4,
    /// Query refused for policy reasons - RFC 1035
    Refused = 5,
    /// Name exists when it should not - RFC 2136
    YXDomain = 6,
    /// RR set exists when it should not - RFC 2136
    YXRRSet = 7,
    /// RR set that should exist does not - RFC 2136
    NXRRSet = 8,
    /// Server not authoritative for zone - RFC 2136
    NotAuth = 9,
    /// Name not contained in zone - RFC 2136
    NotZone = 10,
    /// Bad OPT version - RFC 6891
    BadVers = 16,
    /// Key not recognized - RFC 8945
    BadKey = 17,
    /// Signature out of time window - RFC 8945
    BadTime = 18,
    /// Bad TKEY mode - RFC 2930
    BadMode = 19,
    /// Duplicate key name - RFC 2930
    BadName = 20,
    /// Algorithm not supported - RFC 2930
    BadAlg = 21,
    /// Bad truncation - RFC 8945
    BadTrunc = 22,
    /// Bad or missing server cookie - RFC 7873
    BadCookie = 23,
}

impl Rcode {
    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Returns the 4-bit value carried in the header RCODE field.
    #[inline]
    pub const fn header_rcode(self) -> u8 {
        (self as u16 & 0x0F) as u8
    }

    /// Returns true if this code only fits with an EDNS(0) extension.
    #[inline]
    pub const fn is_extended(self) -> bool {
        (self as u16) > 15
    }

    /// Returns the conventional upper-case name of the code.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NXDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YXDomain => "YXDOMAIN",
            Self::YXRRSet => "YXRRSET",
            Self::NXRRSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::BadVers => "BADVERS",
            Self::BadKey => "BADKEY",
            Self::BadTime => "BADTIME",
            Self::BadMode => "BADMODE",
            Self::BadName => "BADNAME",
            Self::BadAlg => "BADALG",
            Self::BadTrunc => "BADTRUNC",
            Self::BadCookie => "BADCOOKIE",
        }
    }

    /// Looks up a code by its conventional name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NOERROR" => Some(Self::NoError),
            "FORMERR" => Some(Self::FormErr),
            "SERVFAIL" => Some(Self::ServFail),
            "NXDOMAIN" => Some(Self::NXDomain),
            "NOTIMP" => Some(Self::NotImp),
            "REFUSED" => Some(Self::Refused),
            "YXDOMAIN" => Some(Self::YXDomain),
            "YXRRSET" => Some(Self::YXRRSet),
            "NXRRSET" => Some(Self::NXRRSet),
            "NOTAUTH" => Some(Self::NotAuth),
            "NOTZONE" => Some(Self::NotZone),
            "BADVERS" => Some(Self::BadVers),
            "BADKEY" => Some(Self::BadKey),
            "BADTIME" => Some(Self::BadTime),
            "BADMODE" => Some(Self::BadMode),
            "BADNAME" => Some(Self::BadName),
            "BADALG" => Some(Self::BadAlg),
            "BADTRUNC" => Some(Self::BadTrunc),
            "BADCOOKIE" => Some(Self::BadCookie),
            _ => None,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rcode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(crate::Error::malformed(0, "unknown rcode name"))
    }
}
