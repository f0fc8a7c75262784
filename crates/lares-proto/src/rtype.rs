//! DNS record types and their classification.
//!
//! Record keys carry the type as a raw `u16` so unknown types survive a
//! round trip; [`RecordType`] names the codes this codec understands and
//! provides the classification predicates the packet parser and the
//! extract pass rely on.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record type codes known to this codec.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum RecordType {
    /// IPv4 address - RFC 1035
    A = 1,
    /// Authoritative name server - RFC 1035
    NS = 2,
    /// Canonical name - RFC 1035
    CNAME = 5,
    /// Start of authority - RFC 1035
    SOA = 6,
    /// Domain name pointer - RFC 1035
    PTR = 12,
    /// Host information - RFC 1035
    HINFO = 13,
    /// Mail exchange - RFC 1035
    MX = 15,
    /// Text strings - RFC 1035
    TXT = 16,
    /// IPv6 address - RFC 3596
    AAAA = 28,
    /// Location - RFC 1876
    LOC = 29,
    /// Server selection - RFC 2782
    SRV = 33,
    /// Delegation name - RFC 6672
    DNAME = 39,
    /// EDNS(0) option pseudo-record - RFC 6891
    OPT = 41,
    /// Delegation signer - RFC 4034
    DS = 43,
    /// SSH key fingerprint - RFC 4255
    SSHFP = 44,
    /// DNSSEC signature - RFC 4034
    RRSIG = 46,
    /// Next secure - RFC 4034
    NSEC = 47,
    /// DNS public key - RFC 4034
    DNSKEY = 48,
    /// Next secure v3 - RFC 5155
    NSEC3 = 50,
    /// Sender policy framework - RFC 4408
    SPF = 99,
    /// Transaction key - RFC 2930
    TKEY = 249,
    /// Transaction signature - RFC 8945
    TSIG = 250,
    /// Incremental zone transfer - RFC 1995
    IXFR = 251,
    /// Full zone transfer - RFC 1035
    AXFR = 252,
    /// Any type - RFC 1035
    ANY = 255,
}

impl RecordType {
    /// Returns the numeric type code.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::PTR => "PTR",
            Self::HINFO => "HINFO",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::AAAA => "AAAA",
            Self::LOC => "LOC",
            Self::SRV => "SRV",
            Self::DNAME => "DNAME",
            Self::OPT => "OPT",
            Self::DS => "DS",
            Self::SSHFP => "SSHFP",
            Self::RRSIG => "RRSIG",
            Self::NSEC => "NSEC",
            Self::DNSKEY => "DNSKEY",
            Self::NSEC3 => "NSEC3",
            Self::TKEY => "TKEY",
            Self::TSIG => "TSIG",
            Self::IXFR => "IXFR",
            Self::AXFR => "AXFR",
            Self::SPF => "SPF",
            Self::ANY => "ANY",
        };
        f.write_str(name)
    }
}

/// Returns true for type codes that never name record payload: meta and
/// query-only types that must not appear in NSEC/NSEC3 type bitmaps
/// (RFC 4034 §4.1.2).
#[inline]
pub fn type_is_pseudo(rtype: u16) -> bool {
    matches!(
        RecordType::try_from(rtype),
        Ok(RecordType::ANY
            | RecordType::AXFR
            | RecordType::IXFR
            | RecordType::OPT
            | RecordType::TSIG
            | RecordType::TKEY)
    )
}

/// Returns true for type codes acceptable as resource records in a packet.
#[inline]
pub fn type_is_valid_rr(rtype: u16) -> bool {
    rtype != 0
        && !matches!(
            RecordType::try_from(rtype),
            Ok(RecordType::ANY | RecordType::AXFR | RecordType::IXFR)
        )
}

/// Returns true for type codes acceptable in a question section.
///
/// Meta types are refused outright; RRSIG, NSEC and NSEC3 are refused as
/// explicit question types because they are signatures over payload rather
/// than payload and cannot be resolved on their own.
#[inline]
pub fn type_is_valid_query(rtype: u16) -> bool {
    rtype != 0
        && !matches!(
            RecordType::try_from(rtype),
            Ok(RecordType::OPT
                | RecordType::TSIG
                | RecordType::TKEY
                | RecordType::RRSIG
                | RecordType::NSEC
                | RecordType::NSEC3)
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_values() {
        assert_eq!(RecordType::A.to_u16(), 1);
        assert_eq!(RecordType::AAAA.to_u16(), 28);
        assert_eq!(RecordType::OPT.to_u16(), 41);
        assert_eq!(RecordType::try_from(33u16).unwrap(), RecordType::SRV);
        assert!(RecordType::try_from(42u16).is_err());
    }

    #[test]
    fn test_pseudo_types() {
        assert!(type_is_pseudo(RecordType::OPT.into()));
        assert!(type_is_pseudo(RecordType::ANY.into()));
        assert!(type_is_pseudo(RecordType::TSIG.into()));
        assert!(!type_is_pseudo(RecordType::A.into()));
        assert!(!type_is_pseudo(RecordType::NSEC.into()));
    }

    #[test]
    fn test_valid_rr_types() {
        assert!(type_is_valid_rr(RecordType::A.into()));
        assert!(type_is_valid_rr(RecordType::OPT.into()));
        assert!(type_is_valid_rr(RecordType::TSIG.into()));
        assert!(!type_is_valid_rr(0));
        assert!(!type_is_valid_rr(RecordType::ANY.into()));
        assert!(!type_is_valid_rr(RecordType::AXFR.into()));
    }

    #[test]
    fn test_valid_query_types() {
        assert!(type_is_valid_query(RecordType::A.into()));
        assert!(type_is_valid_query(RecordType::ANY.into()));
        assert!(type_is_valid_query(RecordType::SRV.into()));
        assert!(!type_is_valid_query(0));
        assert!(!type_is_valid_query(RecordType::OPT.into()));
        assert!(!type_is_valid_query(RecordType::RRSIG.into()));
        assert!(!type_is_valid_query(RecordType::NSEC.into()));
        assert!(!type_is_valid_query(RecordType::NSEC3.into()));
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordType::DNSKEY.to_string(), "DNSKEY");
        assert_eq!(RecordType::SPF.to_string(), "SPF");
    }
}
