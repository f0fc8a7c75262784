//! Typed record data.
//!
//! [`RData`] is the tagged payload variant of a resource record,
//! discriminated by the key's type code. Unknown types, and known types
//! whose payload failed to parse, are kept as [`RData::Generic`] so a
//! later re-serialization reproduces the original RDATA bytes.
//!
//! The per-type wire layouts live in the packet append and read modules;
//! this module only defines the in-memory shape and display forms.

use crate::bitmap::TypeBitmap;
use compact_str::CompactString;
use data_encoding::{BASE32HEX_NOPAD, BASE64, HEXLOWER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// One string of a TXT or SPF record: 0 to 255 raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxtItem(pub Vec<u8>);

impl TxtItem {
    /// Returns the item bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for TxtItem {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for TxtItem {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

/// Typed record payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RData {
    /// IPv4 address (RFC 1035).
    A(Ipv4Addr),

    /// IPv6 address (RFC 3596).
    Aaaa(Ipv6Addr),

    /// Authoritative name server (RFC 1035).
    Ns(CompactString),

    /// Canonical name (RFC 1035).
    Cname(CompactString),

    /// Delegation name (RFC 6672).
    Dname(CompactString),

    /// Domain name pointer (RFC 1035).
    Ptr(CompactString),

    /// Start of authority (RFC 1035).
    Soa {
        mname: CompactString,
        rname: CompactString,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },

    /// Mail exchange (RFC 1035).
    Mx {
        priority: u16,
        exchange: CompactString,
    },

    /// Server selection (RFC 2782).
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: CompactString,
    },

    /// Text strings (RFC 1035). An empty record is one zero-length item.
    Txt(Vec<TxtItem>),

    /// Sender policy framework (RFC 4408); wire-identical to TXT.
    Spf(Vec<TxtItem>),

    /// Host information (RFC 1035).
    Hinfo { cpu: String, os: String },

    /// Location, version 0 only (RFC 1876).
    Loc {
        version: u8,
        size: u8,
        horiz_pre: u8,
        vert_pre: u8,
        latitude: u32,
        longitude: u32,
        altitude: u32,
    },

    /// Delegation signer (RFC 4034).
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },

    /// SSH key fingerprint (RFC 4255).
    Sshfp {
        algorithm: u8,
        fptype: u8,
        fingerprint: Vec<u8>,
    },

    /// DNS public key (RFC 4034).
    Dnskey {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        key: Vec<u8>,
    },

    /// DNSSEC signature (RFC 4034).
    Rrsig {
        type_covered: u16,
        algorithm: u8,
        labels: u8,
        original_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer: CompactString,
        signature: Vec<u8>,
    },

    /// Next secure (RFC 4034).
    Nsec {
        next_domain_name: CompactString,
        types: TypeBitmap,
    },

    /// Next secure v3 (RFC 5155).
    Nsec3 {
        algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed_name: Vec<u8>,
        types: TypeBitmap,
    },

    /// Raw payload: unknown types, unparseable payloads of known types,
    /// and the OPT pseudo-record body.
    Generic(Vec<u8>),
}

impl RData {
    /// Returns the raw bytes if this is a generic payload.
    pub fn as_generic(&self) -> Option<&[u8]> {
        match self {
            Self::Generic(data) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{addr}"),
            Self::Aaaa(addr) => write!(f, "{addr}"),
            Self::Ns(name) | Self::Cname(name) | Self::Dname(name) | Self::Ptr(name) => {
                write!(f, "{name}")
            }
            Self::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            Self::Mx { priority, exchange } => write!(f, "{priority} {exchange}"),
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Txt(items) | Self::Spf(items) => {
                let mut first = true;
                for item in items {
                    if !first {
                        f.write_str(" ")?;
                    }
                    first = false;
                    write!(f, "\"{}\"", String::from_utf8_lossy(item.as_bytes()))?;
                }
                Ok(())
            }
            Self::Hinfo { cpu, os } => write!(f, "\"{cpu}\" \"{os}\""),
            Self::Loc {
                version,
                size,
                horiz_pre,
                vert_pre,
                latitude,
                longitude,
                altitude,
            } => write!(
                f,
                "v{version} {size:#04x} {horiz_pre:#04x} {vert_pre:#04x} {latitude} {longitude} {altitude}"
            ),
            Self::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => write!(
                f,
                "{key_tag} {algorithm} {digest_type} {}",
                HEXLOWER.encode(digest)
            ),
            Self::Sshfp {
                algorithm,
                fptype,
                fingerprint,
            } => write!(f, "{algorithm} {fptype} {}", HEXLOWER.encode(fingerprint)),
            Self::Dnskey {
                flags,
                protocol,
                algorithm,
                key,
            } => write!(f, "{flags} {protocol} {algorithm} {}", BASE64.encode(key)),
            Self::Rrsig {
                type_covered,
                algorithm,
                labels,
                original_ttl,
                expiration,
                inception,
                key_tag,
                signer,
                signature,
            } => write!(
                f,
                "{type_covered} {algorithm} {labels} {original_ttl} {expiration} {inception} {key_tag} {signer} {}",
                BASE64.encode(signature)
            ),
            Self::Nsec {
                next_domain_name,
                types,
            } => write!(f, "{next_domain_name} {types}"),
            Self::Nsec3 {
                algorithm,
                flags,
                iterations,
                salt,
                next_hashed_name,
                types,
            } => {
                let salt = if salt.is_empty() {
                    "-".to_string()
                } else {
                    HEXLOWER.encode(salt)
                };
                write!(
                    f,
                    "{algorithm} {flags} {iterations} {salt} {} {types}",
                    BASE32HEX_NOPAD.encode(next_hashed_name)
                )
            }
            Self::Generic(data) => write!(f, "\\# {} {}", data.len(), HEXLOWER.encode(data)),
        }
    }
}
