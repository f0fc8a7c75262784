//! # lares DNS protocol library
//!
//! Wire-format codec for the lares local resolver, covering classic unicast
//! DNS (RFC 1035), Link-Local Multicast Name Resolution (RFC 4795) and
//! Multicast DNS (RFC 6762), with the DNSSEC record types of RFC 4034/5155
//! and EDNS(0) (RFC 6891).
//!
//! The central type is [`Packet`]: one owned, growable byte buffer with an
//! append side (serialization, with name compression) and a read side
//! (parsing, with pointer-loop defenses). [`Packet::extract`] materializes
//! the question and answer sections once into typed [`Question`] and
//! [`Answer`] values that outlive the packet.
//!
//! ## Example
//!
//! ```rust
//! use lares_proto::{Packet, Protocol, ResourceKey, RecordType};
//!
//! let key = ResourceKey::new("example.com.", RecordType::A.into());
//! let mut p = Packet::new_query(Protocol::Dns, 1500, false);
//! p.append_key(&key).unwrap();
//! p.set_qdcount(1);
//! // hand p.data() to the transceiver
//! ```
//!
//! The codec performs no I/O and holds no global state apart from the
//! read-only rcode and protocol name tables.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitmap;
pub mod class;
pub mod error;
pub mod name;
pub mod packet;
pub mod protocol;
pub mod question;
pub mod rcode;
pub mod rdata;
pub mod record;
pub mod rtype;

// Re-exports for convenience
pub use bitmap::TypeBitmap;
pub use error::{Error, Result};
pub use packet::Packet;
pub use protocol::Protocol;
pub use question::{Question, ResourceKey};
pub use rcode::Rcode;
pub use rdata::{RData, TxtItem};
pub use record::{Answer, AnswerFlags, AnswerItem, ResourceRecord};
pub use rtype::RecordType;

/// Size of the fixed DNS message header (RFC 1035 §4.1.1).
pub const HEADER_SIZE: usize = 12;

/// Maximum length of a single label (RFC 1035 §2.3.4).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum wire length of a domain name, including length bytes and the
/// root label (RFC 1035 §2.3.4).
pub const MAX_NAME_LENGTH: usize = 255;

/// Largest packet the codec will ever hold or produce.
pub const MAX_PACKET_SIZE: usize = 65_535;

/// Maximum UDP payload without EDNS(0) (RFC 1035 §4.2.1); also the smallest
/// size an OPT record may advertise.
pub const UNICAST_PACKET_SIZE_MAX: u16 = 512;

/// Initial buffer size when no usable MTU hint is given.
pub const PACKET_SIZE_START: usize = 512;

/// Bytes of IP + UDP framing subtracted from the MTU hint when sizing a
/// fresh packet buffer.
pub const UDP_HEADER_SIZE: usize = 20 + 8;

/// Highest offset a 14-bit compression pointer can reference.
pub const COMPRESSION_OFFSET_MAX: usize = 0x3FFF;
