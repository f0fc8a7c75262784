//! Resource records and the extracted answer list.

use crate::question::ResourceKey;
use crate::rdata::RData;
use crate::rtype::RecordType;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One resource record: key, TTL and typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Owner name, type and class.
    pub key: ResourceKey,
    /// Time to live in seconds.
    pub ttl: u32,
    /// Typed payload.
    pub rdata: RData,
    /// Set when the payload of a known type failed to parse; `rdata` then
    /// holds the raw RDATA bytes so re-serialization is lossless.
    pub unparseable: bool,
}

impl ResourceRecord {
    /// Creates a record with a parsed payload.
    pub fn new(key: ResourceKey, ttl: u32, rdata: RData) -> Self {
        Self {
            key,
            ttl,
            rdata,
            unparseable: false,
        }
    }

    /// Creates a record whose payload is kept as raw bytes.
    pub fn unparseable(key: ResourceKey, ttl: u32, raw: Vec<u8>) -> Self {
        Self {
            key,
            ttl,
            rdata: RData::Generic(raw),
            unparseable: true,
        }
    }

    /// Returns true if this is an EDNS(0) OPT pseudo-record.
    #[inline]
    pub fn is_opt(&self) -> bool {
        self.key.rtype == RecordType::OPT.to_u16()
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.ttl, self.rdata)
    }
}

bitflags! {
    /// Flags the extract pass attaches to each answer item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AnswerFlags: u8 {
        /// The record came from the Answer section and may be cached.
        const CACHEABLE = 1 << 0;

        /// mDNS record without the cache-flush bit: the owner name's
        /// record set is collectively owned (RFC 6762 §10.2).
        const SHARED_OWNER = 1 << 1;
    }
}

/// One record of the extracted answer list with its reception context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerItem {
    /// The record.
    pub rr: ResourceRecord,
    /// Interface index the packet arrived on, zero if unknown.
    pub ifindex: u32,
    /// Cacheability and ownership flags.
    pub flags: AnswerFlags,
}

/// The answer, authority and additional records of a packet, in wire
/// order, with the OPT pseudo-record filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    items: Vec<AnswerItem>,
}

impl Answer {
    /// Creates an empty answer list with room for `n` records.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            items: Vec::with_capacity(n),
        }
    }

    /// Appends a record with its context.
    pub fn push(&mut self, rr: ResourceRecord, ifindex: u32, flags: AnswerFlags) {
        self.items.push(AnswerItem { rr, ifindex, flags });
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the items.
    #[inline]
    pub fn items(&self) -> &[AnswerItem] {
        &self.items
    }

    /// Iterates the records.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.items.iter().map(|i| &i.rr)
    }
}
