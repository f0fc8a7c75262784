//! Resource keys and the question section.

use crate::class::CLASS_IN;
use crate::name;
use crate::rtype::RecordType;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lookup key of a resource record set: owner name, type and class.
///
/// The name is escaped text in fully-qualified form (`"foo.example."`).
/// Type and class stay raw `u16` so keys for unknown types survive a
/// round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Owner name in escaped text form.
    pub name: CompactString,
    /// Record type code.
    pub rtype: u16,
    /// Record class.
    pub class: u16,
}

impl ResourceKey {
    /// Creates a key in the Internet class.
    pub fn new(name: impl Into<CompactString>, rtype: u16) -> Self {
        Self {
            name: name.into(),
            rtype,
            class: CLASS_IN,
        }
    }

    /// Creates a key with an explicit class.
    pub fn with_class(name: impl Into<CompactString>, rtype: u16, class: u16) -> Self {
        Self {
            name: name.into(),
            rtype,
            class,
        }
    }

    /// Returns true if the owner name is the root domain.
    #[inline]
    pub fn is_root(&self) -> bool {
        name::is_root(&self.name)
    }

    /// Compares two keys; the owner name comparison is insensitive to
    /// ASCII case and escape form.
    pub fn equal(&self, other: &ResourceKey) -> bool {
        self.rtype == other.rtype
            && self.class == other.class
            && name::equal(&self.name, &other.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.name)?;

        if self.class == CLASS_IN {
            f.write_str("IN ")?;
        } else {
            write!(f, "CLASS{} ", self.class)?;
        }

        match RecordType::try_from(self.rtype) {
            Ok(rt) => write!(f, "{rt}"),
            Err(_) => write!(f, "TYPE{}", self.rtype),
        }
    }
}

/// The question section of a packet: an ordered list of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    keys: Vec<ResourceKey>,
}

impl Question {
    /// Creates an empty question list with room for `n` keys.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            keys: Vec::with_capacity(n),
        }
    }

    /// Appends a key.
    #[inline]
    pub fn push(&mut self, key: ResourceKey) {
        self.keys.push(key);
    }

    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the keys.
    #[inline]
    pub fn keys(&self) -> &[ResourceKey] {
        &self.keys
    }
}
