//! NSEC/NSEC3 type bitmaps.
//!
//! A type bitmap is a set of 16-bit record type codes, carried on the wire
//! as a sequence of windows (RFC 4034 §4.1.2). The set is kept ordered so
//! window encoding is a single forward pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An ordered set of record type codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeBitmap(BTreeSet<u16>);

impl TypeBitmap {
    /// Creates an empty bitmap.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type code to the set.
    #[inline]
    pub fn insert(&mut self, rtype: u16) {
        self.0.insert(rtype);
    }

    /// Returns true if the type code is present.
    #[inline]
    pub fn contains(&self, rtype: u16) -> bool {
        self.0.contains(&rtype)
    }

    /// Returns true if no types are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of types set.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the type codes in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u16> for TypeBitmap {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for TypeBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for t in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match crate::RecordType::try_from(t) {
                Ok(rt) => write!(f, "{rt}")?,
                Err(_) => write!(f, "TYPE{t}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordType;

    #[test]
    fn test_ordered_iteration() {
        let bitmap: TypeBitmap = [28u16, 1, 15].into_iter().collect();
        let types: Vec<u16> = bitmap.iter().collect();
        assert_eq!(types, vec![1, 15, 28]);
    }

    #[test]
    fn test_display() {
        let bitmap: TypeBitmap = [RecordType::A.into(), RecordType::MX.into(), 731u16]
            .into_iter()
            .collect();
        assert_eq!(bitmap.to_string(), "A MX TYPE731");
    }
}
