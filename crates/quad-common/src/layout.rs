//! Virtual Address Layout
//!
//! The virtual address space is partitioned into ten disjoint, contiguous
//! ranges, one per (storage class, scalar type) pair that the language can
//! store. An address's numeric value alone identifies where a value lives
//! and what scalar type it has; the compiler allocates out of these ranges
//! and the machine routes reads and writes by them. Both sides link against
//! this module, so the scheme cannot drift between them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ScalarType;

/// Number of addresses in each range
pub const SEGMENT_CAPACITY: u32 = 1000;

/// Range bases, ascending and non-overlapping
pub const GLOBAL_INT_BASE: u32 = 1000;
pub const GLOBAL_FLOAT_BASE: u32 = 2000;
pub const LOCAL_INT_BASE: u32 = 3000;
pub const LOCAL_FLOAT_BASE: u32 = 4000;
pub const TEMP_INT_BASE: u32 = 5000;
pub const TEMP_FLOAT_BASE: u32 = 6000;
pub const TEMP_BOOL_BASE: u32 = 7000;
pub const CONST_INT_BASE: u32 = 8000;
pub const CONST_FLOAT_BASE: u32 = 9000;
pub const CONST_STRING_BASE: u32 = 10000;

/// First address past the last range
pub const ADDRESS_SPACE_END: u32 = CONST_STRING_BASE + SEGMENT_CAPACITY;

/// Storage class of a virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    /// Lives in the single global store for the whole run
    Global,
    /// Lives in the current activation frame
    Local,
    /// Expression temporary, also frame-scoped
    Temp,
    /// Read-only, loaded once from the constant pool
    Constant,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Global => "global",
            Self::Local => "local",
            Self::Temp => "temp",
            Self::Constant => "const",
        };
        write!(f, "{}", name)
    }
}

/// The segment a virtual address falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub class: StorageClass,
    pub ty: ScalarType,
    pub base: u32,
}

/// All ten segments, ascending by base address
pub const SEGMENTS: [Segment; 10] = [
    Segment { class: StorageClass::Global, ty: ScalarType::Integer, base: GLOBAL_INT_BASE },
    Segment { class: StorageClass::Global, ty: ScalarType::Float, base: GLOBAL_FLOAT_BASE },
    Segment { class: StorageClass::Local, ty: ScalarType::Integer, base: LOCAL_INT_BASE },
    Segment { class: StorageClass::Local, ty: ScalarType::Float, base: LOCAL_FLOAT_BASE },
    Segment { class: StorageClass::Temp, ty: ScalarType::Integer, base: TEMP_INT_BASE },
    Segment { class: StorageClass::Temp, ty: ScalarType::Float, base: TEMP_FLOAT_BASE },
    Segment { class: StorageClass::Temp, ty: ScalarType::Boolean, base: TEMP_BOOL_BASE },
    Segment { class: StorageClass::Constant, ty: ScalarType::Integer, base: CONST_INT_BASE },
    Segment { class: StorageClass::Constant, ty: ScalarType::Float, base: CONST_FLOAT_BASE },
    Segment { class: StorageClass::Constant, ty: ScalarType::StringLit, base: CONST_STRING_BASE },
];

/// Look up the segment a virtual address belongs to.
///
/// Returns `None` for addresses outside every range; the machine treats
/// those as a segmentation fault.
pub fn segment_of(address: u32) -> Option<Segment> {
    if !(GLOBAL_INT_BASE..ADDRESS_SPACE_END).contains(&address) {
        return None;
    }
    let index = ((address - GLOBAL_INT_BASE) / SEGMENT_CAPACITY) as usize;
    Some(SEGMENTS[index])
}

/// The base address for a (storage class, scalar type) pair, if that pair
/// has a range at all
pub fn base_of(class: StorageClass, ty: ScalarType) -> Option<u32> {
    SEGMENTS
        .iter()
        .find(|s| s.class == class && s.ty == ty)
        .map(|s| s.base)
}

/// Whether an address falls in one of the read-only constant ranges
pub fn is_constant_address(address: u32) -> bool {
    matches!(segment_of(address), Some(s) if s.class == StorageClass::Constant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_disjoint_and_ascending() {
        for pair in SEGMENTS.windows(2) {
            assert!(pair[0].base + SEGMENT_CAPACITY <= pair[1].base);
        }
    }

    #[test]
    fn segment_lookup_round_trips() {
        for segment in SEGMENTS {
            assert_eq!(segment_of(segment.base), Some(segment));
            assert_eq!(segment_of(segment.base + SEGMENT_CAPACITY - 1), Some(segment));
        }
    }

    #[test]
    fn out_of_range_addresses_have_no_segment() {
        assert_eq!(segment_of(0), None);
        assert_eq!(segment_of(GLOBAL_INT_BASE - 1), None);
        assert_eq!(segment_of(ADDRESS_SPACE_END), None);
        assert_eq!(segment_of(u32::MAX), None);
    }

    #[test]
    fn constant_ranges_are_read_only() {
        assert!(is_constant_address(CONST_INT_BASE));
        assert!(is_constant_address(CONST_FLOAT_BASE + 3));
        assert!(is_constant_address(CONST_STRING_BASE));
        assert!(!is_constant_address(GLOBAL_INT_BASE));
        assert!(!is_constant_address(TEMP_BOOL_BASE));
    }

    #[test]
    fn pairs_without_a_range_have_no_base() {
        assert_eq!(base_of(StorageClass::Global, ScalarType::Boolean), None);
        assert_eq!(base_of(StorageClass::Local, ScalarType::StringLit), None);
        assert_eq!(base_of(StorageClass::Temp, ScalarType::StringLit), None);
        assert_eq!(
            base_of(StorageClass::Constant, ScalarType::StringLit),
            Some(CONST_STRING_BASE)
        );
    }
}
