//! 64-bit draw call sort key.
//!
//! ```text
//! 63      44 43        32 31    24 23            8 7      0
//! | unused  | bucket (12) | slice(8)| definition(16) | split(8)|
//! ```
//!
//! Ascending order groups draw calls by bucket first, then by slice, so
//! draws that share texture state end up adjacent.

use crate::core::{Error, Result};

const BUCKET_SHIFT: u32 = 32;
const SLICE_SHIFT: u32 = 24;
const ID_SHIFT: u32 = 8;
const SPLIT_SHIFT: u32 = 0;

pub const BUCKET_BITS: u32 = 12;
pub const SLICE_BITS: u32 = 8;
pub const ID_BITS: u32 = 16;
pub const SPLIT_BITS: u32 = 8;

/// Unpacked sort key fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeyFields {
    pub bucket: u16,
    pub slice: u8,
    pub id: u16,
    pub split: u8,
}

/// Packed draw call sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SortKey(pub u64);

fn field(name: &'static str, value: u32, bits: u32) -> Result<u64> {
    if (value as u64) >> bits != 0 {
        return Err(Error::SortKeyOverflow {
            field: name,
            value: value as u64,
            bits,
        });
    }
    Ok(value as u64)
}

impl SortKey {
    /// Pack the fields, failing when one does not fit its width
    pub fn try_pack(bucket: u32, slice: u32, id: u32, split: u32) -> Result<Self> {
        Ok(Self(
            field("bucket", bucket, BUCKET_BITS)? << BUCKET_SHIFT
                | field("slice", slice, SLICE_BITS)? << SLICE_SHIFT
                | field("id", id, ID_BITS)? << ID_SHIFT
                | field("split", split, SPLIT_BITS)? << SPLIT_SHIFT,
        ))
    }

    pub fn unpack(self) -> SortKeyFields {
        let mask = |shift: u32, bits: u32| (self.0 >> shift) & ((1u64 << bits) - 1);
        SortKeyFields {
            bucket: mask(BUCKET_SHIFT, BUCKET_BITS) as u16,
            slice: mask(SLICE_SHIFT, SLICE_BITS) as u8,
            id: mask(ID_SHIFT, ID_BITS) as u16,
            split: mask(SPLIT_SHIFT, SPLIT_BITS) as u8,
        }
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<SortKeyFields> for SortKey {
    fn from(f: SortKeyFields) -> Self {
        Self(
            (f.bucket as u64 & ((1 << BUCKET_BITS) - 1)) << BUCKET_SHIFT
                | (f.slice as u64) << SLICE_SHIFT
                | (f.id as u64) << ID_SHIFT
                | (f.split as u64) << SPLIT_SHIFT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let key = SortKey::try_pack(0x123, 0x45, 0x0678, 0x9A).expect("pack failed");
        assert_eq!(key.value(), 0x0000_0123_4506_789A);
        assert_eq!(
            key.unpack(),
            SortKeyFields { bucket: 0x123, slice: 0x45, id: 0x678, split: 0x9A }
        );
    }

    #[test]
    fn test_small_ids_keep_twelve_bit_layout() {
        // Keys for ids below 4096 are identical to a 12-bit id field
        let key = SortKey::try_pack(0x222, 1, 4095, 3).expect("pack failed");
        let legacy = (0x222u64 << 32) | (1 << 24) | ((4095 & 0xFFF) << 8) | 3;
        assert_eq!(key.value(), legacy);
        // Catalog ids up to 6500 do not collide
        let a = SortKey::try_pack(0, 0, 100, 0).expect("pack failed");
        let b = SortKey::try_pack(0, 0, 100 + 4096, 0).expect("pack failed");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ordering_precedence() {
        let k = |b, s, i, p| SortKey::try_pack(b, s, i, p).expect("pack failed");
        assert!(k(1, 0, 0, 0) > k(0, 255, 65535, 255));
        assert!(k(1, 1, 0, 0) > k(1, 0, 65535, 255));
        assert!(k(1, 1, 2, 0) > k(1, 1, 1, 255));
        assert!(k(1, 1, 2, 1) > k(1, 1, 2, 0));
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(matches!(
            SortKey::try_pack(0x1000, 0, 0, 0),
            Err(Error::SortKeyOverflow { field: "bucket", bits: 12, .. })
        ));
        assert!(SortKey::try_pack(0, 256, 0, 0).is_err());
        assert!(SortKey::try_pack(0, 0, 65536, 0).is_err());
        assert!(SortKey::try_pack(0, 0, 0, 256).is_err());
    }

    #[test]
    fn test_fields_round_trip() {
        let fields = SortKeyFields { bucket: 0xFFF, slice: 7, id: 6500, split: 2 };
        assert_eq!(SortKey::from(fields).unpack(), fields);
    }
}
