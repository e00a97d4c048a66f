//! Key-group types for partitioned keyed state.
//!
//! Keyed state is sharded into *key groups*: every application key is
//! deterministically assigned to one group, and each store instance owns a
//! contiguous range of groups. The group id is the leading component of
//! every composite state key, so all entries of one group are physically
//! adjacent in the ordered store and can be handed off during rebalancing
//! with a single range scan.

use serde::{Deserialize, Serialize};

/// The largest supported number of key groups.
///
/// The key-group prefix occupies at most two bytes, and the id space is
/// capped at 15 bits so a group id can never collide with the sign bit of
/// downstream consumers that treat ids as signed 16-bit values.
pub const MAX_KEY_GROUPS: u16 = 32767;

/// Identifies the partition a keyed-state entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyGroup(u16);

impl KeyGroup {
    /// Create a `KeyGroup` from a raw id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Assign a key group from the serialized bytes of an application key.
    ///
    /// The assignment is a pure function of the key bytes and the
    /// configured number of key groups, so every writer and reader places
    /// a given key in the same group.
    ///
    /// # Panics
    ///
    /// Panics if `num_key_groups` is zero or exceeds [`MAX_KEY_GROUPS`].
    #[must_use]
    pub fn for_key(serialized_key: &[u8], num_key_groups: u16) -> Self {
        assert!(
            num_key_groups > 0 && num_key_groups <= MAX_KEY_GROUPS,
            "number of key groups must be in 1..={MAX_KEY_GROUPS}, got {num_key_groups}"
        );
        #[allow(clippy::cast_possible_truncation)]
        let id = (fnv1a(serialized_key) % u64::from(num_key_groups)) as u16;
        Self(id)
    }
}

impl From<u16> for KeyGroup {
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

/// FNV-1a over raw bytes.
#[inline]
fn fnv1a(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// An inclusive range `[start, end]` of key groups owned by one store
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGroupRange {
    start: KeyGroup,
    end: KeyGroup,
}

impl KeyGroupRange {
    /// Create a range covering `start..=end`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    #[must_use]
    pub fn new(start: KeyGroup, end: KeyGroup) -> Self {
        assert!(
            start <= end,
            "key group range start {} exceeds end {}",
            start.as_u16(),
            end.as_u16()
        );
        Self { start, end }
    }

    /// The range covering all groups of a store configured with
    /// `num_key_groups` groups, i.e. `0..=num_key_groups - 1`.
    ///
    /// # Panics
    ///
    /// Panics if `num_key_groups` is zero.
    #[must_use]
    pub fn full(num_key_groups: u16) -> Self {
        assert!(num_key_groups > 0, "number of key groups must be positive");
        Self::new(KeyGroup::new(0), KeyGroup::new(num_key_groups - 1))
    }

    /// The first group in the range.
    #[must_use]
    pub const fn start(self) -> KeyGroup {
        self.start
    }

    /// The last group in the range (inclusive).
    #[must_use]
    pub const fn end(self) -> KeyGroup {
        self.end
    }

    /// The number of groups in the range.
    #[must_use]
    pub const fn len(self) -> usize {
        self.end.as_u16() as usize - self.start.as_u16() as usize + 1
    }

    /// An inclusive range is never empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    /// Whether `group` falls inside the range.
    #[must_use]
    pub const fn contains(self, group: KeyGroup) -> bool {
        self.start.as_u16() <= group.as_u16() && group.as_u16() <= self.end.as_u16()
    }

    /// Iterate the groups in the range in ascending order.
    pub fn iter(self) -> impl Iterator<Item = KeyGroup> {
        (self.start.as_u16()..=self.end.as_u16()).map(KeyGroup::new)
    }
}

/// The fixed width of the key-group prefix for one store instance.
///
/// Chosen once from the configured number of key groups and never changed
/// for the lifetime of a store: every encoded key in the store must use the
/// same width, or decoding is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyGroupPrefix {
    /// One prefix byte; addresses key groups 0..=255.
    One,
    /// Two prefix bytes; addresses key groups 0..=65535.
    Two,
}

impl KeyGroupPrefix {
    /// Compute the prefix width required for `num_key_groups` groups.
    ///
    /// A single byte addresses ids 0..=255, so two bytes are only needed
    /// when more than 256 groups are configured.
    #[must_use]
    pub const fn for_key_groups(num_key_groups: u16) -> Self {
        if num_key_groups > 256 {
            Self::Two
        } else {
            Self::One
        }
    }

    /// The width in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_group_roundtrip() {
        let group = KeyGroup::new(42);
        assert_eq!(group.as_u16(), 42);
    }

    #[test]
    fn assignment_is_deterministic() {
        let a = KeyGroup::for_key(b"user-7", 128);
        let b = KeyGroup::for_key(b"user-7", 128);
        assert_eq!(a, b);
        assert!(a.as_u16() < 128);
    }

    #[test]
    fn assignment_spreads_keys() {
        // Not a statistical test, just a guard against a constant hash.
        let groups: std::collections::HashSet<_> =
            (0..100u32).map(|i| KeyGroup::for_key(&i.to_be_bytes(), 128)).collect();
        assert!(groups.len() > 1);
    }

    #[test]
    #[should_panic(expected = "number of key groups")]
    fn assignment_rejects_zero_groups() {
        let _ = KeyGroup::for_key(b"k", 0);
    }

    #[test]
    fn range_contains_and_len() {
        let range = KeyGroupRange::new(KeyGroup::new(8), KeyGroup::new(15));
        assert_eq!(range.len(), 8);
        assert!(range.contains(KeyGroup::new(8)));
        assert!(range.contains(KeyGroup::new(15)));
        assert!(!range.contains(KeyGroup::new(7)));
        assert!(!range.contains(KeyGroup::new(16)));
    }

    #[test]
    fn range_iterates_in_order() {
        let range = KeyGroupRange::new(KeyGroup::new(3), KeyGroup::new(5));
        let ids: Vec<u16> = range.iter().map(KeyGroup::as_u16).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn full_range_covers_all_groups() {
        let range = KeyGroupRange::full(128);
        assert_eq!(range.start(), KeyGroup::new(0));
        assert_eq!(range.end(), KeyGroup::new(127));
        assert_eq!(range.len(), 128);
    }

    #[test]
    fn prefix_width_boundary() {
        assert_eq!(KeyGroupPrefix::for_key_groups(1), KeyGroupPrefix::One);
        assert_eq!(KeyGroupPrefix::for_key_groups(128), KeyGroupPrefix::One);
        assert_eq!(KeyGroupPrefix::for_key_groups(256), KeyGroupPrefix::One);
        assert_eq!(KeyGroupPrefix::for_key_groups(257), KeyGroupPrefix::Two);
        assert_eq!(KeyGroupPrefix::for_key_groups(MAX_KEY_GROUPS), KeyGroupPrefix::Two);
    }

    #[test]
    fn prefix_byte_widths() {
        assert_eq!(KeyGroupPrefix::One.bytes(), 1);
        assert_eq!(KeyGroupPrefix::Two.bytes(), 2);
    }
}
