//! Configuration for keyed-state stores.

use serde::{Deserialize, Serialize};

use statedb_core::types::MAX_KEY_GROUPS;
use statedb_core::{KeyGroupPrefix, KeyGroupRange};

/// Partitioning configuration for one keyed-state store instance.
///
/// `max_parallelism` is the total number of key groups the job is sharded
/// into; it must be identical for every instance of the same job, since it
/// determines both key-group assignment and the key-group prefix width.
/// The key-group range is the slice of those groups this instance owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedStateConfig {
    max_parallelism: u16,
    key_group_range: KeyGroupRange,
}

impl KeyedStateConfig {
    /// Configuration for an instance owning all key groups.
    ///
    /// # Panics
    ///
    /// Panics if `max_parallelism` is zero or exceeds
    /// [`MAX_KEY_GROUPS`].
    #[must_use]
    pub fn new(max_parallelism: u16) -> Self {
        Self::with_range(max_parallelism, KeyGroupRange::full(max_parallelism))
    }

    /// Configuration for an instance owning `key_group_range` out of
    /// `max_parallelism` groups.
    ///
    /// # Panics
    ///
    /// Panics if `max_parallelism` is zero or exceeds [`MAX_KEY_GROUPS`],
    /// or if the range reaches past the last group.
    #[must_use]
    pub fn with_range(max_parallelism: u16, key_group_range: KeyGroupRange) -> Self {
        assert!(
            max_parallelism > 0 && max_parallelism <= MAX_KEY_GROUPS,
            "max parallelism must be in 1..={MAX_KEY_GROUPS}, got {max_parallelism}"
        );
        assert!(
            key_group_range.end().as_u16() < max_parallelism,
            "key group range end {} reaches past the last group {}",
            key_group_range.end().as_u16(),
            max_parallelism - 1
        );
        Self { max_parallelism, key_group_range }
    }

    /// The total number of key groups of the job.
    #[must_use]
    pub const fn max_parallelism(self) -> u16 {
        self.max_parallelism
    }

    /// The key groups owned by this instance.
    #[must_use]
    pub const fn key_group_range(self) -> KeyGroupRange {
        self.key_group_range
    }

    /// The key-group prefix width every key of this store uses.
    #[must_use]
    pub const fn key_group_prefix(self) -> KeyGroupPrefix {
        KeyGroupPrefix::for_key_groups(self.max_parallelism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statedb_core::KeyGroup;

    #[test]
    fn full_config_owns_every_group() {
        let config = KeyedStateConfig::new(128);
        assert_eq!(config.max_parallelism(), 128);
        assert_eq!(config.key_group_range().len(), 128);
        assert_eq!(config.key_group_prefix(), KeyGroupPrefix::One);
    }

    #[test]
    fn wide_parallelism_uses_two_prefix_bytes() {
        let config = KeyedStateConfig::new(4096);
        assert_eq!(config.key_group_prefix(), KeyGroupPrefix::Two);
    }

    #[test]
    fn partial_range_is_preserved() {
        let range = KeyGroupRange::new(KeyGroup::new(32), KeyGroup::new(63));
        let config = KeyedStateConfig::with_range(128, range);
        assert_eq!(config.key_group_range(), range);
    }

    #[test]
    #[should_panic(expected = "reaches past the last group")]
    fn range_past_last_group_is_rejected() {
        let range = KeyGroupRange::new(KeyGroup::new(0), KeyGroup::new(128));
        let _ = KeyedStateConfig::with_range(128, range);
    }

    #[test]
    #[should_panic(expected = "max parallelism")]
    fn zero_parallelism_is_rejected() {
        let _ = KeyedStateConfig::new(0);
    }
}
