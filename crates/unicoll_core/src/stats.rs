//! Weight statistics and key-list grouping.
//!
//! Counts how often each weight value occurs per level, verifies the
//! packed-output encoding budget, and groups every collatable key into a
//! bucket per primary weight. Buckets are kept exact while tailoring moves
//! keys between them, then sorted once before weight optimization.

use std::cmp::Ordering;

use crate::element::{compare_ce_lists, CeList, CompareOptions};
use crate::error::{CollationError, CollationResult};
use crate::settings::CollationSettings;
use crate::storage::UcaStorage;
use crate::types::{
    CollationKey, Weight, MAX_CODEPOINT, MAX_SECONDARY_WEIGHT, MAX_TERTIARY_WEIGHT, MAX_WEIGHT,
    WEIGHT_LEVELS,
};

/// Occurrence counts per weight level plus the primary-weight key buckets.
#[derive(Debug)]
pub struct WeightStats {
    occurrences: Vec<[u32; WEIGHT_LEVELS]>,
    buckets: Vec<Vec<CollationKey>>,
}

impl WeightStats {
    /// Scans the storage, checks the encoding budget and builds one key
    /// bucket per primary weight value.
    pub fn build(storage: &UcaStorage, settings: &CollationSettings) -> CollationResult<Self> {
        let mut occurrences = vec![[0u32; WEIGHT_LEVELS]; MAX_WEIGHT as usize + 1];

        let mut count = |ce_list: &CeList| {
            for index in 0..ce_list.len() {
                for level in 0..WEIGHT_LEVELS {
                    occurrences[ce_list.weight(index, level) as usize][level] += 1;
                }
            }
        };

        for cp in 0..=MAX_CODEPOINT {
            count(storage.ce_list(CollationKey::Codepoint(cp)).unwrap_or(&CeList::new()));
        }
        for contraction in storage.contractions() {
            count(&contraction.ce);
        }

        // The packed output stores 9 bits of secondary and 7 bits of
        // tertiary weight; reject tables that cannot fit.
        for (level, limit) in [(1, MAX_SECONDARY_WEIGHT), (2, MAX_TERTIARY_WEIGHT)] {
            let max_used = (0..=MAX_WEIGHT)
                .rev()
                .find(|w| occurrences[*w as usize][level] != 0)
                .unwrap_or(0);
            if max_used > limit {
                return Err(CollationError::WeightLimitExceeded {
                    level: level + 1,
                    weight: max_used,
                    limit,
                });
            }
        }

        let mut buckets: Vec<Vec<CollationKey>> = occurrences
            .iter()
            .map(|counts| Vec::with_capacity(counts[0] as usize))
            .collect();

        for cp in 0..settings.max_codepoint.min(MAX_CODEPOINT + 1) {
            let key = CollationKey::Codepoint(cp);
            if let Some(ce_list) = storage.ce_list(key) {
                buckets[ce_list.primary() as usize].push(key);
            }
        }
        for (id, contraction) in storage.contractions().iter().enumerate() {
            buckets[contraction.ce.primary() as usize].push(CollationKey::Contraction(id));
        }

        Ok(Self {
            occurrences,
            buckets,
        })
    }

    /// Keys currently grouped under a primary weight.
    #[must_use]
    pub fn bucket(&self, weight: Weight) -> &[CollationKey] {
        &self.buckets[weight as usize]
    }

    /// Number of buckets (one per representable primary weight).
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Sorts every bucket with the full-order comparator so downstream
    /// weight assignment never depends on table-scan order.
    pub fn sort_buckets(&mut self, storage: &UcaStorage, opts: &CompareOptions) {
        for bucket in &mut self.buckets {
            if bucket.len() > 1 {
                bucket.sort_by(|a, b| compare_keys_full_order(storage, opts, *a, *b));
            }
        }
    }

    /// Adds a key to the bucket of `weight`.
    pub(crate) fn add_key(&mut self, key: CollationKey, weight: Weight) {
        self.buckets[weight as usize].push(key);
    }

    /// Removes a key from the bucket of `weight`, preserving the order of
    /// the remaining keys.
    pub(crate) fn remove_key(&mut self, key: CollationKey, weight: Weight) {
        let bucket = &mut self.buckets[weight as usize];
        if let Some(position) = bucket.iter().position(|entry| *entry == key) {
            bucket.remove(position);
        }
    }

    /// Moves a key between the buckets of two primary weights.
    pub(crate) fn move_key(&mut self, key: CollationKey, from: Weight, to: Weight) {
        if from != to {
            self.remove_key(key, from);
            self.add_key(key, to);
        }
    }

    /// Registers a newly created contraction under its primary weight.
    pub(crate) fn record_new_contraction(&mut self, key: CollationKey, weight: Weight) {
        self.occurrences[weight as usize][0] += 1;
        self.add_key(key, weight);
    }
}

/// Compares two keys by their collation element lists, breaking ties
/// deterministically (codepoint value, codepoints before contractions) so
/// results never depend on scan order.
pub(crate) fn compare_keys_full_order(
    storage: &UcaStorage,
    opts: &CompareOptions,
    a: CollationKey,
    b: CollationKey,
) -> Ordering {
    compare_keys(storage, opts, a, b).then_with(|| a.tie_break(&b))
}

/// Compares two keys by their collation element lists alone.
pub(crate) fn compare_keys(
    storage: &UcaStorage,
    opts: &CompareOptions,
    a: CollationKey,
    b: CollationKey,
) -> Ordering {
    let empty = CeList::new();
    let ce_a = storage.ce_list(a).unwrap_or(&empty);
    let ce_b = storage.ce_list(b).unwrap_or(&empty);
    compare_ce_lists(ce_a, ce_b, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ducet::Ducet;
    use crate::settings::{ContractionPolicy, Strength};

    const SAMPLE: &str = "\
0061 ; [.1C47.0020.0002.0061] # a
0041 ; [.1C47.0020.0008.0041] # A
0062 ; [.1C60.0020.0002.0062] # b
0063 0068 ; [.1C47.0021.0002.0063] # ch sharing primary with a
";

    fn build_stats(settings: &CollationSettings) -> (UcaStorage, WeightStats) {
        let ducet = Ducet::parse(SAMPLE, settings.contractions);
        let storage = UcaStorage::from_ducet(&ducet, settings).unwrap();
        let stats = WeightStats::build(&storage, settings).unwrap();
        (storage, stats)
    }

    #[test]
    fn groups_keys_by_primary_weight() {
        let settings = CollationSettings::new()
            .contractions(ContractionPolicy::FROM_DUCET)
            .max_codepoint(0x100);
        let (_, stats) = build_stats(&settings);

        let bucket = stats.bucket(0x1C47);
        assert_eq!(bucket.len(), 3); // a, A, ch
        assert!(bucket.contains(&CollationKey::Codepoint(0x61)));
        assert!(bucket.contains(&CollationKey::Contraction(0)));
        assert_eq!(stats.bucket(0x1C60), &[CollationKey::Codepoint(0x62)]);
    }

    #[test]
    fn sorted_buckets_are_deterministic() {
        let settings = CollationSettings::new()
            .contractions(ContractionPolicy::FROM_DUCET)
            .max_codepoint(0x100);
        let (storage, mut stats) = build_stats(&settings);

        stats.sort_buckets(&storage, &settings.compare_options());
        let bucket = stats.bucket(0x1C47);
        // a < A at tertiary, ch sorts last on its secondary weight
        assert_eq!(
            bucket,
            &[
                CollationKey::Codepoint(0x61),
                CollationKey::Codepoint(0x41),
                CollationKey::Contraction(0),
            ]
        );
    }

    #[test]
    fn equal_keys_tie_break_on_codepoint() {
        let settings = CollationSettings::new()
            .strength(Strength::Primary)
            .max_codepoint(0x100);
        let (storage, mut stats) = build_stats(&settings);

        stats.sort_buckets(&storage, &settings.compare_options());
        // at primary strength a and A compare equal; codepoint order decides
        let bucket = stats.bucket(0x1C47);
        assert_eq!(
            bucket,
            &[CollationKey::Codepoint(0x41), CollationKey::Codepoint(0x61)]
        );
    }

    #[test]
    fn move_key_updates_buckets() {
        let settings = CollationSettings::new().max_codepoint(0x100);
        let (_, mut stats) = build_stats(&settings);

        let key = CollationKey::Codepoint(0x61);
        stats.move_key(key, 0x1C47, 0x1C60);
        assert!(!stats.bucket(0x1C47).contains(&key));
        assert!(stats.bucket(0x1C60).contains(&key));
    }

    #[test]
    fn secondary_budget_overflow_is_fatal() {
        let text = "0061 ; [.1C47.0200.0002.0061] # a with oversized secondary\n";
        let settings = CollationSettings::new().max_codepoint(0x100);
        let ducet = Ducet::parse(text, settings.contractions);
        let storage = UcaStorage::from_ducet(&ducet, &settings).unwrap();
        let err = WeightStats::build(&storage, &settings).unwrap_err();
        assert!(matches!(
            err,
            CollationError::WeightLimitExceeded { level: 2, .. }
        ));
    }
}
