//! Final weight assignment and next-key chain construction.
//!
//! Simple mode compacts the bucket walk into consecutive integer weights,
//! giving equal-comparing keys equal weights. Expansion mode keeps the full
//! element lists, bit-packed two words per element, and derives the
//! next-key chain from a primary-only ordering.

use tracing::debug;

use crate::element::{CeList, CompareOptions};
use crate::error::{CollationError, CollationResult};
use crate::output::{OptContraction, OptimizedCollation};
use crate::settings::{CaseFirst, CollationSettings, Strength};
use crate::stats::{compare_keys, WeightStats};
use crate::storage::UcaStorage;
use crate::types::{
    contraction_ref, contraction_ref_index, is_contraction_ref, Codepoint, CollationKey,
    MAX_EXPANSION_CE, MAX_WEIGHT,
};

/// Builds the optimized collation from the tailored storage.
pub(crate) fn create_optimized(
    storage: &UcaStorage,
    stats: &mut WeightStats,
    settings: &CollationSettings,
) -> CollationResult<OptimizedCollation> {
    let mut output = if settings.expansions {
        create_with_expansions(storage, settings)?
    } else {
        debug!("sorting weight key lists");
        stats.sort_buckets(storage, &settings.compare_options());
        create_simple(storage, stats, settings)?
    };

    if !output.contractions.is_empty() {
        output.optimize_contractions()?;
    }
    output.seal();
    Ok(output)
}

/// Writes a key's next-reference into the output arrays.
fn set_next(
    output: &mut OptimizedCollation,
    opt_position: &[Option<usize>],
    key: CollationKey,
    next: u32,
) -> CollationResult<()> {
    match key {
        CollationKey::Codepoint(cp) => {
            output.next[cp as usize] = next;
            Ok(())
        }
        CollationKey::Contraction(id) => {
            let position = opt_position
                .get(id)
                .copied()
                .flatten()
                .ok_or_else(|| CollationError::internal("contraction missing from output"))?;
            output.contractions[position].next = next;
            Ok(())
        }
        CollationKey::Expansion(_) => {
            Err(CollationError::internal("expansion key in next-chain"))
        }
    }
}

/// Encodes a key as a next-reference value.
fn next_reference(
    opt_position: &[Option<usize>],
    key: CollationKey,
) -> CollationResult<u32> {
    match key {
        CollationKey::Codepoint(cp) => Ok(cp),
        CollationKey::Contraction(id) => {
            let position = opt_position
                .get(id)
                .copied()
                .flatten()
                .ok_or_else(|| CollationError::internal("contraction missing from output"))?;
            Ok(contraction_ref(position))
        }
        CollationKey::Expansion(_) => {
            Err(CollationError::internal("expansion key in next-chain"))
        }
    }
}

fn contraction_text(storage: &UcaStorage, id: usize) -> CollationResult<(String, u8)> {
    let sequence = &storage.contractions()[id];
    let mut text = String::new();
    for &cp in &sequence.codepoints {
        let ch = char::from_u32(cp).ok_or_else(|| {
            CollationError::internal("contraction codepoint is not a scalar value")
        })?;
        text.push(ch);
    }
    Ok((text, sequence.codepoints.len() as u8))
}

/// Simple-mode optimizer: one compact weight per distinct comparison
/// class, next pointing at the first key of the following class.
fn create_simple(
    storage: &UcaStorage,
    stats: &WeightStats,
    settings: &CollationSettings,
) -> CollationResult<OptimizedCollation> {
    let max_cp = settings.max_codepoint as usize;
    let mut output = OptimizedCollation::new(settings.clone());
    output.weights = vec![u32::MAX; max_cp];
    output.next = vec![u32::MAX; max_cp];

    let opts = settings.compare_options();
    let mut opt_position: Vec<Option<usize>> = vec![None; storage.contractions().len()];

    // first walk: assign compact weights, equal keys sharing one value
    let mut current_weight = 0u32;
    let mut previous: Option<CollationKey> = None;
    for weight in 0..=MAX_WEIGHT {
        for &key in stats.bucket(weight) {
            if let Some(prev) = previous {
                if compare_keys(storage, &opts, prev, key) != std::cmp::Ordering::Equal {
                    current_weight += 1;
                }
            }

            match key {
                CollationKey::Codepoint(cp) => {
                    output.weights[cp as usize] = current_weight;
                }
                CollationKey::Contraction(id) => {
                    let (text, codepoint_count) = contraction_text(storage, id)?;
                    let mut entry = OptContraction::new(text, codepoint_count);
                    entry.weight = current_weight;
                    opt_position[id] = Some(output.contractions.len());
                    output.contractions.push(entry);
                }
                CollationKey::Expansion(_) => {
                    return Err(CollationError::internal("expansion key in weight bucket"));
                }
            }

            previous = Some(key);
        }
    }

    // second walk: every key of a class points at the next class's first key
    let mut equal_run: Vec<CollationKey> = Vec::new();
    let mut previous: Option<CollationKey> = None;
    for weight in 0..=MAX_WEIGHT {
        for &key in stats.bucket(weight) {
            if let Some(prev) = previous {
                if compare_keys(storage, &opts, prev, key) != std::cmp::Ordering::Equal {
                    let next = next_reference(&opt_position, key)?;
                    for &run_key in &equal_run {
                        set_next(&mut output, &opt_position, run_key, next)?;
                    }
                    equal_run.clear();
                }
            }
            equal_run.push(key);
            previous = Some(key);
        }
    }

    // the final class chains to the sentinel, the locale's last codepoint
    let sentinel = settings.max_codepoint - 1;
    for &run_key in &equal_run {
        set_next(&mut output, &opt_position, run_key, sentinel)?;
    }

    for cp in 0..max_cp {
        if output.weights[cp] == u32::MAX || output.next[cp] == u32::MAX {
            return Err(CollationError::internal(format!(
                "codepoint U+{cp:04X} received no weight or next value"
            )));
        }
    }

    Ok(output)
}

/// Packs levels 1-3 of every element into one word each:
/// bits 0-15 primary, 16-24 secondary, 25-31 tertiary.
fn pack_l13(ce_list: &CeList, words: &mut [u32]) {
    for index in 0..ce_list.len() {
        let l1 = u32::from(ce_list.weight(index, 0));
        let l2 = u32::from(ce_list.weight(index, 1)) & 0x1FF;
        let l3 = u32::from(ce_list.weight(index, 2)) & 0x7F;
        words[index] = (l3 << 25) | (l2 << 16) | l1;
    }
}

fn pack_l4(ce_list: &CeList, words: &mut [u16]) {
    for index in 0..ce_list.len() {
        words[index] = ce_list.weight(index, 3);
    }
}

/// Comparison policy for the expansion-mode next chain: primary level of
/// the first element only.
fn primary_only_options() -> CompareOptions {
    CompareOptions {
        strength: Strength::Primary,
        backwards: false,
        case_level: false,
        case_first: CaseFirst::Off,
        use_only_first_ce: true,
    }
}

fn decode_key(value: u32) -> CollationKey {
    if is_contraction_ref(value) {
        CollationKey::Contraction(contraction_ref_index(value))
    } else {
        CollationKey::Codepoint(value)
    }
}

/// Expansion-mode optimizer: full element lists in packed form, next
/// derived from a primary-only ordering over codepoints and contractions
/// together.
fn create_with_expansions(
    storage: &UcaStorage,
    settings: &CollationSettings,
) -> CollationResult<OptimizedCollation> {
    let max_cp = settings.max_codepoint as usize;
    let mut output = OptimizedCollation::new(settings.clone());

    let ce_depth = (0..max_cp)
        .map(|cp| {
            storage
                .ce_list(CollationKey::Codepoint(cp as Codepoint))
                .map_or(0, CeList::len)
        })
        .max()
        .unwrap_or(0);
    debug_assert!(ce_depth <= MAX_EXPANSION_CE);
    output.ce_depth = ce_depth;

    let use_level_4 = settings.strength.level_count() >= 4;
    output.l13_weights = vec![0; max_cp * ce_depth];
    if use_level_4 {
        output.l4_weights = vec![0; max_cp * ce_depth];
    }
    output.ce_counts = vec![0; max_cp];
    output.next = vec![u32::MAX; max_cp];

    let mut key_list: Vec<u32> = Vec::with_capacity(max_cp + storage.contractions().len());

    for cp in 0..max_cp {
        let ce_list = storage
            .ce_list(CollationKey::Codepoint(cp as Codepoint))
            .ok_or_else(|| CollationError::internal("codepoint outside storage"))?;
        output.ce_counts[cp] = ce_list.len() as u8;
        pack_l13(ce_list, &mut output.l13_weights[cp * ce_depth..]);
        if use_level_4 {
            pack_l4(ce_list, &mut output.l4_weights[cp * ce_depth..]);
        }
        key_list.push(cp as u32);
    }

    let mut opt_position: Vec<Option<usize>> = vec![None; storage.contractions().len()];
    for id in 0..storage.contractions().len() {
        let ce_list = storage.contractions()[id].ce;
        let (text, codepoint_count) = contraction_text(storage, id)?;
        let mut entry = OptContraction::new(text, codepoint_count);
        entry.weight = 0;
        entry.ce_count = ce_list.len() as u8;
        pack_l13(&ce_list, &mut entry.l13_weights);
        if use_level_4 {
            pack_l4(&ce_list, &mut entry.l4_weights);
        }
        opt_position[id] = Some(output.contractions.len());
        output.contractions.push(entry);
        key_list.push(contraction_ref(id));
    }

    let opts = primary_only_options();
    key_list.sort_by(|&a, &b| {
        compare_keys(storage, &opts, decode_key(a), decode_key(b)).then_with(|| a.cmp(&b))
    });

    // next: first following key comparing strictly greater at primary level
    for index in 0..key_list.len().saturating_sub(1) {
        let current = decode_key(key_list[index]);
        let mut next_key = decode_key(key_list[key_list.len() - 1]);
        for &candidate in &key_list[index + 1..] {
            let candidate = decode_key(candidate);
            if compare_keys(storage, &opts, current, candidate) == std::cmp::Ordering::Less {
                next_key = candidate;
                break;
            }
        }
        let next = next_reference(&opt_position, next_key)?;
        set_next(&mut output, &opt_position, current, next)?;
    }

    // the globally last key chains to itself
    if let Some(&last) = key_list.last() {
        let key = decode_key(last);
        let next = next_reference(&opt_position, key)?;
        set_next(&mut output, &opt_position, key, next)?;
    }

    Ok(output)
}
