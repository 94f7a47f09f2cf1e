//! Tailoring rule application.
//!
//! Absolute rules assign explicit weight ranges and always run first.
//! Relative rules reposition a key next to a reference key by rewriting its
//! collation element list, searching for a weight assignment that collides
//! with no existing key.

use tracing::debug;

use crate::ducet::Ducet;
use crate::element::CeList;
use crate::error::{CollationError, CollationResult};
use crate::rules::{AbsoluteRule, Direction, RuleAnchor, TailoringRule};
use crate::settings::CollationSettings;
use crate::stats::WeightStats;
use crate::storage::{SequenceKind, UcaStorage};
use crate::types::{
    Codepoint, CollationKey, Weight, MAX_EXPANSION_CE, MAX_WEIGHT, WEIGHT_LEVELS,
};

const DEFAULT_STEP: &str = "[0001.0000.0000.0000]";

/// Applies the locale's absolute rules in declaration order.
///
/// Each rule assigns its starting weights to the first codepoint of the
/// range and advances the weight cursor by the per-level step for every
/// following codepoint. Trailing all-zero elements are trimmed from each
/// assignment once more than one element is present.
pub(crate) fn apply_absolute_rules(
    storage: &mut UcaStorage,
    settings: &CollationSettings,
    rules: &[AbsoluteRule],
) -> CollationResult<()> {
    for (index, rule) in rules.iter().enumerate() {
        apply_absolute_rule(storage, settings, rule)
            .map_err(|err| wrap_rule_error(index, err))?;
    }
    Ok(())
}

fn apply_absolute_rule(
    storage: &mut UcaStorage,
    settings: &CollationSettings,
    rule: &AbsoluteRule,
) -> CollationResult<()> {
    let step_text = if rule.step.is_empty() {
        DEFAULT_STEP
    } else {
        rule.step.as_str()
    };
    let step = CeList::parse_weight_list(step_text)?;
    let start = CeList::parse_weight_list(&rule.start_weight)?;

    for cp in [rule.start, rule.end] {
        if cp >= settings.max_codepoint {
            return Err(CollationError::CodepointOutOfRange {
                codepoint: cp,
                max: settings.max_codepoint,
            });
        }
    }

    let span = u64::from(rule.end.saturating_sub(rule.start));
    let depth = start.len().max(step.len());

    // The whole range must stay representable on every level.
    for level in 0..WEIGHT_LEVELS {
        for ce in 0..depth {
            let reach = u64::from(start.weight(ce, level))
                + u64::from(step.weight(ce, level)) * span;
            if reach > u64::from(MAX_WEIGHT) {
                return Err(CollationError::weight_overflow(format!(
                    "range U+{:04X}..=U+{:04X} reaches weight {reach:#x} on level {}",
                    rule.start,
                    rule.end,
                    level + 1,
                )));
            }
        }
    }

    let mut cursor = start;
    cursor.set_len(depth);

    for cp in rule.start..=rule.end {
        let mut assigned = cursor;
        assigned.trim_trailing_empty();
        if let Some(ce_list) = storage.ce_list_mut(CollationKey::Codepoint(cp)) {
            *ce_list = assigned;
        }

        for level in 0..WEIGHT_LEVELS {
            for ce in 0..depth {
                let advanced =
                    u32::from(cursor.weight(ce, level)) + u32::from(step.weight(ce, level));
                cursor.set_weight(ce, level, advanced as Weight);
            }
        }
    }

    Ok(())
}

/// Applies the locale's relative rules in declaration order; the first
/// failing rule aborts the compilation, carrying its ordinal index.
pub(crate) fn apply_tailoring_rules(
    storage: &mut UcaStorage,
    stats: &mut WeightStats,
    ducet: &Ducet,
    settings: &CollationSettings,
    rules: &[TailoringRule],
) -> CollationResult<()> {
    for (index, rule) in rules.iter().enumerate() {
        apply_one_rule(storage, stats, ducet, settings, rule)
            .map_err(|err| wrap_rule_error(index, err))?;
    }
    Ok(())
}

fn wrap_rule_error(index: usize, err: CollationError) -> CollationError {
    match err {
        CollationError::InvalidRule { .. } => err,
        other => CollationError::invalid_rule(index, other.to_string()),
    }
}

fn apply_one_rule(
    storage: &mut UcaStorage,
    stats: &mut WeightStats,
    ducet: &Ducet,
    settings: &CollationSettings,
    rule: &TailoringRule,
) -> CollationResult<()> {
    let (anchor_key, mut ref_key) = match &rule.anchor {
        RuleAnchor::Position(position) => {
            let cp = ducet.logical_position(*position).ok_or_else(|| {
                CollationError::parse("logical position not assigned by the table")
            })?;
            if cp >= settings.max_codepoint {
                return Err(CollationError::CodepointOutOfRange {
                    codepoint: cp,
                    max: settings.max_codepoint,
                });
            }
            let key = CollationKey::Codepoint(cp);
            (key, key)
        }
        RuleAnchor::Text(text) => {
            let Some(anchor) = resolve_sequence_key(storage, settings, text, false)? else {
                return Ok(());
            };
            let Some(reference) =
                resolve_sequence_key(storage, settings, &rule.reference, true)?
            else {
                return Ok(());
            };
            (anchor, reference)
        }
    };

    if rule.expand_multiple {
        for ch in rule.target.chars() {
            let cp = ch as Codepoint;
            if cp >= settings.max_codepoint {
                return Err(CollationError::CodepointOutOfRange {
                    codepoint: cp,
                    max: settings.max_codepoint,
                });
            }
            let target = CollationKey::Codepoint(cp);
            apply_rule_to_key(storage, stats, rule, anchor_key, target, ref_key)?;
            ref_key = target;
        }
        return Ok(());
    }

    let codepoints: Vec<Codepoint> = rule.target.chars().map(|ch| ch as Codepoint).collect();
    let target = match codepoints.len() {
        0 => return Err(CollationError::parse("empty tailoring target")),
        1 => {
            let cp = codepoints[0];
            if cp >= settings.max_codepoint {
                return Err(CollationError::CodepointOutOfRange {
                    codepoint: cp,
                    max: settings.max_codepoint,
                });
            }
            CollationKey::Codepoint(cp)
        }
        _ => {
            if !settings.contractions.uses_tailoring() {
                debug!(target = %rule.target, "skipping contraction target, policy disabled");
                return Ok(());
            }
            match storage.find_contraction(&codepoints) {
                Some(id) => CollationKey::Contraction(id),
                None => {
                    let id = storage.add_sequence(
                        SequenceKind::Contraction,
                        &codepoints,
                        settings.max_codepoint,
                    )?;
                    let key = CollationKey::Contraction(id);
                    let primary = storage.contractions()[id].ce.primary();
                    stats.record_new_contraction(key, primary);
                    key
                }
            }
        }
    };

    apply_rule_to_key(storage, stats, rule, anchor_key, target, ref_key)
}

/// Resolves a literal character sequence to a collation key. Multi-codepoint
/// sequences resolve to an existing contraction, or to an expansion created
/// on demand when expansions are enabled. Returns `Ok(None)` when the rule
/// must be silently skipped under the locale's policies.
fn resolve_sequence_key(
    storage: &mut UcaStorage,
    settings: &CollationSettings,
    text: &str,
    check_max: bool,
) -> CollationResult<Option<CollationKey>> {
    let codepoints: Vec<Codepoint> = text.chars().map(|ch| ch as Codepoint).collect();
    match codepoints.len() {
        0 => Err(CollationError::parse("empty character sequence in rule")),
        1 => {
            let cp = codepoints[0];
            if check_max && cp >= settings.max_codepoint {
                return Err(CollationError::CodepointOutOfRange {
                    codepoint: cp,
                    max: settings.max_codepoint,
                });
            }
            Ok(Some(CollationKey::Codepoint(cp)))
        }
        _ => {
            if !settings.contractions.uses_tailoring() && !settings.expansions {
                return Ok(None);
            }
            if let Some(id) = storage.find_contraction(&codepoints) {
                return Ok(Some(CollationKey::Contraction(id)));
            }
            if !settings.expansions {
                return Ok(None);
            }
            let id = match storage.find_expansion(&codepoints) {
                Some(id) => id,
                None => storage
                    .add_sequence(SequenceKind::Expansion, &codepoints, settings.max_codepoint)
                    .map_err(|err| {
                        CollationError::parse(format!("cannot create expansion: {err}"))
                    })?,
            };
            Ok(Some(CollationKey::Expansion(id)))
        }
    }
}

fn apply_rule_to_key(
    storage: &mut UcaStorage,
    stats: &mut WeightStats,
    rule: &TailoringRule,
    anchor: CollationKey,
    target: CollationKey,
    reference: CollationKey,
) -> CollationResult<()> {
    match rule.level.depth() {
        None => apply_identity(storage, stats, target, reference),
        Some(depth) => {
            apply_directional(storage, stats, rule.direction, anchor, target, reference, depth)
        }
    }
}

/// Clones the reference key's element list into the target key.
fn apply_identity(
    storage: &mut UcaStorage,
    stats: &mut WeightStats,
    target: CollationKey,
    reference: CollationKey,
) -> CollationResult<()> {
    let reference_ce = *storage
        .ce_list(reference)
        .ok_or_else(|| CollationError::internal("reference key has no collation elements"))?;
    let target_ce = storage
        .ce_list(target)
        .ok_or_else(|| CollationError::internal("target key has no collation elements"))?;

    stats.move_key(target, target_ce.primary(), reference_ce.primary());

    if let Some(ce_list) = storage.ce_list_mut(target) {
        *ce_list = reference_ce;
    }
    Ok(())
}

/// Applies an after/before rule: clones the anchor's elements, overwrites
/// every level up to the target level from the reference, then adjusts the
/// target-level weight of the last element until the list collides with no
/// existing key.
fn apply_directional(
    storage: &mut UcaStorage,
    stats: &mut WeightStats,
    direction: Direction,
    anchor: CollationKey,
    target: CollationKey,
    reference: CollationKey,
    depth: usize,
) -> CollationResult<()> {
    let anchor_ce = *storage
        .ce_list(anchor)
        .ok_or_else(|| CollationError::internal("anchor key has no collation elements"))?;
    let reference_ce = *storage
        .ce_list(reference)
        .ok_or_else(|| CollationError::internal("reference key has no collation elements"))?;
    let old_primary = storage
        .ce_list(target)
        .ok_or_else(|| CollationError::internal("target key has no collation elements"))?
        .primary();

    let mut candidate = anchor_ce;
    candidate.set_len(candidate.len().max(reference_ce.len()));

    for level in 0..depth {
        for index in 0..candidate.len() {
            candidate.set_weight(index, level, reference_ce.weight(index, level));
        }
    }

    let level = depth - 1;
    loop {
        if candidate.len() > MAX_EXPANSION_CE {
            return Err(CollationError::CeListOverflow {
                direction: direction.as_str(),
            });
        }

        let mut reverted_weight = None;
        match direction {
            Direction::After => {
                let mut last = candidate.len() - 1;
                if candidate.weight(last, level) >= MAX_WEIGHT {
                    // no headroom on the last element, open a fresh one
                    candidate.set_len(candidate.len() + 1);
                    if candidate.len() > MAX_EXPANSION_CE {
                        return Err(CollationError::CeListOverflow {
                            direction: direction.as_str(),
                        });
                    }
                    last = candidate.len() - 1;
                } else {
                    reverted_weight = Some(candidate.weight(last, level));
                }
                let value = candidate.weight(last, level);
                candidate.set_weight(last, level, value + 1);
            }
            Direction::Before => {
                let last = candidate.len() - 1;
                let value = candidate.weight(last, level);
                if value > 0 {
                    candidate.set_weight(last, level, value - 1);
                } else {
                    // last element already at zero: walk back to the last
                    // element with a non-zero weight and saturate it
                    let mut index = candidate.len();
                    while index > 0 && candidate.weight(index - 1, level) == 0 {
                        index -= 1;
                    }
                    if index == 0 {
                        return Err(CollationError::CeListUnderflow);
                    }
                    candidate.set_weight(index - 1, level, MAX_WEIGHT);
                }
            }
        }

        if find_key_with_ce_prefix(storage, stats, &candidate, depth).is_none() {
            break;
        }

        // collision: extend the element list and retry
        match direction {
            Direction::After => {
                if let Some(previous) = reverted_weight {
                    let last = candidate.len() - 1;
                    candidate.set_weight(last, level, previous);
                }
                candidate.set_len(candidate.len() + 1);
            }
            Direction::Before => {
                candidate.set_len(candidate.len() + 1);
                if candidate.len() <= MAX_EXPANSION_CE {
                    let last = candidate.len() - 1;
                    candidate.set_weight(last, level, MAX_WEIGHT);
                }
            }
        }
    }

    stats.move_key(target, old_primary, candidate.primary());

    if let Some(ce_list) = storage.ce_list_mut(target) {
        *ce_list = candidate;
    }
    Ok(())
}

/// Searches the candidate's primary-weight bucket for a key whose element
/// list matches the candidate on every level up to `depth` across the
/// candidate's element count.
fn find_key_with_ce_prefix(
    storage: &UcaStorage,
    stats: &WeightStats,
    candidate: &CeList,
    depth: usize,
) -> Option<CollationKey> {
    let bucket = stats.bucket(candidate.primary());

    for key in bucket {
        let Some(ce_list) = storage.ce_list(*key) else {
            continue;
        };

        let matches = (0..depth).all(|level| {
            (0..candidate.len())
                .all(|index| ce_list.weight(index, level) == candidate.weight(index, level))
        });
        if matches {
            return Some(*key);
        }
    }

    None
}
