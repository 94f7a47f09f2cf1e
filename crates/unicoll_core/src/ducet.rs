//! Default Unicode Collation Element Table loader.
//!
//! Parses the `allkeys`-format table into a dense per-codepoint element
//! array plus a contraction list. The loaded table is immutable and shared
//! by every collation instance built from it; [`DucetCache`] hands out the
//! same table while path and contraction policy stay unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::element::CeList;
use crate::error::CollationResult;
use crate::rules::LogicalPosition;
use crate::settings::ContractionPolicy;
use crate::storage::CodepointSequence;
use crate::types::{Codepoint, Weight, MAX_CODEPOINT, MAX_EXPANSION_CE, MAX_SEQUENCE_CP};

const LOGICAL_SLOTS: usize = 12;

/// The loaded default collation element table.
#[derive(Debug)]
pub struct Ducet {
    codepoints: Vec<CeList>,
    contractions: Vec<CodepointSequence>,
    logical: [Option<Codepoint>; LOGICAL_SLOTS],
    entry_count: usize,
}

impl Ducet {
    /// Loads the table from a file.
    pub fn load(path: &Path, policy: ContractionPolicy) -> CollationResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text, policy))
    }

    /// Parses the table from its text form.
    ///
    /// Structurally unusable lines (no comment, no `;`, codepoints beyond
    /// the table bound) are skipped, matching the tolerant scan of the
    /// upstream data which freely mixes entries with annotations. Every
    /// codepoint absent from the data receives UCA implicit weights.
    #[must_use]
    pub fn parse(text: &str, policy: ContractionPolicy) -> Self {
        let mut table = Self {
            codepoints: vec![CeList::new(); MAX_CODEPOINT as usize + 1],
            contractions: Vec::new(),
            logical: [None; LOGICAL_SLOTS],
            entry_count: 0,
        };

        for line in text.lines() {
            table.parse_line(line, policy);
        }

        debug!(
            entries = table.entry_count,
            contractions = table.contractions.len(),
            "ducet scan complete"
        );

        // Synthesize implicit weights for codepoints the table omits.
        for cp in 0..=MAX_CODEPOINT {
            if table.codepoints[cp as usize].is_empty() {
                table.codepoints[cp as usize] = implicit_ce_list(cp);
            }
        }

        table
    }

    fn parse_line(&mut self, line: &str, policy: ContractionPolicy) {
        if line.starts_with('#') {
            return;
        }
        // Lines without a trailing comment carry no entry (@version etc.).
        let Some((data, _)) = line.split_once('#') else {
            return;
        };
        let Some((cp_text, weight_text)) = data.split_once(';') else {
            return;
        };

        let mut codepoints = Vec::new();
        for token in cp_text.split_whitespace().take(MAX_SEQUENCE_CP) {
            let Ok(cp) = Codepoint::from_str_radix(token, 16) else {
                return;
            };
            if cp > MAX_CODEPOINT {
                return;
            }
            codepoints.push(cp);
        }
        if codepoints.is_empty() {
            return;
        }

        let Some((ce_list, variable)) = parse_weight_groups(weight_text) else {
            return;
        };

        if codepoints.len() > 1 {
            if !policy.uses_ducet() {
                return;
            }
            self.contractions.push(CodepointSequence {
                codepoints: codepoints.clone(),
                ce: ce_list,
            });
        } else {
            self.codepoints[codepoints[0] as usize] = ce_list;
        }
        self.entry_count += 1;

        self.record_logical_positions(codepoints[0], &ce_list, variable);
    }

    /// Tracks which codepoints occupy the named table positions, observed
    /// in scan order: "first" sticks, "last" follows.
    fn record_logical_positions(&mut self, cp: Codepoint, ce_list: &CeList, variable: bool) {
        if variable {
            self.mark(LogicalPosition::FirstVariable, LogicalPosition::LastVariable, cp);
        }

        // A level counts as ignorable only for single-element entries with
        // a zero weight there; any further element clears the flag.
        let ignorable = |level: usize| -> bool {
            ce_list.len() == 1 && ce_list.weight(0, level) == 0
        };

        if ignorable(0) {
            self.mark(
                LogicalPosition::FirstPrimaryIgnorable,
                LogicalPosition::LastPrimaryIgnorable,
                cp,
            );
        }
        if ignorable(1) {
            self.mark(
                LogicalPosition::FirstSecondaryIgnorable,
                LogicalPosition::LastSecondaryIgnorable,
                cp,
            );
        }
        if ignorable(2) {
            self.mark(
                LogicalPosition::FirstTertiaryIgnorable,
                LogicalPosition::LastTertiaryIgnorable,
                cp,
            );
        }
        if !ignorable(0) && !ignorable(1) && !ignorable(2) {
            self.mark(
                LogicalPosition::FirstNonIgnorable,
                LogicalPosition::LastNonIgnorable,
                cp,
            );
        }
    }

    fn mark(&mut self, first: LogicalPosition, last: LogicalPosition, cp: Codepoint) {
        if self.logical[first.slot()].is_none() {
            self.logical[first.slot()] = Some(cp);
        }
        self.logical[last.slot()] = Some(cp);
    }

    /// Collation element list of a codepoint.
    #[must_use]
    pub fn ce_list(&self, cp: Codepoint) -> &CeList {
        &self.codepoints[cp as usize]
    }

    /// Dense per-codepoint element table.
    #[must_use]
    pub(crate) fn codepoint_table(&self) -> &[CeList] {
        &self.codepoints
    }

    /// Contractions collected from the table.
    #[must_use]
    pub fn contractions(&self) -> &[CodepointSequence] {
        &self.contractions
    }

    /// Codepoint occupying a logical position, if the scan assigned one.
    #[must_use]
    pub fn logical_position(&self, position: LogicalPosition) -> Option<Codepoint> {
        self.logical[position.slot()]
    }

    /// Number of table entries loaded (excluding implicit weights).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}

/// Parses the `[w1.w2.w3.w4][...]` groups of one table line, returning the
/// element list and whether the entry is marked variable (`*` prefix on
/// the last group, as observed by the scan).
fn parse_weight_groups(text: &str) -> Option<(CeList, bool)> {
    let mut ce_list = CeList::new();
    let mut variable = false;
    let mut count = 0usize;

    let groups = text
        .split(|c: char| c == '[' || c == ']' || c.is_whitespace())
        .filter(|group| !group.is_empty());

    for group in groups {
        if count >= MAX_EXPANSION_CE {
            return None;
        }
        variable = group.starts_with('*');
        let body = group.get(1..)?;
        for (level, part) in body.split('.').enumerate() {
            if level >= crate::types::WEIGHT_LEVELS {
                return None;
            }
            let weight = u32::from_str_radix(part, 16).ok()?;
            let weight = Weight::try_from(weight).ok()?;
            ce_list.set_weight(count, level, weight);
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }
    ce_list.set_len(count);
    Some((ce_list, variable))
}

/// Computes the UCA implicit weights of a codepoint absent from the table:
/// two elements keyed off the ideographic base ranges.
#[must_use]
pub(crate) fn implicit_ce_list(cp: Codepoint) -> CeList {
    let base: u32 = if (0x3400..=0x4DB5).contains(&cp) {
        0xFB80
    } else if (0x4E00..=0x9FA5).contains(&cp) {
        0xFB40
    } else {
        0xFBC0
    };

    let aaaa = (base + (cp >> 15)) as Weight;
    let bbbb = ((cp & 0x7FFF) | 0x8000) as Weight;

    let mut list = CeList::new();
    list.set_weight(0, 0, aaaa);
    list.set_weight(0, 1, 0x0020);
    list.set_weight(0, 2, 0x0002);
    list.set_weight(0, 3, 0x0001);
    list.set_weight(1, 0, bbbb);
    list.set_len(2);
    list
}

/// Caches the most recently loaded table keyed by path and contraction
/// policy; a matching request returns the shared table without re-reading
/// the file.
#[derive(Debug, Default)]
pub struct DucetCache {
    cached: Option<(PathBuf, ContractionPolicy, Arc<Ducet>)>,
}

impl DucetCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `path` under `policy`, reloading only when
    /// either differs from the cached load.
    pub fn load(&mut self, path: &Path, policy: ContractionPolicy) -> CollationResult<Arc<Ducet>> {
        if let Some((cached_path, cached_policy, table)) = &self.cached {
            if cached_path == path && *cached_policy == policy {
                return Ok(Arc::clone(table));
            }
        }

        let table = Arc::new(Ducet::load(path, policy)?);
        self.cached = Some((path.to_path_buf(), policy, Arc::clone(&table)));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# sample table
@version 6.0.0
0000  ; [.0000.0000.0000.0000] # NULL
0061  ; [.1C47.0020.0002.0061] # LATIN SMALL LETTER A
0041  ; [.1C47.0020.0008.0041] # LATIN CAPITAL LETTER A
0334  ; [.0000.008C.0002.0334] # COMBINING TILDE OVERLAY
02D0  ; [*0209.0020.0002.02D0] # MODIFIER LETTER TRIANGULAR COLON
004C 00B7 ; [.1D77.0020.0002.004C][.0000.0000.0000.00B7] # L-MIDDLE DOT
";

    #[test]
    fn parses_entries_and_skips_annotations() {
        let table = Ducet::parse(SAMPLE, ContractionPolicy::IGNORE_ALL);
        assert_eq!(table.ce_list(0x61).weight(0, 0), 0x1C47);
        assert_eq!(table.ce_list(0x61).weight(0, 2), 0x0002);
        assert_eq!(table.ce_list(0x41).weight(0, 2), 0x0008);
        // contraction line skipped under IGNORE_ALL
        assert!(table.contractions().is_empty());
        assert_eq!(table.entry_count(), 5);
    }

    #[test]
    fn loads_ducet_contractions_under_policy() {
        let table = Ducet::parse(SAMPLE, ContractionPolicy::FROM_DUCET);
        assert_eq!(table.contractions().len(), 1);
        let contr = &table.contractions()[0];
        assert_eq!(contr.codepoints, vec![0x4C, 0xB7]);
        assert_eq!(contr.ce.len(), 2);
        assert_eq!(contr.ce.weight(0, 0), 0x1D77);
    }

    #[test]
    fn implicit_weights_for_absent_codepoints() {
        let table = Ducet::parse(SAMPLE, ContractionPolicy::IGNORE_ALL);

        let han = table.ce_list(0x4E00);
        assert_eq!(han.len(), 2);
        assert_eq!(han.weight(0, 0), 0xFB40);
        assert_eq!(han.weight(1, 0), 0x4E00 | 0x8000);

        let ext_a = table.ce_list(0x3400);
        assert_eq!(ext_a.weight(0, 0), 0xFB80);

        let other = table.ce_list(0x0100);
        assert_eq!(other.weight(0, 0), 0xFBC0);
        assert_eq!(other.weight(1, 0), 0x0100 | 0x8000);
        assert_eq!(other.weight(0, 1), 0x0020);
    }

    #[test]
    fn records_logical_positions() {
        let table = Ducet::parse(SAMPLE, ContractionPolicy::IGNORE_ALL);
        assert_eq!(
            table.logical_position(LogicalPosition::FirstVariable),
            Some(0x2D0)
        );
        assert_eq!(
            table.logical_position(LogicalPosition::LastVariable),
            Some(0x2D0)
        );
        assert_eq!(
            table.logical_position(LogicalPosition::FirstPrimaryIgnorable),
            Some(0x0000)
        );
        assert_eq!(
            table.logical_position(LogicalPosition::LastPrimaryIgnorable),
            Some(0x334)
        );
        assert_eq!(
            table.logical_position(LogicalPosition::FirstNonIgnorable),
            Some(0x61)
        );
        assert_eq!(
            table.logical_position(LogicalPosition::FirstTrailing),
            None
        );
    }

    #[test]
    fn cache_returns_shared_table() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let mut cache = DucetCache::new();
        let first = cache
            .load(file.path(), ContractionPolicy::IGNORE_ALL)
            .unwrap();
        let second = cache
            .load(file.path(), ContractionPolicy::IGNORE_ALL)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // changing the contraction policy invalidates the cache
        let third = cache
            .load(file.path(), ContractionPolicy::FROM_DUCET)
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.contractions().len(), 1);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Ducet::load(
            Path::new("/nonexistent/allkeys.txt"),
            ContractionPolicy::IGNORE_ALL,
        );
        assert!(err.is_err());
    }
}
