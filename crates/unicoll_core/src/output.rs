//! Optimized collation output.
//!
//! The artifact handed to the code generator: per-codepoint weight and
//! next-key arrays, the binary-sorted contraction table with its
//! first-contraction index, and a checksum over the canonical byte layout
//! so builds can detect unintentional collation changes.

use sha2::{Digest, Sha256};

use crate::error::{CollationError, CollationResult};
use crate::settings::CollationSettings;
use crate::types::{
    contraction_ref, contraction_ref_index, is_contraction_ref, Codepoint, MAX_EXPANSION_CE,
};

/// Size of the content checksum in bytes.
pub const CHECKSUM_SIZE: usize = 32;

/// One entry of the optimized contraction table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptContraction {
    /// The contraction's text, UTF-8 encoded.
    pub text: String,
    /// Number of codepoints in the contraction.
    pub codepoint_count: u8,
    /// UTF-8 byte length of `text`.
    pub size: u8,
    /// Next collatable key (codepoint, or contraction reference).
    pub next: u32,
    /// Optimized weight (simple mode).
    pub weight: u32,
    /// Number of collation elements (expansion mode).
    pub ce_count: u8,
    /// Packed level 1-3 weights per element (expansion mode).
    pub l13_weights: [u32; MAX_EXPANSION_CE],
    /// Level 4 weights per element (expansion mode, quaternary strength).
    pub l4_weights: [u16; MAX_EXPANSION_CE],
}

impl OptContraction {
    pub(crate) fn new(text: String, codepoint_count: u8) -> Self {
        let size = text.len() as u8;
        Self {
            text,
            codepoint_count,
            size,
            next: u32::MAX,
            weight: u32::MAX,
            ce_count: 0,
            l13_weights: [0; MAX_EXPANSION_CE],
            l4_weights: [0; MAX_EXPANSION_CE],
        }
    }
}

/// The compiled collation for one locale.
#[derive(Debug)]
pub struct OptimizedCollation {
    /// Settings the collation was compiled with.
    pub settings: CollationSettings,
    /// Per-codepoint optimized weights (simple mode; empty with
    /// expansions).
    pub weights: Vec<u32>,
    /// Per-codepoint next collatable key.
    pub next: Vec<u32>,
    /// Packed level 1-3 weights, `ce_depth` words per codepoint
    /// (expansion mode).
    pub l13_weights: Vec<u32>,
    /// Level 4 weights, `ce_depth` words per codepoint (expansion mode at
    /// quaternary strength).
    pub l4_weights: Vec<u16>,
    /// Number of collation elements per codepoint (expansion mode).
    pub ce_counts: Vec<u8>,
    /// Widest element list among codepoints (expansion mode; zero
    /// otherwise).
    pub ce_depth: usize,
    /// Optimized contraction table, binary-sorted by UTF-8 text.
    pub contractions: Vec<OptContraction>,
    /// First-contraction index over the interval starting at
    /// `first_contraction_offset`; `-1` marks codepoints starting none.
    pub first_contraction_index: Vec<i32>,
    /// First codepoint of the indexed interval.
    pub first_contraction_offset: Codepoint,
    /// Smallest contraction size in bytes.
    pub min_contraction_size: u32,
    /// SHA-256 digest over [`canonical_bytes`](Self::canonical_bytes).
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl OptimizedCollation {
    pub(crate) fn new(settings: CollationSettings) -> Self {
        Self {
            settings,
            weights: Vec::new(),
            next: Vec::new(),
            l13_weights: Vec::new(),
            l4_weights: Vec::new(),
            ce_counts: Vec::new(),
            ce_depth: 0,
            contractions: Vec::new(),
            first_contraction_index: Vec::new(),
            first_contraction_offset: 0,
            min_contraction_size: 0,
            checksum: [0; CHECKSUM_SIZE],
        }
    }

    /// Number of codepoints covered by the weight arrays.
    #[must_use]
    pub fn weight_count(&self) -> usize {
        self.next.len()
    }

    /// Index of the first contraction starting with `cp`, consulting the
    /// interval index.
    #[must_use]
    pub fn first_contraction(&self, cp: Codepoint) -> Option<usize> {
        let window = cp.checked_sub(self.first_contraction_offset)? as usize;
        match self.first_contraction_index.get(window) {
            Some(&index) if index >= 0 => Some(index as usize),
            _ => None,
        }
    }

    /// The contiguous range of contraction-table entries starting with
    /// `cp`.
    #[must_use]
    pub fn contraction_range(&self, cp: Codepoint) -> std::ops::Range<usize> {
        let Some(first) = self.first_contraction(cp) else {
            return 0..0;
        };
        let mut end = first;
        while end < self.contractions.len()
            && self.contractions[end].text.chars().next() == char::from_u32(cp)
        {
            end += 1;
        }
        first..end
    }

    /// Sorts the contraction table into binary order, remaps every
    /// contraction reference to the sorted positions and builds the
    /// first-contraction interval index.
    pub(crate) fn optimize_contractions(&mut self) -> CollationResult<()> {
        if self.contractions.is_empty() {
            return Ok(());
        }

        let count = self.contractions.len();
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|&a, &b| {
            self.contractions[a]
                .text
                .as_bytes()
                .cmp(self.contractions[b].text.as_bytes())
        });

        // old position -> sorted position
        let mut position = vec![usize::MAX; count];
        for (sorted_pos, &old_pos) in order.iter().enumerate() {
            position[old_pos] = sorted_pos;
        }

        let remap = |reference: u32| -> CollationResult<u32> {
            if !is_contraction_ref(reference) {
                return Ok(reference);
            }
            let old = contraction_ref_index(reference);
            let new = position.get(old).copied().ok_or_else(|| {
                CollationError::internal("dangling contraction reference after optimization")
            })?;
            Ok(contraction_ref(new))
        };

        for next in &mut self.next {
            *next = remap(*next)?;
        }

        let mut sorted = Vec::with_capacity(count);
        for &old_pos in &order {
            let mut entry = self.contractions[old_pos].clone();
            entry.next = remap(entry.next)?;
            sorted.push(entry);
        }
        self.contractions = sorted;

        // index of the first contraction starting at each codepoint
        let weight_count = self.weight_count();
        let mut full_index = vec![-1i32; weight_count];
        let mut min_size = u32::MAX;
        for (index, contraction) in self.contractions.iter().enumerate() {
            min_size = min_size.min(contraction.size as u32);
            let Some(first_char) = contraction.text.chars().next() else {
                continue;
            };
            let cp = first_char as usize;
            if cp < weight_count && full_index[cp] == -1 {
                full_index[cp] = index as i32;
            }
        }
        self.min_contraction_size = min_size;

        // bound the runtime search to the populated interval
        let first = full_index.iter().position(|&entry| entry != -1);
        let last = full_index.iter().rposition(|&entry| entry != -1);
        if let (Some(first), Some(last)) = (first, last) {
            self.first_contraction_offset = first as Codepoint;
            self.first_contraction_index = full_index[first..=last].to_vec();
        }

        Ok(())
    }

    /// Serializes the collation into its canonical little-endian byte
    /// layout: settings, counts, weight arrays, next array, contraction
    /// table and index. Identical compilations produce identical bytes.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        // settings snapshot
        buf.push(self.settings.strength.as_byte());
        buf.push(u8::from(self.settings.backwards));
        buf.push(u8::from(self.settings.case_level));
        buf.push(self.settings.case_first.as_byte());
        buf.push(u8::from(self.settings.expansions));
        buf.push(self.settings.contractions.as_byte());
        buf.extend_from_slice(&self.settings.max_codepoint.to_le_bytes());

        buf.extend_from_slice(&(self.weight_count() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.ce_depth as u32).to_le_bytes());

        if self.settings.expansions {
            for word in &self.l13_weights {
                buf.extend_from_slice(&word.to_le_bytes());
            }
            if self.settings.strength.level_count() >= 4 {
                for word in &self.l4_weights {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
            buf.extend_from_slice(&self.ce_counts);
        } else {
            for weight in &self.weights {
                buf.extend_from_slice(&weight.to_le_bytes());
            }
        }

        for next in &self.next {
            buf.extend_from_slice(&next.to_le_bytes());
        }

        buf.extend_from_slice(&(self.contractions.len() as u32).to_le_bytes());
        for contraction in &self.contractions {
            buf.extend_from_slice(&contraction.weight.to_le_bytes());
            buf.extend_from_slice(&contraction.next.to_le_bytes());
            buf.push(contraction.codepoint_count);
            buf.push(contraction.size);
            buf.push(contraction.ce_count);
            buf.extend_from_slice(contraction.text.as_bytes());
            if self.settings.expansions {
                for word in &contraction.l13_weights {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
                if self.settings.strength.level_count() >= 4 {
                    for word in &contraction.l4_weights {
                        buf.extend_from_slice(&word.to_le_bytes());
                    }
                }
            }
        }

        if !self.contractions.is_empty() {
            buf.extend_from_slice(&self.min_contraction_size.to_le_bytes());
            buf.extend_from_slice(&self.first_contraction_offset.to_le_bytes());
            buf.extend_from_slice(&(self.first_contraction_index.len() as u32).to_le_bytes());
            for entry in &self.first_contraction_index {
                buf.extend_from_slice(&entry.to_le_bytes());
            }
        }

        buf
    }

    /// Computes and stores the content checksum.
    pub(crate) fn seal(&mut self) {
        let digest = Sha256::digest(self.canonical_bytes());
        self.checksum.copy_from_slice(&digest);
    }

    /// The checksum as a lowercase hex string.
    #[must_use]
    pub fn checksum_hex(&self) -> String {
        self.checksum.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OptimizedCollation {
        let mut out = OptimizedCollation::new(CollationSettings::new().max_codepoint(0x80));
        out.weights = vec![0; 0x80];
        out.next = vec![0; 0x80];
        out
    }

    fn contraction(text: &str, next: u32) -> OptContraction {
        let mut entry = OptContraction::new(text.to_string(), text.chars().count() as u8);
        entry.next = next;
        entry.weight = 1;
        entry
    }

    #[test]
    fn contractions_sort_into_binary_order() {
        let mut out = sample();
        out.contractions = vec![
            contraction("ch", 0x64),
            contraction("ab", 0x63),
            contraction("cz", 0x65),
        ];
        out.next[0x61] = contraction_ref(0); // "ch" before sorting

        out.optimize_contractions().unwrap();

        let texts: Vec<&str> = out
            .contractions
            .iter()
            .map(|entry| entry.text.as_str())
            .collect();
        assert_eq!(texts, ["ab", "ch", "cz"]);
        // the codepoint reference followed "ch" to its new position
        assert_eq!(out.next[0x61], contraction_ref(1));
    }

    #[test]
    fn first_contraction_index_covers_interval() {
        let mut out = sample();
        out.contractions = vec![
            contraction("ch", 0x64),
            contraction("ab", 0x63),
            contraction("cz", 0x65),
        ];
        out.optimize_contractions().unwrap();

        // interval spans 'a'..='c'
        assert_eq!(out.first_contraction_offset, 0x61);
        assert_eq!(out.first_contraction_index.len(), 3);
        assert_eq!(out.first_contraction(0x61), Some(0));
        assert_eq!(out.first_contraction(0x62), None);
        assert_eq!(out.first_contraction(0x63), Some(1));
        assert_eq!(out.first_contraction(0x60), None);
        assert_eq!(out.first_contraction(0x7F), None);

        assert_eq!(out.contraction_range(0x63), 1..3);
        assert_eq!(out.contraction_range(0x61), 0..1);
        assert_eq!(out.contraction_range(0x62), 0..0);
        assert_eq!(out.min_contraction_size, 2);
    }

    #[test]
    fn canonical_bytes_are_reproducible() {
        let mut first = sample();
        first.contractions = vec![contraction("ch", 0x64)];
        first.optimize_contractions().unwrap();
        first.seal();

        let mut second = sample();
        second.contractions = vec![contraction("ch", 0x64)];
        second.optimize_contractions().unwrap();
        second.seal();

        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.checksum_hex(), second.checksum_hex());

        // any table change must surface in the digest
        second.next[0] = 7;
        second.seal();
        assert_ne!(first.checksum, second.checksum);
    }
}
