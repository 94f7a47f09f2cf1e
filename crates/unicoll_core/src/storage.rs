//! Working storage for one collation instance.
//!
//! Holds the locale's private copy of the per-codepoint element table plus
//! the contraction and expansion registries. Keys reference contractions
//! and expansions by index; the vectors only ever grow, so indices stay
//! stable while storage addresses may not.

use crate::ducet::Ducet;
use crate::element::CeList;
use crate::error::{CollationError, CollationResult};
use crate::settings::CollationSettings;
use crate::types::{
    Codepoint, CollationKey, MAX_CODEPOINT, MAX_EXPANSION_CE, MAX_SEQUENCE_CP, WEIGHT_LEVELS,
};

/// A contraction or expansion: an ordered codepoint sequence with its own
/// collation element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodepointSequence {
    /// The member codepoints, in text order.
    pub codepoints: Vec<Codepoint>,
    /// The sequence's collation elements.
    pub ce: CeList,
}

/// Kind of sequence registered by [`UcaStorage::add_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SequenceKind {
    Contraction,
    Expansion,
}

/// Mutable per-locale working set: dense element table plus sequence
/// registries.
#[derive(Debug)]
pub struct UcaStorage {
    codepoints: Vec<CeList>,
    contractions: Vec<CodepointSequence>,
    expansions: Vec<CodepointSequence>,
}

impl UcaStorage {
    /// Clones the shared table into a private working copy for one locale,
    /// carrying over DUCET contractions when the policy collects them.
    pub fn from_ducet(ducet: &Ducet, settings: &CollationSettings) -> CollationResult<Self> {
        let mut storage = Self {
            codepoints: ducet.codepoint_table().to_vec(),
            contractions: Vec::with_capacity(ducet.contractions().len()),
            expansions: Vec::new(),
        };

        for contraction in ducet.contractions() {
            for &cp in &contraction.codepoints {
                if cp >= settings.max_codepoint {
                    return Err(CollationError::CodepointOutOfRange {
                        codepoint: cp,
                        max: settings.max_codepoint,
                    });
                }
            }
            storage.contractions.push(contraction.clone());
        }

        Ok(storage)
    }

    /// Collation element list of a key, if the key is in range.
    #[must_use]
    pub fn ce_list(&self, key: CollationKey) -> Option<&CeList> {
        match key {
            CollationKey::Codepoint(cp) if cp <= MAX_CODEPOINT => {
                self.codepoints.get(cp as usize)
            }
            CollationKey::Codepoint(_) => None,
            CollationKey::Contraction(id) => self.contractions.get(id).map(|seq| &seq.ce),
            CollationKey::Expansion(id) => self.expansions.get(id).map(|seq| &seq.ce),
        }
    }

    /// Mutable collation element list of a key.
    pub(crate) fn ce_list_mut(&mut self, key: CollationKey) -> Option<&mut CeList> {
        match key {
            CollationKey::Codepoint(cp) if cp <= MAX_CODEPOINT => {
                self.codepoints.get_mut(cp as usize)
            }
            CollationKey::Codepoint(_) => None,
            CollationKey::Contraction(id) => self.contractions.get_mut(id).map(|seq| &mut seq.ce),
            CollationKey::Expansion(id) => self.expansions.get_mut(id).map(|seq| &mut seq.ce),
        }
    }

    /// Registered contractions, in discovery order.
    #[must_use]
    pub fn contractions(&self) -> &[CodepointSequence] {
        &self.contractions
    }

    /// Registered tailoring expansions, in discovery order.
    #[must_use]
    pub fn expansions(&self) -> &[CodepointSequence] {
        &self.expansions
    }

    /// Finds a contraction by its codepoint sequence.
    #[must_use]
    pub fn find_contraction(&self, codepoints: &[Codepoint]) -> Option<usize> {
        Self::find_sequence(&self.contractions, codepoints)
    }

    /// Finds an expansion by its codepoint sequence.
    #[must_use]
    pub fn find_expansion(&self, codepoints: &[Codepoint]) -> Option<usize> {
        Self::find_sequence(&self.expansions, codepoints)
    }

    fn find_sequence(sequences: &[CodepointSequence], codepoints: &[Codepoint]) -> Option<usize> {
        if codepoints.len() > MAX_SEQUENCE_CP {
            return None;
        }
        sequences
            .iter()
            .position(|seq| seq.codepoints == codepoints)
    }

    /// Registers a new contraction or expansion, building its element list
    /// by concatenating the member codepoints' current elements.
    pub(crate) fn add_sequence(
        &mut self,
        kind: SequenceKind,
        codepoints: &[Codepoint],
        max_codepoint: Codepoint,
    ) -> CollationResult<usize> {
        debug_assert!(codepoints.len() > 1 && codepoints.len() <= MAX_SEQUENCE_CP);

        let mut ce = CeList::new();
        for &cp in codepoints {
            if cp >= max_codepoint {
                return Err(CollationError::CodepointOutOfRange {
                    codepoint: cp,
                    max: max_codepoint,
                });
            }

            let cp_ce = &self.codepoints[cp as usize];
            if ce.len() + cp_ce.len() >= MAX_EXPANSION_CE {
                return Err(CollationError::parse(
                    "cannot create sequence: too many collation elements",
                ));
            }
            for index in 0..cp_ce.len() {
                let mut element = [0; WEIGHT_LEVELS];
                for (level, weight) in element.iter_mut().enumerate() {
                    *weight = cp_ce.weight(index, level);
                }
                ce.push(element)?;
            }
        }

        let sequence = CodepointSequence {
            codepoints: codepoints.to_vec(),
            ce,
        };

        match kind {
            SequenceKind::Contraction => {
                self.contractions.push(sequence);
                Ok(self.contractions.len() - 1)
            }
            SequenceKind::Expansion => {
                self.expansions.push(sequence);
                Ok(self.expansions.len() - 1)
            }
        }
    }
}
