//! Top-level compilation pipeline for one locale.

use std::sync::Arc;

use tracing::{debug, info};

use crate::ducet::Ducet;
use crate::error::{CollationError, CollationResult};
use crate::optimize::create_optimized;
use crate::output::OptimizedCollation;
use crate::rules::{AbsoluteRule, TailoringRule};
use crate::settings::CollationSettings;
use crate::stats::WeightStats;
use crate::storage::UcaStorage;
use crate::tailor::{apply_absolute_rules, apply_tailoring_rules};
use crate::types::MAX_CODEPOINT;

/// A locale's complete tailoring description, as produced by the locale
/// definition front end.
#[derive(Debug, Clone)]
pub struct LocaleTailoring {
    /// Collation settings.
    pub settings: CollationSettings,
    /// Absolute weight-assignment rules, applied first.
    pub absolute_rules: Vec<AbsoluteRule>,
    /// Relative tailoring rules, applied in declaration order.
    pub rules: Vec<TailoringRule>,
}

impl LocaleTailoring {
    /// A tailoring with no rules, collating by the table alone.
    #[must_use]
    pub fn untailored(settings: CollationSettings) -> Self {
        Self {
            settings,
            absolute_rules: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// Compiles one locale's collation from the shared table and its
/// tailoring.
///
/// The table is shared read-only between compilers; all per-locale working
/// state lives inside [`compile`](Self::compile). The first error aborts
/// the locale and is returned to the caller, which may continue with
/// sibling locales.
#[derive(Debug)]
pub struct CollationCompiler {
    ducet: Arc<Ducet>,
    tailoring: LocaleTailoring,
}

impl CollationCompiler {
    /// Creates a compiler for one locale.
    #[must_use]
    pub fn new(ducet: Arc<Ducet>, tailoring: LocaleTailoring) -> Self {
        Self { ducet, tailoring }
    }

    /// Runs the full pipeline: clone the table, apply absolute rules,
    /// build weight statistics, apply relative rules, optimize weights and
    /// contractions, and seal the output with its checksum.
    pub fn compile(&self) -> CollationResult<OptimizedCollation> {
        let settings = &self.tailoring.settings;
        if settings.max_codepoint == 0 || settings.max_codepoint > MAX_CODEPOINT + 1 {
            return Err(CollationError::parse(format!(
                "locale maximum codepoint {:#x} outside 1..={:#x}",
                settings.max_codepoint,
                MAX_CODEPOINT + 1,
            )));
        }

        info!(max_codepoint = settings.max_codepoint, "initializing collation instance");
        debug!(
            ducet_contractions = self.ducet.contractions().len(),
            "cloning table into working storage"
        );
        let mut storage = UcaStorage::from_ducet(&self.ducet, settings)?;

        info!(
            rules = self.tailoring.absolute_rules.len(),
            "applying absolute tailoring rules"
        );
        apply_absolute_rules(&mut storage, settings, &self.tailoring.absolute_rules)?;

        info!("building weight statistics");
        let mut stats = WeightStats::build(&storage, settings)?;

        info!(rules = self.tailoring.rules.len(), "applying tailoring rules");
        apply_tailoring_rules(
            &mut storage,
            &mut stats,
            &self.ducet,
            settings,
            &self.tailoring.rules,
        )?;

        info!(expansions = settings.expansions, "building optimized weights");
        let output = create_optimized(&storage, &mut stats, settings)?;

        info!(
            contractions = output.contractions.len(),
            checksum = %output.checksum_hex(),
            "collation compiled"
        );
        Ok(output)
    }
}
