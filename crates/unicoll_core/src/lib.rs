//! # unicoll core
//!
//! Build-time Unicode Collation Algorithm (UCA) table compiler for the
//! unicoll locale toolchain.
//!
//! This crate provides:
//! - DUCET loading into a shared, immutable element table
//! - Absolute and relative tailoring rule application per locale
//! - Weight statistics and deterministic key grouping
//! - Optimized per-codepoint weight and next-key arrays
//! - A binary-sorted contraction table with its lookup index
//! - A content checksum over the canonical output layout
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use unicoll_core::{
//!     CollationCompiler, CollationSettings, Ducet, LocaleTailoring,
//! };
//!
//! # fn main() -> unicoll_core::CollationResult<()> {
//! let settings = CollationSettings::new().max_codepoint(0x1000);
//! let ducet = Arc::new(Ducet::load(Path::new("allkeys.txt"), settings.contractions)?);
//! let compiler = CollationCompiler::new(ducet, LocaleTailoring::untailored(settings));
//! let collation = compiler.compile()?;
//! println!("checksum: {}", collation.checksum_hex());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compiler;
mod ducet;
mod element;
mod error;
mod optimize;
mod output;
mod rules;
mod settings;
mod stats;
mod storage;
mod tailor;
mod types;

pub use compiler::{CollationCompiler, LocaleTailoring};
pub use ducet::{Ducet, DucetCache};
pub use element::{compare_ce_lists, CeList, CollationElement, CompareOptions};
pub use error::{CollationError, CollationResult};
pub use output::{OptContraction, OptimizedCollation, CHECKSUM_SIZE};
pub use rules::{AbsoluteRule, Direction, LogicalPosition, RuleAnchor, RuleLevel, TailoringRule};
pub use settings::{CaseFirst, CollationSettings, ContractionPolicy, Strength};
pub use storage::{CodepointSequence, UcaStorage};
pub use types::{
    contraction_ref, contraction_ref_index, is_contraction_ref, Codepoint, CollationKey, Weight,
    CONTRACTION_MASK, MAX_CODEPOINT, MAX_EXPANSION_CE, MAX_SEQUENCE_CP, MAX_SECONDARY_WEIGHT,
    MAX_TERTIARY_WEIGHT, MAX_WEIGHT, WEIGHT_LEVELS,
};
