//! Compile command implementation.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use unicoll_core::{
    CollationCompiler, CollationSettings, ContractionPolicy, Ducet, LocaleTailoring, Strength,
};

fn parse_strength(text: &str) -> Result<Strength, String> {
    match text {
        "primary" => Ok(Strength::Primary),
        "secondary" => Ok(Strength::Secondary),
        "tertiary" => Ok(Strength::Tertiary),
        "quaternary" => Ok(Strength::Quaternary),
        "identity" => Ok(Strength::Identity),
        other => Err(format!("unknown strength: {other}")),
    }
}

/// Runs the compile command.
#[allow(clippy::too_many_arguments)]
pub fn run(
    ducet_path: &Path,
    strength: &str,
    max_codepoint: &str,
    expansions: bool,
    ducet_contractions: bool,
    backwards: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let max_codepoint = u32::from_str_radix(max_codepoint.trim_start_matches("0x"), 16)
        .map_err(|err| format!("invalid max codepoint: {err}"))?;

    let contractions = if ducet_contractions {
        ContractionPolicy::FULL
    } else {
        ContractionPolicy::FROM_TAILORING
    };

    let settings = CollationSettings::new()
        .strength(parse_strength(strength)?)
        .expansions(expansions)
        .backwards(backwards)
        .contractions(contractions)
        .max_codepoint(max_codepoint);

    info!(path = %ducet_path.display(), "loading DUCET");
    let ducet = Arc::new(Ducet::load(ducet_path, settings.contractions)?);

    let compiler = CollationCompiler::new(ducet, LocaleTailoring::untailored(settings));
    let collation = compiler.compile()?;

    println!("Weights:       {}", collation.weight_count());
    println!("Contractions:  {}", collation.contractions.len());
    if collation.settings.expansions {
        println!("CE depth:      {}", collation.ce_depth);
    }
    println!("Checksum:      {}", collation.checksum_hex());

    if let Some(path) = output {
        std::fs::write(path, collation.canonical_bytes())?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
