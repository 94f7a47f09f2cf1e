//! Inspect command implementation.

use std::path::Path;

use unicoll_core::{ContractionPolicy, Ducet, LogicalPosition};

/// Runs the inspect command.
pub fn run(ducet_path: &Path, show_positions: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ducet = Ducet::load(ducet_path, ContractionPolicy::FROM_DUCET)?;

    println!("Inspecting {}", ducet_path.display());
    println!();
    println!("Entries:       {}", ducet.entry_count());
    println!("Contractions:  {}", ducet.contractions().len());

    if show_positions {
        println!();
        println!("Logical positions:");
        for position in LogicalPosition::ALL {
            match ducet.logical_position(position) {
                Some(cp) => println!("  {position:?}: U+{cp:04X}"),
                None => println!("  {position:?}: (unassigned)"),
            }
        }
    }

    Ok(())
}
