//! unicoll CLI
//!
//! Command-line collation compiler for the unicoll locale toolchain.
//!
//! # Commands
//!
//! - `compile` - Compile one locale's collation tables from a DUCET file
//! - `inspect` - Display DUCET table statistics

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// unicoll command-line collation tools.
#[derive(Parser)]
#[command(name = "unicoll")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the DUCET file (allkeys format)
    #[arg(global = true, short, long)]
    ducet: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one locale's collation tables
    Compile {
        /// Comparison strength (primary, secondary, tertiary, quaternary,
        /// identity)
        #[arg(short, long, default_value = "quaternary")]
        strength: String,

        /// Maximum tracked codepoint (exclusive), hexadecimal
        #[arg(short, long, default_value = "10000")]
        max_codepoint: String,

        /// Enable expansions in the optimized output
        #[arg(short, long)]
        expansions: bool,

        /// Collect contractions from the DUCET
        #[arg(long)]
        ducet_contractions: bool,

        /// Compare the secondary level in reverse order
        #[arg(short, long)]
        backwards: bool,

        /// Write the canonical binary serialization to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display DUCET table statistics
    Inspect {
        /// Show logical position assignments
        #[arg(short, long)]
        positions: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Compile {
            strength,
            max_codepoint,
            expansions,
            ducet_contractions,
            backwards,
            output,
        } => {
            let ducet = cli.ducet.ok_or("DUCET path required for compile")?;
            commands::compile::run(
                &ducet,
                &strength,
                &max_codepoint,
                expansions,
                ducet_contractions,
                backwards,
                output.as_deref(),
            )?;
        }
        Commands::Inspect { positions } => {
            let ducet = cli.ducet.ok_or("DUCET path required for inspect")?;
            commands::inspect::run(&ducet, positions)?;
        }
        Commands::Version => {
            println!("unicoll CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
