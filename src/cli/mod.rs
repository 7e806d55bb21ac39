//! CLI module for Strata
//!
//! Command-line parsing for the `strata` binary. Uses clap for arguments and
//! owo-colors for terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strata - quality-controlled SWOT reports
#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Strata - quality-controlled SWOT reports",
    long_about = "Builds a SWOT analysis from six data sources, scores it and revises it\n\
                  until it meets the quality bar or the revision budget runs out.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  strata                                   # Start the server (reads strata.toml)\n    \
                  strata analyze Tesla --ticker TSLA       # Run one analysis and print it\n    \
                  strata analyze Costco --focus Growth --json\n    \
                  strata card                              # Print the research agent card"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "strata.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (the default)
    Serve,

    /// Run one analysis in-process and print the report
    Analyze {
        /// Company name
        company: String,

        /// Stock ticker
        #[arg(short, long)]
        ticker: Option<String>,

        /// Strategy focus (Cost Leadership, Differentiation, Focus, Innovation, Growth, Defensive)
        #[arg(short, long)]
        focus: Option<String>,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the agent card served by the research executor
    Card,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
