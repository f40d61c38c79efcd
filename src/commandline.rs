use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::{path::PathBuf, time::Duration};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Decode a single 256-byte frame and print every field
    Decode {
        /// File containing the raw 256-byte frame
        file: Option<PathBuf>,
        /// Frame given inline as a hex string instead of a file
        #[clap(long, conflicts_with = "file")]
        hex: Option<String>,
        /// Print the decoded frame as JSON
        #[clap(long, action)]
        json: bool,
    },
    /// Decode a frame and print the compact telemetry summary
    Summary {
        /// File containing the raw 256-byte frame
        file: Option<PathBuf>,
        /// Frame given inline as a hex string instead of a file
        #[clap(long, conflicts_with = "file")]
        hex: Option<String>,
        /// Print the summary as JSON
        #[clap(long, action)]
        json: bool,
    },
    /// Compute the CRC-16 of an arbitrary hex byte string
    Checksum {
        /// Input bytes as a hex string (whitespace allowed)
        hex: String,
    },
    /// Run the simulated frame producer and the console display loop
    Monitor {
        /// Interval between produced frames (e.g., "500ms", "1s")
        #[clap(long, short, value_parser = humantime::parse_duration, default_value = "500ms")]
        interval: Duration,
        /// Display poll interval (e.g., "100ms")
        #[clap(long, short, value_parser = humantime::parse_duration, default_value = "100ms")]
        poll: Duration,
        /// Number of display refreshes before exiting (runs forever if omitted)
        #[clap(long, short)]
        cycles: Option<u64>,
    },
}

const fn about_text() -> &'static str {
    "power rectifier telemetry command line tool"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: CliCommands,
}
