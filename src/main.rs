//! Legible CLI
//!
//! Command-line entry point for the legible library.
//!
//! # Usage
//!
//! ```bash
//! # Run a k-fold experiment from config
//! legible train experiment.yaml
//!
//! # Train with overrides
//! legible train experiment.yaml --epochs 5 --variants structural,fused
//!
//! # Validate config and dataset join
//! legible validate experiment.yaml --strict
//!
//! # Show config info
//! legible info experiment.yaml --format json
//!
//! # Render a source file to a classifier input image
//! legible render Main.java --output main.png
//! ```

use clap::Parser;
use legible::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
