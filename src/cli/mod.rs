//! Command-line interface for the Opal toolchain
//!
//! Provides commands: run, check

pub mod check_cmd;
pub mod run_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Opal - a small dynamically-typed scripting language
#[derive(Parser, Debug)]
#[command(name = "opal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an Opal program
    Run {
        /// File to run
        file: PathBuf,
    },

    /// Parse source files and report errors without running
    Check {
        /// Files to check
        files: Vec<PathBuf>,

        /// Print the parsed AST as JSON
        #[arg(long)]
        dump_ast: bool,
    },
}
