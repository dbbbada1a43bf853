//! Opal CLI - The Opal programming language toolchain

use std::process::ExitCode;

use clap::Parser;

use opal::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file } => opal::cli::run_cmd::run_program(&file),
        Command::Check { files, dump_ast } => opal::cli::check_cmd::run_check(&files, dump_ast),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
