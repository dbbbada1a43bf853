//! Handler for the `opal run` subcommand.

use std::path::PathBuf;

use crate::interpreter::{Evaluator, StdConsole};
use crate::parser::parse_source;

pub fn run_program(file: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;

    let program = parse_source(&source).map_err(|e| format!("Parse error: {}", e))?;

    let mut evaluator = Evaluator::new(&program, Box::new(StdConsole));
    evaluator
        .run(&program)
        .map_err(|e| format!("Runtime error: {}", e))?;

    Ok(())
}
