//! Handler for the `opal check` subcommand.

use std::path::PathBuf;

use crate::parser::parse_source;

pub fn run_check(files: &[PathBuf], dump_ast: bool) -> Result<(), Box<dyn std::error::Error>> {
    if files.is_empty() {
        return Err("no files to check".into());
    }

    let mut errors = 0;

    for file in files {
        let source = std::fs::read_to_string(file)
            .map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;

        match parse_source(&source) {
            Ok(program) => {
                if dump_ast {
                    println!("{}", serde_json::to_string_pretty(&program)?);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                errors += 1;
            }
        }
    }

    if errors > 0 {
        return Err(format!("{} file(s) failed to parse", errors).into());
    }

    println!("Checked {} file(s), no errors found", files.len());
    Ok(())
}
