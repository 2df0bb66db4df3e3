use super::print_report;
use crate::{config::OperationsFile, error::CliResult};
use solbatch_batch_tx::{valid_type_names, validate_operations};
use std::path::PathBuf;

pub fn execute(operations_file: PathBuf, json: bool) -> CliResult<()> {
    let ops_file = OperationsFile::load(&operations_file)?;
    let report = validate_operations(&ops_file.raw_operations(), &valid_type_names());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if !report.valid {
        return Err(print_report(report));
    }

    println!(
        "✅ {} operations in {} are valid",
        ops_file.operations.len(),
        operations_file.display()
    );
    Ok(())
}
