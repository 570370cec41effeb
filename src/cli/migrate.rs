use anyhow::Result;
use std::path::Path;

use crate::store::Store;

/// Open the database, applying any pending schema changes, and report them.
pub fn run(path: &Path) -> Result<()> {
    let (store, report) = Store::open_with_report(path)?;
    println!("Database: {}", store.path().display());

    if report.is_empty() {
        println!("Schema is up to date.");
        return Ok(());
    }
    for (legacy, current) in &report.renamed {
        println!("  renamed   {} -> {}", legacy, current);
    }
    for (table, column) in &report.added_columns {
        println!("  added     {}.{}", table, column);
    }
    for skipped in &report.skipped {
        println!("  skipped   {}", skipped);
    }
    Ok(())
}
