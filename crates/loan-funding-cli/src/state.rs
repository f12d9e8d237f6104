//! Schedule state file handling.
//!
//! The CLI persists installments between invocations as a JSON snapshot of
//! the in-memory store; the real platform keeps them in its database.

use std::fs;
use std::path::Path;

use loan_funding_core::schedule::{InMemoryInstallmentStore, ScheduleSnapshot};

/// Load a state file, failing if it does not exist.
pub fn load(path: &str) -> Result<InMemoryInstallmentStore, Box<dyn std::error::Error>> {
    if !Path::new(path).is_file() {
        return Err(format!("State file not found: {path}").into());
    }
    read_snapshot(path)
}

/// Load a state file, starting from an empty store if it does not exist yet.
pub fn load_or_default(path: &str) -> Result<InMemoryInstallmentStore, Box<dyn std::error::Error>> {
    if !Path::new(path).is_file() {
        return Ok(InMemoryInstallmentStore::new());
    }
    read_snapshot(path)
}

/// Write the store back to the state file.
pub fn save(
    store: &InMemoryInstallmentStore,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    fs::write(path, json).map_err(|e| format!("Failed to write '{path}': {e}"))?;
    Ok(())
}

fn read_snapshot(path: &str) -> Result<InMemoryInstallmentStore, Box<dyn std::error::Error>> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    let snapshot: ScheduleSnapshot =
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse '{path}': {e}"))?;
    Ok(InMemoryInstallmentStore::from_snapshot(snapshot))
}
