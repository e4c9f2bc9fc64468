//! Backup, restore and repair command handlers

use std::path::Path;

use anyhow::{anyhow, Result};

use keyvault_core::maintenance;
use keyvault_core::{Config, StorageError};

use crate::output::Output;

/// Copy the key file to `destination`
pub fn backup(config: &Config, destination: &Path, output: &Output) -> Result<()> {
    let bytes = maintenance::backup(&config.data_path(), destination)
        .map_err(|e| with_suggestion("Backup failed", e))?;

    output.success(&format!(
        "Database backed up to {} ({} bytes)",
        destination.display(),
        bytes
    ));
    Ok(())
}

/// Replace the key file with `source`
pub fn restore(config: &Config, source: &Path, output: &Output) -> Result<()> {
    let report = maintenance::restore(&config.data_path(), source)
        .map_err(|e| with_suggestion("Restore failed", e))?;

    if let Some(snapshot) = &report.auto_backup {
        output.message(&format!(
            "Previous key file saved to {}",
            snapshot.display()
        ));
    }
    output.success(&format!(
        "Database restored from {} ({} bytes)",
        source.display(),
        report.bytes
    ));
    Ok(())
}

/// Drop malformed lines from the key file
pub fn repair(config: &Config, output: &Output) -> Result<()> {
    let data_path = config.data_path();
    let report =
        maintenance::repair(&data_path).map_err(|e| with_suggestion("Repair failed", e))?;

    match report {
        None => output.message(&format!(
            "No key file found at {}. Nothing to repair.",
            data_path.display()
        )),
        Some(report) => output.success(&format!(
            "Repair complete: {} valid entries kept, {} removed. Backup saved to {}",
            report.valid,
            report.removed,
            report.backup_path.display()
        )),
    }
    Ok(())
}

fn with_suggestion(action: &str, err: StorageError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow!("{}: {}\n{}", action, err, hint),
        None => anyhow!("{}: {}", action, err),
    }
}
