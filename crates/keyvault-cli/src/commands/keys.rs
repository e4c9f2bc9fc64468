//! Key command handlers

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use keyvault_core::import::read_key_values;
use keyvault_core::{KeyStore, Tier};

use crate::output::Output;

/// Import keys from a text file, one per line
///
/// `tier_choice` is 1-4; anything else imports as Daily.
pub fn import(store: &KeyStore, path: &Path, tier_choice: i64, output: &Output) -> Result<()> {
    if !(1..=4).contains(&tier_choice) {
        warn!("Invalid key type {}, defaulting to Daily", tier_choice);
    }
    let tier = Tier::from_choice(tier_choice);

    let values = read_key_values(path)
        .with_context(|| format!("Failed to read keys from {}", path.display()))?;
    let summary = store.import_values(values, tier);

    if summary.rejected > 0 {
        output.message(&format!(
            "Skipped {} keys containing '|' or line breaks.",
            summary.rejected
        ));
    }
    if summary.inserted > 0 {
        output.success(&format!(
            "Imported {} new keys of type {}.",
            summary.inserted,
            tier.name()
        ));
    } else {
        output.message("No new keys imported.");
    }
    Ok(())
}

/// List keys, optionally only one tier
pub fn list(store: &KeyStore, tier: Option<Tier>, output: &Output) -> Result<()> {
    match tier {
        Some(tier) => {
            let keys = store.records_by_tier(tier);
            let title = format!("{} KEYS", tier.name().to_uppercase());
            output.print_keys(&title, &keys)
        }
        None => {
            let keys: Vec<_> = store.records().into_iter().enumerate().collect();
            output.print_keys("KEY LIST", &keys)
        }
    }
}

/// Show key statistics
pub fn stats(store: &KeyStore, output: &Output) -> Result<()> {
    output.print_stats(&store.stats())
}

/// Find keys by assigned user (substring match)
pub fn search(store: &KeyStore, user: &str, output: &Output) -> Result<()> {
    output.print_search_results(&store.search_by_user(user))
}
