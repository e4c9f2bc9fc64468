//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! The table writers are shared with the interactive menu, which writes to
//! whatever stream it was given.

use std::io::{self, Write};

use anyhow::Result;
use keyvault_core::api::KeyView;
use keyvault_core::{KeyRecord, KeyStats, Tier};

const RULE: &str = "-----------------------------------------------------";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print keys with their positions in the collection
    pub fn print_keys(&self, title: &str, keys: &[(usize, KeyRecord)]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let mut out = io::stdout().lock();
                if keys.is_empty() {
                    writeln!(out, "No keys available.")?;
                } else {
                    write_key_table(&mut out, title, keys)?;
                    writeln!(out, "\n{} key(s)", keys.len())?;
                }
            }
            OutputFormat::Json => {
                let views: Vec<_> = keys
                    .iter()
                    .map(|(id, record)| KeyView::new(*id, record.clone()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            }
            OutputFormat::Quiet => {
                for (_, record) in keys {
                    println!("{}", record.value);
                }
            }
        }
        Ok(())
    }

    /// Print search results
    pub fn print_search_results(&self, keys: &[KeyRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Human => write_search_results(&mut io::stdout().lock(), keys)?,
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(keys)?),
            OutputFormat::Quiet => {
                for record in keys {
                    println!("{}", record.value);
                }
            }
        }
        Ok(())
    }

    /// Print key statistics
    pub fn print_stats(&self, stats: &KeyStats) -> Result<()> {
        match self.format {
            OutputFormat::Human => write_stats(&mut io::stdout().lock(), stats)?,
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
            OutputFormat::Quiet => {
                println!("{} {}", stats.used_keys, stats.total_keys);
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Write a key table; indices are shown 1-based
pub fn write_key_table<W: Write>(
    out: &mut W,
    title: &str,
    keys: &[(usize, KeyRecord)],
) -> io::Result<()> {
    writeln!(out, "\n--- {} ---", title)?;
    writeln!(out, "Index | Key | Type | Status | Discord Username")?;
    writeln!(out, "{}", RULE)?;
    for (position, record) in keys {
        let line = format!(
            "{} | {} | {} | {} | {}",
            position + 1,
            record.value,
            record.tier.name(),
            record.status(),
            record.assigned_user
        );
        writeln!(out, "{}", line.trim_end())?;
    }
    writeln!(out, "{}", RULE)
}

pub fn write_search_results<W: Write>(out: &mut W, keys: &[KeyRecord]) -> io::Result<()> {
    writeln!(out, "\n--- SEARCH RESULTS ---")?;
    if keys.is_empty() {
        writeln!(out, "No keys found for the specified Discord username.")?;
    } else {
        writeln!(out, "Key | Type | Status | Discord Username")?;
        writeln!(out, "{}", RULE)?;
        for record in keys {
            writeln!(
                out,
                "{} | {} | {} | {}",
                record.value,
                record.tier.name(),
                record.status(),
                record.assigned_user
            )?;
        }
    }
    writeln!(out, "{}", RULE)
}

/// Write per-tier totals with integer percentages
///
/// Tiers without keys are left out.
pub fn write_stats<W: Write>(out: &mut W, stats: &KeyStats) -> io::Result<()> {
    if stats.total_keys == 0 {
        return writeln!(out, "No keys available.");
    }

    writeln!(out, "\n--- KEY STATISTICS ---")?;
    writeln!(out, "Total keys: {}", stats.total_keys)?;

    for tier in Tier::ALL {
        let t = stats.keys_by_type.get(tier);
        if t.total == 0 {
            continue;
        }
        writeln!(out, "\n{} keys:", tier.name())?;
        writeln!(out, "  Total: {}", t.total)?;
        writeln!(out, "  Used: {} ({}%)", t.used, percent(t.used, t.total))?;
        writeln!(
            out,
            "  Available: {} ({}%)",
            t.available,
            percent(t.available, t.total)
        )?;
    }

    writeln!(
        out,
        "\nTotal used keys: {} ({}%)",
        stats.used_keys,
        percent(stats.used_keys, stats.total_keys)
    )?;
    writeln!(
        out,
        "Total available keys: {} ({}%)",
        stats.available_keys,
        percent(stats.available_keys, stats.total_keys)
    )
}

/// Integer percentage, rounded down
fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}
