//! Interactive console menu
//!
//! Runs when `keyvault` is started without a subcommand. Input and output
//! are generic so a session can be scripted.

use std::io::{self, BufRead, Write};
use std::path::Path;

use keyvault_core::import::read_key_values;
use keyvault_core::{KeyStore, Tier};

use crate::output::{write_key_table, write_search_results, write_stats};

const NO_KEYS: &str = "No keys available.";

/// Console menu over a key store
pub struct Menu<'a, R, W> {
    store: &'a KeyStore,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(store: &'a KeyStore, input: R, out: W) -> Self {
        Self { store, input, out }
    }

    /// Show the menu until the user exits or input ends
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.out, "========================================")?;
        writeln!(self.out, "          KEYVAULT KEY MANAGER          ")?;
        writeln!(self.out, "========================================")?;

        loop {
            self.show_main_menu()?;
            let Some(choice) = self.read_line()? else {
                writeln!(self.out)?;
                return Ok(());
            };

            match choice.parse::<u32>() {
                Ok(1) => self.import_keys()?,
                Ok(2) => self.display_keys()?,
                Ok(3) => self.display_keys_by_tier()?,
                Ok(4) => self.mark_used()?,
                Ok(5) => self.mark_unused()?,
                Ok(6) => self.search()?,
                Ok(7) => self.statistics()?,
                Ok(0) => {
                    writeln!(self.out, "Exiting program. Goodbye!")?;
                    return Ok(());
                }
                _ => writeln!(self.out, "Invalid choice. Please try again.")?,
            }
        }
    }

    fn show_main_menu(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nMAIN MENU:")?;
        writeln!(self.out, "1. Import keys from text file")?;
        writeln!(self.out, "2. Display all keys")?;
        writeln!(self.out, "3. Display keys by type")?;
        writeln!(self.out, "4. Mark key as used")?;
        writeln!(self.out, "5. Mark key as unused")?;
        writeln!(self.out, "6. Search by Discord username")?;
        writeln!(self.out, "7. Display key statistics")?;
        writeln!(self.out, "0. Exit")?;
        write!(self.out, "Enter choice: ")?;
        self.out.flush()
    }

    /// Next line, trimmed; `None` at end of input
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.out, "{}", text)?;
        self.out.flush()?;
        self.read_line()
    }

    fn prompt_tier(&mut self) -> io::Result<Option<Tier>> {
        writeln!(self.out, "Select key type:")?;
        for tier in Tier::ALL {
            writeln!(self.out, "{}. {}", tier.ordinal() + 1, tier.name())?;
        }
        let Some(answer) = self.prompt("Enter choice: ")? else {
            return Ok(None);
        };

        let tier = match answer.parse::<i64>() {
            Ok(choice @ 1..=4) => Tier::from_choice(choice),
            _ => {
                writeln!(self.out, "Invalid choice. Defaulting to Daily.")?;
                Tier::Day
            }
        };
        Ok(Some(tier))
    }

    /// Ask for a 1-based key index and return the 0-based position
    fn prompt_index(&mut self, text: &str) -> io::Result<Option<usize>> {
        let Some(answer) = self.prompt(text)? else {
            return Ok(None);
        };
        let Ok(index) = answer.parse::<i64>() else {
            writeln!(self.out, "Invalid input. Please enter a number.")?;
            return Ok(None);
        };
        if index < 1 || index as usize > self.store.len() {
            writeln!(self.out, "Invalid index.")?;
            return Ok(None);
        }
        Ok(Some(index as usize - 1))
    }

    fn import_keys(&mut self) -> io::Result<()> {
        let Some(path) = self.prompt("Enter the path to the text file: ")? else {
            return Ok(());
        };
        let Some(tier) = self.prompt_tier()? else {
            return Ok(());
        };

        let values = match read_key_values(Path::new(&path)) {
            Ok(values) => values,
            Err(e) => return writeln!(self.out, "Error: {}", e),
        };

        let summary = self.store.import_values(values, tier);
        if summary.rejected > 0 {
            writeln!(
                self.out,
                "Skipped {} keys containing '|' or line breaks.",
                summary.rejected
            )?;
        }
        match summary.inserted {
            0 => writeln!(self.out, "No new keys imported."),
            n => writeln!(self.out, "Imported {} new keys of type {}.", n, tier.name()),
        }
    }

    fn display_keys(&mut self) -> io::Result<()> {
        if self.store.is_empty() {
            return writeln!(self.out, "{}", NO_KEYS);
        }
        let keys: Vec<_> = self.store.records().into_iter().enumerate().collect();
        write_key_table(&mut self.out, "KEY LIST", &keys)
    }

    fn display_keys_by_tier(&mut self) -> io::Result<()> {
        let Some(tier) = self.prompt_tier()? else {
            return Ok(());
        };
        if self.store.is_empty() {
            return writeln!(self.out, "{}", NO_KEYS);
        }

        let keys = self.store.records_by_tier(tier);
        if keys.is_empty() {
            return writeln!(self.out, "No keys found with type {}", tier.name());
        }
        let title = format!("{} KEYS", tier.name().to_uppercase());
        write_key_table(&mut self.out, &title, &keys)
    }

    fn mark_used(&mut self) -> io::Result<()> {
        if self.store.is_empty() {
            return writeln!(self.out, "{}", NO_KEYS);
        }
        self.display_keys()?;

        let Some(position) = self.prompt_index("Enter the index of the key to mark as used: ")?
        else {
            return Ok(());
        };

        if let Some(key) = self.store.get(position).filter(|k| k.used) {
            writeln!(
                self.out,
                "This key is already marked as used by: {}",
                key.assigned_user
            )?;
            let answer = self.prompt("Do you want to update the Discord username? (y/n): ")?;
            if !matches!(answer.as_deref(), Some("y" | "Y")) {
                return Ok(());
            }
        }

        let Some(username) = self.prompt("Enter Discord username: ")? else {
            return Ok(());
        };
        if self.store.mark_at(position, &username) {
            writeln!(self.out, "Key marked as used by {}", username)
        } else {
            writeln!(self.out, "Invalid index.")
        }
    }

    fn mark_unused(&mut self) -> io::Result<()> {
        if self.store.is_empty() {
            return writeln!(self.out, "{}", NO_KEYS);
        }
        self.display_keys()?;

        let Some(position) =
            self.prompt_index("Enter the index of the key to mark as unused: ")?
        else {
            return Ok(());
        };

        if self.store.unmark_at(position) {
            writeln!(self.out, "Key marked as unused.")
        } else {
            writeln!(self.out, "Invalid index.")
        }
    }

    fn search(&mut self) -> io::Result<()> {
        if self.store.is_empty() {
            return writeln!(self.out, "{}", NO_KEYS);
        }
        let Some(username) = self.prompt("Enter Discord username to search for: ")? else {
            return Ok(());
        };
        let results = self.store.search_by_user(&username);
        write_search_results(&mut self.out, &results)
    }

    fn statistics(&mut self) -> io::Result<()> {
        write_stats(&mut self.out, &self.store.stats())
    }
}
