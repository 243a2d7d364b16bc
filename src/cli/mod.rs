pub mod cards;
pub mod categories;
pub mod import;
pub mod init;
pub mod report;
pub mod status;

use clap::{Parser, Subcommand};

use crate::error::{LedgerError, Result};

/// "YYYY-MM" -> (year, month); defaults to the current local month.
pub(crate) fn parse_month_opt(month: &Option<String>) -> Result<(i32, u32)> {
    use chrono::Datelike;
    match month {
        Some(raw) => {
            let parts: Vec<&str> = raw.split('-').collect();
            let parsed = if parts.len() == 2 {
                match (parts[0].parse(), parts[1].parse()) {
                    (Ok(y), Ok(m)) if (1..=12).contains(&m) => Some((y, m)),
                    _ => None,
                }
            } else {
                None
            };
            parsed.ok_or_else(|| LedgerError::Other(format!("invalid month (want YYYY-MM): {raw}")))
        }
        None => {
            let now = chrono::Local::now();
            Ok((now.year(), now.month()))
        }
    }
}

/// "YYYY-MM-DD" -> (year, month, day); defaults to today (local).
pub(crate) fn parse_date_opt(date: &Option<String>) -> Result<(i32, u32, u32)> {
    use chrono::Datelike;
    match date {
        Some(raw) => {
            let parsed = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| LedgerError::Other(format!("invalid date (want YYYY-MM-DD): {raw}")))?;
            Ok((parsed.year(), parsed.month(), parsed.day()))
        }
        None => {
            let today = chrono::Local::now().date_naive();
            Ok((today.year(), today.month(), today.day()))
        }
    }
}

#[derive(Parser)]
#[command(
    name = "cardledger",
    about = "Card transaction ingestion, dedup, and category-aware reporting."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up cardledger: choose a data directory and initialize the database.
    Init {
        /// Path for cardledger data (default: ~/.local/share/cardledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a provider CSV export.
    Import {
        /// Path to the CSV file
        file: String,
    },
    /// Ingest scraper output (a JSON array or JSON-lines file of records).
    Ingest {
        /// Path to the JSON file
        file: String,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Manage cards.
    Cards {
        #[command(subcommand)]
        command: CardsCommands,
    },
    /// Manage categories and card memberships.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show database location and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Everything not yet reported, grouped by card; marks it reported.
    Latest {
        /// Print the report without marking transactions as reported
        #[arg(long = "no-mark")]
        no_mark: bool,
        /// Restrict to one or more cards
        #[arg(long)]
        card: Vec<String>,
    },
    /// One calendar day (server-local), grouped by card.
    Daily {
        /// Day: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Restrict to one or more cards
        #[arg(long)]
        card: Vec<String>,
    },
    /// Monthly totals per category and card, with top merchants.
    Monthly {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// How many top merchants to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Subcommand)]
pub enum CardsCommands {
    /// List known cards.
    List,
    /// Set a display nickname for a card.
    Nickname {
        /// Card id as reported by the provider
        card: String,
        /// Display label
        name: String,
    },
    /// Remove a card. Historical transactions keep the raw card id.
    Remove {
        /// Card id
        card: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories and their member cards.
    List,
    /// Create a category. Fails if the name exists; "All" is reserved.
    Create {
        /// Category name (case-sensitive)
        name: String,
    },
    /// Delete a category and its memberships.
    Delete {
        /// Category name
        name: String,
    },
    /// Add a card to a category.
    Assign {
        /// Card id
        card: String,
        /// Category name
        category: String,
    },
    /// Remove a card from a category.
    Unassign {
        /// Card id
        card: String,
        /// Category name
        category: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(&Some("2026-02".to_string())).unwrap(), (2026, 2));
        assert!(parse_month_opt(&Some("2026-13".to_string())).is_err());
        assert!(parse_month_opt(&Some("February".to_string())).is_err());
        assert!(parse_month_opt(&None).is_ok());
    }

    #[test]
    fn test_parse_date_opt() {
        assert_eq!(
            parse_date_opt(&Some("2026-02-24".to_string())).unwrap(),
            (2026, 2, 24)
        );
        assert!(parse_date_opt(&Some("2026-02-30".to_string())).is_err());
        assert!(parse_date_opt(&None).is_ok());
    }
}
