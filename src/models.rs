use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::error::{LedgerError, Result};

/// Lifecycle status of a card transaction as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Pending,
    Cleared,
    Cancelled,
}

/// Outcome of checking a proposed status change against the lifecycle
/// state machine. Statuses only move forward: PENDING may become CLEARED
/// or CANCELLED, nothing ever reverts or crosses between terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Forward,
    Noop,
    Illegal,
}

impl TxnStatus {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CLEARED" => Ok(Self::Cleared),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(LedgerError::MalformedRecord(format!(
                "unknown status: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Cleared => "CLEARED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn check_transition(self, incoming: TxnStatus) -> Transition {
        if self == incoming {
            return Transition::Noop;
        }
        match (self, incoming) {
            (Self::Pending, Self::Cleared) | (Self::Pending, Self::Cancelled) => {
                Transition::Forward
            }
            _ => Transition::Illegal,
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored transaction row. `timestamp`, `amount`, `merchant` and `card`
/// are immutable after insert; only `status` and `reported` evolve.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Transaction {
    pub dedup_key: String,
    pub timestamp: DateTime<Utc>,
    pub merchant: String,
    pub amount: Decimal,
    pub card: String,
    pub status: TxnStatus,
    pub reported: bool,
    pub first_seen_at: String,
    pub last_updated_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Card {
    pub card: String,
    pub nickname: Option<String>,
    pub first_seen_at: String,
}

impl Card {
    /// "nickname (card)" when a nickname is set, else the raw id.
    pub fn display_name(&self) -> String {
        match &self.nickname {
            Some(n) if !n.is_empty() => format!("{n} ({})", self.card),
            _ => self.card.clone(),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Raw producer record, shared shape for the CSV importer and the scraper
/// JSON hand-off. Fields arrive as text and are validated by the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub timestamp: String,
    #[serde(alias = "description")]
    pub merchant: String,
    #[serde(alias = "amount_usd", deserialize_with = "amount_as_text")]
    pub amount: String,
    pub card: String,
    pub status: String,
}

// Scraper JSON carries amounts as either strings or bare numbers.
fn amount_as_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(TxnStatus::parse("pending").unwrap(), TxnStatus::Pending);
        assert_eq!(TxnStatus::parse(" Cleared ").unwrap(), TxnStatus::Cleared);
        assert_eq!(TxnStatus::parse("CANCELLED").unwrap(), TxnStatus::Cancelled);
        assert!(TxnStatus::parse("settled").is_err());
    }

    #[test]
    fn test_transition_table() {
        use TxnStatus::*;
        assert_eq!(Pending.check_transition(Cleared), Transition::Forward);
        assert_eq!(Pending.check_transition(Cancelled), Transition::Forward);
        assert_eq!(Pending.check_transition(Pending), Transition::Noop);
        assert_eq!(Cleared.check_transition(Cleared), Transition::Noop);
        assert_eq!(Cancelled.check_transition(Cancelled), Transition::Noop);
        assert_eq!(Cleared.check_transition(Pending), Transition::Illegal);
        assert_eq!(Cancelled.check_transition(Pending), Transition::Illegal);
        assert_eq!(Cleared.check_transition(Cancelled), Transition::Illegal);
        assert_eq!(Cancelled.check_transition(Cleared), Transition::Illegal);
    }

    #[test]
    fn test_card_display_name() {
        let card = Card {
            card: "7867".to_string(),
            nickname: Some("Ops".to_string()),
            first_seen_at: String::new(),
        };
        assert_eq!(card.display_name(), "Ops (7867)");
        let bare = Card {
            card: "7867".to_string(),
            nickname: None,
            first_seen_at: String::new(),
        };
        assert_eq!(bare.display_name(), "7867");
    }

    #[test]
    fn test_raw_record_amount_accepts_numbers_and_strings() {
        let r: RawRecord = serde_json::from_str(
            r#"{"timestamp":"2026-02-24T10:00:00Z","description":"WALMART.COM","amount_usd":42.5,"card":"7867","status":"PENDING"}"#,
        )
        .unwrap();
        assert_eq!(r.amount, "42.5");
        assert_eq!(r.merchant, "WALMART.COM");
        let r: RawRecord = serde_json::from_str(
            r#"{"timestamp":"2026-02-24T10:00:00Z","merchant":"WALMART.COM","amount":"42.50","card":"7867","status":"PENDING"}"#,
        )
        .unwrap();
        assert_eq!(r.amount, "42.50");
    }
}
