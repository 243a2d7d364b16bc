use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::dedup;
use crate::error::{LedgerError, Result};
use crate::models::{RawRecord, TxnStatus};
use crate::registry;
use crate::store::{self, UpsertOutcome};

/// Non-fatal per-record irregularity, collected in the batch summary
/// instead of aborting sibling records.
#[derive(Debug, Clone)]
pub enum Anomaly {
    Malformed {
        index: usize,
        reason: String,
    },
    IllegalTransition {
        dedup_key: String,
        merchant: String,
        stored: TxnStatus,
        incoming: TxnStatus,
    },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { index, reason } => {
                write!(f, "record {index}: skipped ({reason})")
            }
            Self::IllegalTransition {
                merchant,
                stored,
                incoming,
                ..
            } => write!(
                f,
                "{merchant}: illegal status transition {stored} -> {incoming}, kept {stored}"
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub anomalies: Vec<Anomaly>,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.skipped
    }
}

/// Accepts producer timestamps as RFC3339 (scraper) or as a bare
/// "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DDTHH:MM:SS" assumed UTC (CSV export).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(LedgerError::MalformedRecord(format!(
        "unparseable timestamp: {raw}"
    )))
}

pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return Err(LedgerError::MalformedRecord("empty amount".to_string()));
    }
    cleaned
        .parse::<Decimal>()
        .map_err(|_| LedgerError::MalformedRecord(format!("unparseable amount: {raw}")))
}

struct Normalized {
    dedup_key: String,
    timestamp: DateTime<Utc>,
    merchant: String,
    amount: Decimal,
    card: String,
    status: TxnStatus,
}

fn normalize(record: &RawRecord) -> Result<Normalized> {
    let merchant = record.merchant.trim().to_string();
    if merchant.is_empty() {
        return Err(LedgerError::MalformedRecord("empty merchant".to_string()));
    }
    let card = record.card.trim().to_string();
    if card.is_empty() {
        return Err(LedgerError::MalformedRecord("empty card id".to_string()));
    }
    let timestamp = parse_timestamp(&record.timestamp)?;
    let amount = parse_amount(&record.amount)?;
    let status = TxnStatus::parse(&record.status)?;
    let dedup_key = dedup::dedup_key(&timestamp, &amount, &merchant);
    Ok(Normalized {
        dedup_key,
        timestamp,
        merchant,
        amount,
        card,
        status,
    })
}

/// Runs a producer batch through key derivation, card auto-registration and
/// the store upsert. Each record is independent: malformed rows and illegal
/// transitions are recorded as anomalies and the batch continues. Re-running
/// the same batch yields `inserted = 0` and an identical store.
pub fn ingest_batch(conn: &Connection, records: &[RawRecord]) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for (index, record) in records.iter().enumerate() {
        let normalized = match normalize(record) {
            Ok(n) => n,
            Err(e) => {
                summary.skipped += 1;
                summary.anomalies.push(Anomaly::Malformed {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        registry::ensure_card(conn, &normalized.card)?;
        let outcome = store::upsert(
            conn,
            &normalized.dedup_key,
            &normalized.timestamp,
            &normalized.merchant,
            &normalized.amount,
            &normalized.card,
            normalized.status,
        )?;
        match outcome {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
            UpsertOutcome::Unchanged => summary.unchanged += 1,
            UpsertOutcome::IllegalTransition { stored, incoming } => {
                summary.unchanged += 1;
                summary.anomalies.push(Anomaly::IllegalTransition {
                    dedup_key: normalized.dedup_key,
                    merchant: normalized.merchant,
                    stored,
                    incoming,
                });
            }
        }
    }

    Ok(summary)
}
