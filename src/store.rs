use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::dedup::{canonical_amount, canonical_timestamp};
use crate::error::Result;
use crate::models::{Transaction, Transition, TxnStatus};

/// What `upsert` did with a record. `IllegalTransition` is a non-fatal
/// outcome, not an error: the batch pipeline records it and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
    IllegalTransition { stored: TxnStatus, incoming: TxnStatus },
}

// The WHERE clause is the transition table: only PENDING rows accept a new
// status, and only a terminal one. Concurrent ingestions of the same event
// funnel through the unique dedup_key constraint, so this single statement
// can never produce two rows or a backward move, regardless of interleaving.
const UPSERT_SQL: &str = "
INSERT INTO transactions (dedup_key, timestamp, merchant, amount, card, status)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(dedup_key) DO UPDATE SET
    status = excluded.status,
    last_updated_at = datetime('now')
WHERE transactions.status = 'PENDING'
  AND excluded.status IN ('CLEARED', 'CANCELLED')
";

/// Insert-or-merge one transaction keyed by its dedup key.
///
/// On insert the row starts unreported with `first_seen_at = now`. On
/// conflict only `status`/`last_updated_at` may change, and only along a
/// forward transition; `timestamp`, `amount`, `merchant` and `card` are
/// immutable after insert and silently ignored if a later record differs.
pub fn upsert(
    conn: &Connection,
    dedup_key: &str,
    timestamp: &DateTime<Utc>,
    merchant: &str,
    amount: &Decimal,
    card: &str,
    status: TxnStatus,
) -> Result<UpsertOutcome> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT status FROM transactions WHERE dedup_key = ?1",
            [dedup_key],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let run = |conn: &Connection| -> Result<usize> {
        Ok(conn.execute(
            UPSERT_SQL,
            rusqlite::params![
                dedup_key,
                canonical_timestamp(timestamp),
                merchant.trim(),
                canonical_amount(amount),
                card,
                status.as_str(),
            ],
        )?)
    };

    match stored {
        None => {
            run(conn)?;
            Ok(UpsertOutcome::Inserted)
        }
        Some(raw) => {
            let stored = TxnStatus::parse(&raw)?;
            match stored.check_transition(status) {
                Transition::Noop => Ok(UpsertOutcome::Unchanged),
                Transition::Illegal => Ok(UpsertOutcome::IllegalTransition {
                    stored,
                    incoming: status,
                }),
                Transition::Forward => {
                    // The guard rechecks PENDING, so a concurrent writer that
                    // got there first leaves this a no-op.
                    if run(conn)? == 1 {
                        Ok(UpsertOutcome::Updated)
                    } else {
                        Ok(UpsertOutcome::Unchanged)
                    }
                }
            }
        }
    }
}

/// Idempotently flag transactions as included in a sent report. Never
/// clears the flag.
pub fn mark_reported(conn: &Connection, keys: &[String]) -> Result<usize> {
    if keys.is_empty() {
        return Ok(0);
    }
    let placeholders = (1..=keys.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE transactions SET reported = 1, last_updated_at = datetime('now') \
         WHERE dedup_key IN ({placeholders}) AND reported = 0"
    );
    let params: Vec<&dyn rusqlite::types::ToSql> =
        keys.iter().map(|k| k as &dyn rusqlite::types::ToSql).collect();
    Ok(conn.execute(&sql, params.as_slice())?)
}

/// Filter for `query`. Timestamps are half-open `[from, to)` in UTC.
#[derive(Debug, Clone, Default)]
pub struct TxnFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub cards: Option<Vec<String>>,
    pub category: Option<String>,
    pub unreported_only: bool,
    pub include_cancelled: bool,
}

/// Read transactions ordered by timestamp ascending (id as tie-break) for
/// deterministic report construction.
pub fn query(conn: &Connection, filter: &TxnFilter) -> Result<Vec<Transaction>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(from) = &filter.from {
        params.push(canonical_timestamp(from));
        clauses.push(format!("t.timestamp >= ?{}", params.len()));
    }
    if let Some(to) = &filter.to {
        params.push(canonical_timestamp(to));
        clauses.push(format!("t.timestamp < ?{}", params.len()));
    }
    if let Some(cards) = &filter.cards {
        let mut spots = Vec::new();
        for card in cards {
            params.push(card.clone());
            spots.push(format!("?{}", params.len()));
        }
        clauses.push(format!("t.card IN ({})", spots.join(", ")));
    }
    if let Some(category) = &filter.category {
        params.push(category.clone());
        clauses.push(format!(
            "t.card IN (SELECT cc.card FROM card_categories cc \
             JOIN categories c ON cc.category_id = c.id WHERE c.name = ?{})",
            params.len()
        ));
    }
    if filter.unreported_only {
        clauses.push("t.reported = 0".to_string());
    }
    if !filter.include_cancelled {
        clauses.push("t.status != 'CANCELLED'".to_string());
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT dedup_key, timestamp, merchant, amount, card, status, reported, \
                first_seen_at, last_updated_at \
         FROM transactions t {where_clause} ORDER BY t.timestamp ASC, t.id ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt.query_map(param_values.as_slice(), row_to_txn)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn row_to_txn(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let raw_ts: String = row.get(1)?;
    let raw_amount: String = row.get(3)?;
    let raw_status: String = row.get(5)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
        .map_err(|e| conversion_error(1, e))?
        .with_timezone(&Utc);
    let amount: Decimal = raw_amount.parse().map_err(|e| conversion_error(3, e))?;
    let status = TxnStatus::parse(&raw_status).map_err(|e| conversion_error(5, e))?;
    Ok(Transaction {
        dedup_key: row.get(0)?,
        timestamp,
        merchant: row.get(2)?,
        amount,
        card: row.get(4)?,
        status,
        reported: row.get::<_, i64>(6)? != 0,
        first_seen_at: row.get(7)?,
        last_updated_at: row.get(8)?,
    })
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(err),
    )
}

/// Summary counters for the `status` command.
pub struct StoreStats {
    pub txn_count: i64,
    pub unreported_count: i64,
    pub card_count: i64,
    pub category_count: i64,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

pub fn stats(conn: &Connection) -> Result<StoreStats> {
    let txn_count: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let unreported_count: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE reported = 0 AND status != 'CANCELLED'",
        [],
        |r| r.get(0),
    )?;
    let card_count: i64 = conn.query_row("SELECT count(*) FROM cards", [], |r| r.get(0))?;
    let category_count: i64 =
        conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;
    let (first_timestamp, last_timestamp) = conn.query_row(
        "SELECT MIN(timestamp), MAX(timestamp) FROM transactions",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(StoreStats {
        txn_count,
        unreported_count,
        card_count,
        category_count,
        first_timestamp,
        last_timestamp,
    })
}
