use std::collections::BTreeMap;

use chrono::{Duration, Local, TimeZone, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::Transaction;
use crate::registry::{self, ALL_CATEGORY};
use crate::store::{self, TxnFilter};

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MerchantTotal {
    pub merchant: String,
    pub total: Decimal,
}

/// Transactions for one card, used by the unreported and daily views.
#[derive(Debug)]
pub struct CardGroup {
    pub card: String,
    pub display_name: String,
    pub categories: Vec<String>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug)]
pub struct CardSummary {
    pub card: String,
    pub display_name: String,
    pub categories: Vec<String>,
    pub total: Decimal,
    pub txn_count: usize,
    pub top_merchants: Vec<MerchantTotal>,
}

#[derive(Debug)]
pub struct CategorySummary {
    pub name: String,
    pub subtotal: Decimal,
    pub cards: Vec<CardSummary>,
}

#[derive(Debug)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub grand_total: Decimal,
    /// The implicit "All" grouping first, then each explicit category that
    /// has at least one active card this month.
    pub categories: Vec<CategorySummary>,
    pub top_merchants: Vec<MerchantTotal>,
}

/// All dedup keys in a set of card groups, for a follow-up `mark_reported`.
pub fn dedup_keys(groups: &[CardGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|g| g.transactions.iter().map(|t| t.dedup_key.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Unreported / daily
// ---------------------------------------------------------------------------

/// Unreported, non-cancelled transactions grouped by card. A pure read:
/// the caller decides when (and whether) to `mark_reported` afterwards, so
/// a delivery failure downstream never loses transactions.
pub fn unreported(conn: &Connection, cards: Option<Vec<String>>) -> Result<Vec<CardGroup>> {
    let filter = TxnFilter {
        cards,
        unreported_only: true,
        ..Default::default()
    };
    let rows = store::query(conn, &filter)?;
    group_by_card(conn, rows)
}

/// Transactions for one calendar day in server-local time, grouped by card.
pub fn daily(
    conn: &Connection,
    year: i32,
    month: u32,
    day: u32,
    cards: Option<Vec<String>>,
) -> Result<Vec<CardGroup>> {
    let start = Local
        .with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| {
            LedgerError::Other(format!("invalid date: {year:04}-{month:02}-{day:02}"))
        })?;
    let end = start + Duration::days(1);
    let filter = TxnFilter {
        from: Some(start.with_timezone(&Utc)),
        to: Some(end.with_timezone(&Utc)),
        cards,
        ..Default::default()
    };
    let rows = store::query(conn, &filter)?;
    group_by_card(conn, rows)
}

fn group_by_card(conn: &Connection, rows: Vec<Transaction>) -> Result<Vec<CardGroup>> {
    let mut by_card: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
    for txn in rows {
        by_card.entry(txn.card.clone()).or_default().push(txn);
    }
    let mut groups = Vec::with_capacity(by_card.len());
    for (card, transactions) in by_card {
        groups.push(CardGroup {
            display_name: registry::card_display(conn, &card)?,
            categories: registry::categories_for_card(conn, &card)?,
            card,
            transactions,
        });
    }
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Monthly summary
// ---------------------------------------------------------------------------

/// One calendar month (server-local), excluding cancelled transactions.
/// Every card lands in the "All" grouping; a card with explicit memberships
/// additionally appears under each of them. Sums are exact decimals.
pub fn monthly(conn: &Connection, year: i32, month: u32, top_n: usize) -> Result<MonthlySummary> {
    let start = Local
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| LedgerError::Other(format!("invalid month: {year:04}-{month:02}")))?;
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = Local
        .with_ymd_and_hms(next_y, next_m, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| LedgerError::Other(format!("invalid month: {year:04}-{month:02}")))?;

    let filter = TxnFilter {
        from: Some(start.with_timezone(&Utc)),
        to: Some(end.with_timezone(&Utc)),
        ..Default::default()
    };
    let rows = store::query(conn, &filter)?;

    // Per-card rollup, keyed by card id for stable ordering.
    let mut per_card: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for txn in &rows {
        per_card.entry(txn.card.clone()).or_default().push(txn);
    }

    let mut summaries: BTreeMap<String, CardSummary> = BTreeMap::new();
    for (card, txns) in per_card {
        let total: Decimal = txns.iter().map(|t| t.amount).sum();
        summaries.insert(
            card.clone(),
            CardSummary {
                display_name: registry::card_display(conn, &card)?,
                categories: registry::categories_for_card(conn, &card)?,
                total,
                txn_count: txns.len(),
                top_merchants: top_merchants(txns.iter().copied(), top_n),
                card,
            },
        );
    }

    let grand_total: Decimal = summaries.values().map(|c| c.total).sum();

    let mut categories = Vec::new();
    categories.push(CategorySummary {
        name: ALL_CATEGORY.to_string(),
        subtotal: grand_total,
        cards: summaries.values().map(clone_summary).collect(),
    });
    // Membership is read fresh per call; no grouping is cached across
    // reports.
    for cat in registry::list_categories(conn)? {
        let cards: Vec<CardSummary> = summaries
            .values()
            .filter(|c| c.categories.iter().any(|name| name == &cat.name))
            .map(clone_summary)
            .collect();
        if !cards.is_empty() {
            categories.push(CategorySummary {
                subtotal: cards.iter().map(|c| c.total).sum(),
                name: cat.name,
                cards,
            });
        }
    }

    Ok(MonthlySummary {
        year,
        month,
        grand_total,
        categories,
        top_merchants: top_merchants(rows.iter(), top_n),
    })
}

fn clone_summary(c: &CardSummary) -> CardSummary {
    CardSummary {
        card: c.card.clone(),
        display_name: c.display_name.clone(),
        categories: c.categories.clone(),
        total: c.total,
        txn_count: c.txn_count,
        top_merchants: c.top_merchants.clone(),
    }
}

/// Totals by merchant, descending by spend, ties broken by merchant name
/// ascending, truncated to `top_n`.
fn top_merchants<'a, I>(txns: I, top_n: usize) -> Vec<MerchantTotal>
where
    I: Iterator<Item = &'a Transaction>,
{
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for txn in txns {
        *totals.entry(txn.merchant.clone()).or_default() += txn.amount;
    }
    let mut ranked: Vec<MerchantTotal> = totals
        .into_iter()
        .map(|(merchant, total)| MerchantTotal { merchant, total })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then(a.merchant.cmp(&b.merchant)));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::ingest::ingest_batch;
    use crate::models::RawRecord;
    use std::str::FromStr;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn record(ts: &str, merchant: &str, amount: &str, card: &str, status: &str) -> RawRecord {
        RawRecord {
            timestamp: ts.to_string(),
            merchant: merchant.to_string(),
            amount: amount.to_string(),
            card: card.to_string(),
            status: status.to_string(),
        }
    }

    /// A local-time stamp inside the given day, rendered RFC3339, so tests
    /// are independent of the host timezone.
    fn local_ts(y: i32, m: u32, d: u32, h: u32) -> String {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap()
            .to_rfc3339()
    }

    #[test]
    fn test_unreported_then_mark_then_empty() {
        let (_dir, conn) = test_db();
        let batch = vec![
            record("2026-02-24T10:00:00Z", "WALMART.COM", "42.50", "7867", "PENDING"),
            record("2026-02-24T11:00:00Z", "UBER TRIP", "17.80", "5521", "CLEARED"),
        ];
        ingest_batch(&conn, &batch).unwrap();

        let groups = unreported(&conn, None).unwrap();
        assert_eq!(groups.len(), 2);
        let keys = dedup_keys(&groups);
        assert_eq!(keys.len(), 2);
        store::mark_reported(&conn, &keys).unwrap();

        assert!(unreported(&conn, None).unwrap().is_empty());
        // Re-ingesting with unchanged statuses must not resurface them.
        ingest_batch(&conn, &batch).unwrap();
        assert!(unreported(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_unreported_excludes_cancelled() {
        let (_dir, conn) = test_db();
        ingest_batch(
            &conn,
            &[
                record("2026-02-24T10:00:00Z", "WALMART.COM", "42.50", "7867", "CANCELLED"),
                record("2026-02-24T11:00:00Z", "UBER TRIP", "17.80", "7867", "PENDING"),
            ],
        )
        .unwrap();
        let groups = unreported(&conn, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].transactions.len(), 1);
        assert_eq!(groups[0].transactions[0].merchant, "UBER TRIP");
    }

    #[test]
    fn test_daily_selects_local_calendar_day() {
        let (_dir, conn) = test_db();
        ingest_batch(
            &conn,
            &[
                record(&local_ts(2026, 2, 24, 9), "WALMART.COM", "42.50", "7867", "PENDING"),
                record(&local_ts(2026, 2, 24, 23), "UBER TRIP", "17.80", "7867", "PENDING"),
                record(&local_ts(2026, 2, 25, 1), "NETFLIX", "9.99", "7867", "PENDING"),
            ],
        )
        .unwrap();
        let groups = daily(&conn, 2026, 2, 24, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].transactions.len(), 2);
        assert!(daily(&conn, 2026, 2, 30, None).is_err());
    }

    fn seed_month(conn: &Connection) {
        ingest_batch(
            conn,
            &[
                record(&local_ts(2026, 2, 10, 10), "WALMART.COM", "40.00", "7867", "CLEARED"),
                record(&local_ts(2026, 2, 11, 10), "WALMART.COM", "10.00", "7867", "CLEARED"),
                record(&local_ts(2026, 2, 12, 10), "UBER TRIP", "25.00", "7867", "CLEARED"),
                record(&local_ts(2026, 2, 13, 10), "NETFLIX", "15.99", "5521", "CLEARED"),
                record(&local_ts(2026, 2, 14, 10), "CANCELLED THING", "99.00", "5521", "CANCELLED"),
                record(&local_ts(2026, 3, 1, 10), "NEXT MONTH", "50.00", "5521", "CLEARED"),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_monthly_grand_total_and_window() {
        let (_dir, conn) = test_db();
        seed_month(&conn);
        let summary = monthly(&conn, 2026, 2, 10).unwrap();
        // Cancelled and next-month rows excluded.
        assert_eq!(summary.grand_total, Decimal::from_str("90.99").unwrap());
        assert_eq!(summary.categories[0].name, "All");
        assert_eq!(summary.categories[0].subtotal, summary.grand_total);
        assert_eq!(summary.categories[0].cards.len(), 2);
    }

    #[test]
    fn test_monthly_category_totals_consistency() {
        let (_dir, conn) = test_db();
        seed_month(&conn);
        registry::ensure_card(&conn, "7867").unwrap();
        registry::ensure_card(&conn, "5521").unwrap();
        let biz = registry::create_category(&conn, "Business").unwrap();
        let travel = registry::create_category(&conn, "Travel").unwrap();
        registry::add_membership(&conn, "7867", biz).unwrap();
        registry::add_membership(&conn, "7867", travel).unwrap();
        registry::add_membership(&conn, "5521", biz).unwrap();

        let summary = monthly(&conn, 2026, 2, 10).unwrap();
        let all = &summary.categories[0];
        assert_eq!(all.subtotal, summary.grand_total);

        // Distinct cards across explicit categories cover every card, so
        // the union-total matches the grand total.
        let mut seen = std::collections::BTreeMap::new();
        for cat in &summary.categories[1..] {
            for card in &cat.cards {
                seen.insert(card.card.clone(), card.total);
            }
        }
        let union_total: Decimal = seen.values().copied().sum();
        assert_eq!(union_total, summary.grand_total);
    }

    #[test]
    fn test_monthly_multi_category_card_listed_under_each() {
        let (_dir, conn) = test_db();
        seed_month(&conn);
        registry::ensure_card(&conn, "7867").unwrap();
        let biz = registry::create_category(&conn, "Business").unwrap();
        let travel = registry::create_category(&conn, "Travel").unwrap();
        registry::add_membership(&conn, "7867", biz).unwrap();
        registry::add_membership(&conn, "7867", travel).unwrap();

        let summary = monthly(&conn, 2026, 2, 10).unwrap();
        let names: Vec<&str> = summary.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["All", "Business", "Travel"]);
        for cat in &summary.categories[1..] {
            assert_eq!(cat.cards.len(), 1);
            assert_eq!(cat.cards[0].card, "7867");
            // Annotation source: the card's other memberships are visible.
            assert_eq!(cat.cards[0].categories, vec!["Business", "Travel"]);
        }
    }

    #[test]
    fn test_monthly_uncategorized_card_only_under_all() {
        let (_dir, conn) = test_db();
        seed_month(&conn);
        registry::ensure_card(&conn, "7867").unwrap();
        let biz = registry::create_category(&conn, "Business").unwrap();
        registry::add_membership(&conn, "7867", biz).unwrap();

        let summary = monthly(&conn, 2026, 2, 10).unwrap();
        let business = summary.categories.iter().find(|c| c.name == "Business").unwrap();
        assert!(business.cards.iter().all(|c| c.card != "5521"));
        assert!(summary.categories[0].cards.iter().any(|c| c.card == "5521"));
    }

    #[test]
    fn test_top_merchants_ranking_and_ties() {
        let (_dir, conn) = test_db();
        ingest_batch(
            &conn,
            &[
                record(&local_ts(2026, 2, 10, 10), "BBB", "20.00", "1", "CLEARED"),
                record(&local_ts(2026, 2, 11, 10), "AAA", "20.00", "1", "CLEARED"),
                record(&local_ts(2026, 2, 12, 10), "CCC", "30.00", "1", "CLEARED"),
                record(&local_ts(2026, 2, 13, 10), "DDD", "1.00", "1", "CLEARED"),
            ],
        )
        .unwrap();
        let summary = monthly(&conn, 2026, 2, 3).unwrap();
        let names: Vec<&str> = summary
            .top_merchants
            .iter()
            .map(|m| m.merchant.as_str())
            .collect();
        // CCC leads; AAA and BBB tie on total so the name breaks the tie.
        assert_eq!(names, vec!["CCC", "AAA", "BBB"]);
    }
}
