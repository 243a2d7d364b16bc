use std::path::Path;

use colored::Colorize;

use crate::csv_import;
use crate::db::{get_connection, init_db};
use crate::error::{LedgerError, Result};
use crate::ingest::{ingest_batch, IngestSummary};
use crate::models::RawRecord;
use crate::settings::db_path;

pub fn run_csv(file: &str) -> Result<()> {
    let records = csv_import::parse_csv(Path::new(file))?;
    run_batch(&records, file)
}

pub fn run_json(file: &str) -> Result<()> {
    let records = parse_json_records(Path::new(file))?;
    run_batch(&records, file)
}

fn run_batch(records: &[RawRecord], source: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let summary = ingest_batch(&conn, records)?;
    print_summary(&summary, source);
    Ok(())
}

/// Scraper hand-off: either a single JSON array of records or one record
/// per line.
fn parse_json_records(file: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(file)?;
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| LedgerError::MalformedRecord(format!("bad JSON array: {e}")));
    }
    let mut records = Vec::new();
    for (lineno, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(line).map_err(|e| {
            LedgerError::MalformedRecord(format!("bad JSON on line {}: {e}", lineno + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn print_summary(summary: &IngestSummary, source: &str) {
    println!(
        "Processed {} record(s) from {source}: {} inserted, {} updated, {} unchanged, {} skipped",
        summary.total(),
        summary.inserted.to_string().green(),
        summary.updated,
        summary.unchanged,
        summary.skipped,
    );
    if !summary.anomalies.is_empty() {
        println!("{}", "Anomalies:".yellow());
        for anomaly in &summary.anomalies {
            println!("  {anomaly}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_records_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"[{"timestamp":"2026-02-24T10:00:00Z","description":"WALMART.COM","amount_usd":42.5,"card":"7867","status":"PENDING"}]"#,
        )
        .unwrap();
        let records = parse_json_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].merchant, "WALMART.COM");
    }

    #[test]
    fn test_parse_json_records_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"timestamp":"2026-02-24T10:00:00Z","merchant":"WALMART.COM","amount":"42.50","card":"7867","status":"PENDING"}"#,
                "\n\n",
                r#"{"timestamp":"2026-02-24T11:00:00Z","merchant":"UBER TRIP","amount":"17.80","card":"5521","status":"CLEARED"}"#,
                "\n",
            ),
        )
        .unwrap();
        let records = parse_json_records(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_json_records_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            parse_json_records(&path),
            Err(LedgerError::MalformedRecord(_))
        ));
    }
}
