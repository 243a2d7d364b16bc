use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::models::RawRecord;

/// Parses a card-provider CSV export into raw producer records. The export
/// carries more columns than the pipeline needs (card holder, original
/// currency, cashback, ...); only the identifying fields are read, by
/// header name. Field validation happens in the pipeline, not here, so a
/// bad amount in one row cannot abort the file.
pub fn parse_csv(file_path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let headers = rdr.headers()?.clone();
    let idx = |names: &[&str]| -> Option<usize> {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let col_timestamp = idx(&["timestamp"]);
    let col_merchant = idx(&["description", "merchant"]);
    let col_amount = idx(&["amount USD", "amount"]);
    let col_card = idx(&["card"]);
    let col_status = idx(&["status"]);
    let (col_timestamp, col_merchant, col_amount, col_card, col_status) =
        match (col_timestamp, col_merchant, col_amount, col_card, col_status) {
            (Some(t), Some(m), Some(a), Some(c), Some(s)) => (t, m, a, c, s),
            _ => {
                return Err(LedgerError::MalformedRecord(format!(
                    "CSV is missing required columns (have: {})",
                    headers.iter().collect::<Vec<_>>().join(", ")
                )))
            }
        };

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(RawRecord {
            timestamp: field(col_timestamp),
            merchant: field(col_merchant),
            amount: field(col_amount),
            card: field(col_card),
            status: field(col_status),
        });
    }
    Ok(rows)
}
