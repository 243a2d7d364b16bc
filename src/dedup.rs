use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// RFC3339 UTC with whole seconds, e.g. "2026-02-24T10:00:00Z". Both
/// producers normalize to this before hashing or storage.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fixed two-decimal rendering so "42.5", "42.50" and any float-derived
/// textual variant of the same value produce the same key.
pub fn canonical_amount(amount: &Decimal) -> String {
    format!("{amount:.2}")
}

/// Stable identity of an economic event: sha256 over the canonical
/// concatenation of the immutable fields, '|'-separated. Card and status
/// are deliberately excluded so a status change on the same event collides
/// with the stored row and becomes an update. Two genuinely distinct
/// transactions with identical timestamp, amount and merchant collapse to
/// one row; accepted limitation.
pub fn dedup_key(timestamp: &DateTime<Utc>, amount: &Decimal, merchant: &str) -> String {
    let raw = format!(
        "{}|{}|{}",
        canonical_timestamp(timestamp),
        canonical_amount(amount),
        merchant.trim()
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_key_is_stable() {
        let t = ts("2026-02-24T10:00:00Z");
        let a = Decimal::from_str("42.50").unwrap();
        let k1 = dedup_key(&t, &a, "WALMART.COM");
        let k2 = dedup_key(&t, &a, "WALMART.COM");
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 64);
    }

    #[test]
    fn test_key_ignores_amount_scale() {
        let t = ts("2026-02-24T10:00:00Z");
        let short = Decimal::from_str("42.5").unwrap();
        let long = Decimal::from_str("42.50").unwrap();
        assert_eq!(
            dedup_key(&t, &short, "WALMART.COM"),
            dedup_key(&t, &long, "WALMART.COM")
        );
    }

    #[test]
    fn test_key_ignores_merchant_padding() {
        let t = ts("2026-02-24T10:00:00Z");
        let a = Decimal::from_str("42.50").unwrap();
        assert_eq!(
            dedup_key(&t, &a, "WALMART.COM"),
            dedup_key(&t, &a, "  WALMART.COM  ")
        );
    }

    #[test]
    fn test_key_varies_with_inputs() {
        let t = ts("2026-02-24T10:00:00Z");
        let a = Decimal::from_str("42.50").unwrap();
        let base = dedup_key(&t, &a, "WALMART.COM");
        assert_ne!(base, dedup_key(&ts("2026-02-24T10:00:01Z"), &a, "WALMART.COM"));
        assert_ne!(base, dedup_key(&t, &Decimal::from_str("42.51").unwrap(), "WALMART.COM"));
        assert_ne!(base, dedup_key(&t, &a, "TARGET.COM"));
    }

    #[test]
    fn test_key_normalizes_timezone() {
        let utc = ts("2026-02-24T10:00:00Z");
        let offset = ts("2026-02-24T12:00:00+02:00");
        let a = Decimal::from_str("42.50").unwrap();
        assert_eq!(dedup_key(&utc, &a, "WALMART.COM"), dedup_key(&offset, &a, "WALMART.COM"));
    }
}
