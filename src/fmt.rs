use rust_decimal::Decimal;

use crate::analytics::{CardGroup, MonthlySummary};

/// Format a decimal as a dollar amount with thousands separators: $1,234.56
pub fn money(val: &Decimal) -> String {
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

fn title_case(status: &str) -> String {
    let lower = status.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

/// Plain-text rendering of a per-card transaction listing, used by the
/// latest and daily reports. The text goes to the notification sink
/// verbatim, so no terminal styling here.
pub fn render_card_report(groups: &[CardGroup], title: &str) -> String {
    let count: usize = groups.iter().map(|g| g.transactions.len()).sum();
    if count == 0 {
        return "No new transactions to report.".to_string();
    }

    let mut lines = vec![title.to_string(), "=".repeat(title.len())];
    lines.push(format!("{count} transaction(s)"));
    lines.push(String::new());

    for group in groups {
        let cats = if group.categories.is_empty() {
            String::new()
        } else {
            format!(" [{}]", group.categories.join(", "))
        };
        lines.push(format!("{}{cats}:", group.display_name));
        for txn in &group.transactions {
            lines.push(format!(
                "  {:<30} {:>10}  ({})",
                txn.merchant,
                money(&txn.amount),
                title_case(txn.status.as_str())
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string()
}

pub fn render_monthly_report(summary: &MonthlySummary) -> String {
    let title = format!("Monthly Summary - {}/{:02}", summary.year, summary.month);
    let mut lines = vec![title.clone(), "=".repeat(title.len())];
    lines.push(format!("Grand Total: {}", money(&summary.grand_total)));
    lines.push(String::new());

    for cat in &summary.categories {
        lines.push(format!("{} ({}):", cat.name, money(&cat.subtotal)));
        for card in &cat.cards {
            let other: Vec<&str> = card
                .categories
                .iter()
                .filter(|name| *name != &cat.name)
                .map(String::as_str)
                .collect();
            let also_in = if other.is_empty() {
                String::new()
            } else {
                format!("  (also in: {})", other.join(", "))
            };
            lines.push(format!(
                "  {}: {} ({} txns){also_in}",
                card.display_name,
                money(&card.total),
                card.txn_count
            ));
            if !card.top_merchants.is_empty() {
                lines.push("    Top:".to_string());
                for m in &card.top_merchants {
                    lines.push(format!("      - {}: {}", m.merchant, money(&m.total)));
                }
            }
        }
        lines.push(String::new());
    }

    if !summary.top_merchants.is_empty() {
        lines.push("Top Merchants (All):".to_string());
        for m in &summary.top_merchants {
            lines.push(format!("  {}: {}", m.merchant, money(&m.total)));
        }
    }

    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(&dec("1234.56")), "$1,234.56");
        assert_eq!(money(&dec("-500")), "-$500.00");
        assert_eq!(money(&dec("0")), "$0.00");
        assert_eq!(money(&dec("1000000.99")), "$1,000,000.99");
        assert_eq!(money(&dec("42.5")), "$42.50");
    }

    #[test]
    fn test_render_empty_report() {
        assert_eq!(
            render_card_report(&[], "Latest Report"),
            "No new transactions to report."
        );
    }

    #[test]
    fn test_render_card_report_groups_and_annotates() {
        use crate::models::{Transaction, TxnStatus};
        let groups = vec![CardGroup {
            card: "7867".to_string(),
            display_name: "Ops (7867)".to_string(),
            categories: vec!["Business".to_string()],
            transactions: vec![Transaction {
                dedup_key: "k".to_string(),
                timestamp: chrono::Utc::now(),
                merchant: "WALMART.COM".to_string(),
                amount: dec("42.50"),
                card: "7867".to_string(),
                status: TxnStatus::Pending,
                reported: false,
                first_seen_at: String::new(),
                last_updated_at: String::new(),
            }],
        }];
        let text = render_card_report(&groups, "Latest Report");
        assert!(text.starts_with("Latest Report\n============="));
        assert!(text.contains("1 transaction(s)"));
        assert!(text.contains("Ops (7867) [Business]:"));
        assert!(text.contains("WALMART.COM"));
        assert!(text.contains("$42.50"));
        assert!(text.contains("(Pending)"));
    }
}
