use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::db_path;
use crate::store;

pub fn run() -> Result<()> {
    let path = db_path();
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    let stats = store::stats(&conn)?;

    println!("{}", "cardledger status".bold());
    println!("Database:     {}", path.display());
    println!("Transactions: {}", stats.txn_count);
    println!("Unreported:   {}", stats.unreported_count);
    println!("Cards:        {}", stats.card_count);
    println!("Categories:   {}", stats.category_count);
    if let (Some(first), Some(last)) = (&stats.first_timestamp, &stats.last_timestamp) {
        println!("Date range:   {first} .. {last}");
    }
    Ok(())
}
