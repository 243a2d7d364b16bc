use comfy_table::Table;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::registry;
use crate::settings::db_path;

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let cards = registry::list_cards(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Card", "Nickname", "Categories", "First Seen"]);
    for card in cards {
        let categories = registry::categories_for_card(&conn, &card.card)?;
        table.add_row(vec![
            card.card.clone(),
            card.nickname.clone().unwrap_or_default(),
            categories.join(", "),
            card.first_seen_at.clone(),
        ]);
    }
    println!("Cards\n{table}");
    Ok(())
}

pub fn nickname(card: &str, name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    registry::set_nickname(&conn, card, name)?;
    println!("Set nickname for {card}: {name}");
    Ok(())
}

pub fn remove(card: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    registry::remove_card(&conn, card)?;
    println!("Removed card {card} (historical transactions are kept)");
    Ok(())
}
