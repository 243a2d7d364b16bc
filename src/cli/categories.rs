use comfy_table::Table;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::registry;
use crate::settings::db_path;

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let categories = registry::list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Cards", "Created"]);
    for cat in categories {
        let cards = registry::cards_in_category(&conn, cat.id)?;
        table.add_row(vec![cat.name.clone(), cards.join(", "), cat.created_at.clone()]);
    }
    println!("Categories (every card is always in \"All\")\n{table}");
    Ok(())
}

pub fn create(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    registry::create_category(&conn, name)?;
    println!("Created category: {name}");
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    registry::delete_category(&conn, name)?;
    println!("Deleted category: {name}");
    Ok(())
}

pub fn assign(card: &str, category: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let category_id = registry::category_id_by_name(&conn, category)?;
    registry::add_membership(&conn, card, category_id)?;
    println!("Added {card} to {category}");
    Ok(())
}

pub fn unassign(card: &str, category: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let category_id = registry::category_id_by_name(&conn, category)?;
    registry::remove_membership(&conn, card, category_id)?;
    println!("Removed {card} from {category}");
    Ok(())
}
