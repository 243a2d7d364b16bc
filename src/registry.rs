use rusqlite::{Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::models::{Card, Category};

/// The implicit category that logically contains every card. It has no
/// stored row; the name is reserved and recognized by the aggregation
/// engine as "no category filter".
pub const ALL_CATEGORY: &str = "All";

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Idempotent auto-registration, called by the ingestion pipeline for every
/// distinct card id it sees.
pub fn ensure_card(conn: &Connection, card: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO cards (card) VALUES (?1) ON CONFLICT (card) DO NOTHING",
        [card],
    )?;
    Ok(())
}

pub fn get_card(conn: &Connection, card: &str) -> Result<Option<Card>> {
    Ok(conn
        .query_row(
            "SELECT card, nickname, first_seen_at FROM cards WHERE card = ?1",
            [card],
            |row| {
                Ok(Card {
                    card: row.get(0)?,
                    nickname: row.get(1)?,
                    first_seen_at: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn list_cards(conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt =
        conn.prepare("SELECT card, nickname, first_seen_at FROM cards ORDER BY card")?;
    let rows = stmt.query_map([], |row| {
        Ok(Card {
            card: row.get(0)?,
            nickname: row.get(1)?,
            first_seen_at: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn set_nickname(conn: &Connection, card: &str, nickname: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE cards SET nickname = ?2 WHERE card = ?1",
        rusqlite::params![card, nickname],
    )?;
    if changed == 0 {
        return Err(LedgerError::UnknownCard(card.to_string()));
    }
    Ok(())
}

/// Removes a card and its memberships. Historical transactions keep the raw
/// card id; they are never cascade-deleted.
pub fn remove_card(conn: &Connection, card: &str) -> Result<()> {
    conn.execute("DELETE FROM card_categories WHERE card = ?1", [card])?;
    let changed = conn.execute("DELETE FROM cards WHERE card = ?1", [card])?;
    if changed == 0 {
        return Err(LedgerError::UnknownCard(card.to_string()));
    }
    Ok(())
}

/// "nickname (card)" if the card is registered with a nickname, else the
/// raw id. Safe to call for dangling ids left behind by `remove_card`.
pub fn card_display(conn: &Connection, card: &str) -> Result<String> {
    match get_card(conn, card)? {
        Some(c) => Ok(c.display_name()),
        None => Ok(card.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn create_category(conn: &Connection, name: &str) -> Result<i64> {
    if name.trim().eq_ignore_ascii_case(ALL_CATEGORY) {
        return Err(LedgerError::ReservedCategory(name.trim().to_string()));
    }
    let result = conn.execute("INSERT INTO categories (name) VALUES (?1)", [name.trim()]);
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(LedgerError::DuplicateName(name.trim().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn delete_category(conn: &Connection, name: &str) -> Result<()> {
    let id = category_id_by_name(conn, name)?;
    conn.execute("DELETE FROM card_categories WHERE category_id = ?1", [id])?;
    conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    Ok(())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn category_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| LedgerError::UnknownCategory(name.to_string()))
}

// ---------------------------------------------------------------------------
// Memberships
// ---------------------------------------------------------------------------

pub fn add_membership(conn: &Connection, card: &str, category_id: i64) -> Result<()> {
    if get_card(conn, card)?.is_none() {
        return Err(LedgerError::UnknownCard(card.to_string()));
    }
    conn.execute(
        "INSERT INTO card_categories (card, category_id) VALUES (?1, ?2) \
         ON CONFLICT (card, category_id) DO NOTHING",
        rusqlite::params![card, category_id],
    )?;
    Ok(())
}

pub fn remove_membership(conn: &Connection, card: &str, category_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM card_categories WHERE card = ?1 AND category_id = ?2",
        rusqlite::params![card, category_id],
    )?;
    Ok(())
}

/// Explicit category names for a card, sorted. The implicit "All" is not
/// included; callers that need it prepend `ALL_CATEGORY`.
pub fn categories_for_card(conn: &Connection, card: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.name FROM card_categories cc \
         JOIN categories c ON cc.category_id = c.id \
         WHERE cc.card = ?1 ORDER BY c.name",
    )?;
    let rows = stmt.query_map([card], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn cards_in_category(conn: &Connection, category_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT card FROM card_categories WHERE category_id = ?1 ORDER BY card",
    )?;
    let rows = stmt.query_map([category_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
