use crate::analytics;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::fmt;
use crate::settings::db_path;
use crate::store;

fn card_filter(cards: &[String]) -> Option<Vec<String>> {
    if cards.is_empty() {
        None
    } else {
        Some(cards.to_vec())
    }
}

/// Latest report: fetch unreported, render, then mark. Marking happens
/// after rendering succeeds so a formatting failure cannot lose
/// transactions; `--no-mark` leaves them eligible for the next run.
pub fn latest(no_mark: bool, cards: &[String]) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let groups = analytics::unreported(&conn, card_filter(cards))?;
    let text = fmt::render_card_report(&groups, "Latest Report");
    println!("{text}");
    if !no_mark {
        let keys = analytics::dedup_keys(&groups);
        store::mark_reported(&conn, &keys)?;
    }
    Ok(())
}

pub fn daily(year: i32, month: u32, day: u32, cards: &[String]) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let groups = analytics::daily(&conn, year, month, day, card_filter(cards))?;
    let title = format!("Daily Report - {year}/{month:02}/{day:02}");
    println!("{}", fmt::render_card_report(&groups, &title));
    Ok(())
}

pub fn monthly(year: i32, month: u32, top: usize) -> Result<()> {
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    let summary = analytics::monthly(&conn, year, month, top)?;
    println!("{}", fmt::render_monthly_report(&summary));
    Ok(())
}
