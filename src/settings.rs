use chrono::Datelike;
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::Settings;

const KEY_COMPANY: &str = "company_name";
const KEY_YEAR: &str = "current_year";
const KEY_PAGE_SIZE: &str = "page_size";

pub const DEFAULT_PAGE_SIZE: i64 = 20;

pub fn ensure_defaults(conn: &Connection) -> Result<(), AppError> {
  let year = chrono::Utc::now().year();
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_COMPANY, "Central Truck"],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_YEAR, year.to_string()],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_PAGE_SIZE, DEFAULT_PAGE_SIZE.to_string()],
  )?;
  Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<Settings, AppError> {
  let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

  let mut company_name = "Central Truck".to_string();
  let mut current_year = chrono::Utc::now().year();
  let mut page_size = DEFAULT_PAGE_SIZE;

  for row in rows {
    let (key, value) = row?;
    match key.as_str() {
      KEY_COMPANY => {
        company_name = value;
      }
      KEY_YEAR => {
        current_year = value.parse().unwrap_or(current_year);
      }
      KEY_PAGE_SIZE => {
        page_size = value.parse().unwrap_or(page_size);
      }
      _ => {}
    }
  }

  Ok(Settings {
    company_name,
    current_year,
    page_size,
  })
}

pub fn update_settings(conn: &Connection, settings: &Settings) -> Result<(), AppError> {
  if settings.page_size < 1 {
    return Err(AppError::validation("INVALID_PAGE_SIZE", "Tamanho de pagina deve ser >= 1"));
  }
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_COMPANY, settings.company_name.clone()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_YEAR, settings.current_year.to_string()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_PAGE_SIZE, settings.page_size.to_string()],
  )?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn defaults_then_roundtrip() {
    let db = db::open_test_db();
    let conn = db.conn.lock().unwrap();
    let settings = get_settings(&conn).unwrap();
    assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(settings.company_name, "Central Truck");

    let updated = Settings {
      company_name: "Oficina Central".to_string(),
      current_year: 2024,
      page_size: 50,
    };
    update_settings(&conn, &updated).unwrap();
    let settings = get_settings(&conn).unwrap();
    assert_eq!(settings.company_name, "Oficina Central");
    assert_eq!(settings.current_year, 2024);
    assert_eq!(settings.page_size, 50);
  }

  #[test]
  fn rejects_non_positive_page_size() {
    let db = db::open_test_db();
    let conn = db.conn.lock().unwrap();
    let bad = Settings {
      company_name: "X".to_string(),
      current_year: 2024,
      page_size: 0,
    };
    assert!(update_settings(&conn, &bad).is_err());
  }
}
