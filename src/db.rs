use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::auth;
use crate::error::AppError;
use crate::settings;

pub struct Db {
  pub conn: Mutex<Connection>,
  pub db_path: PathBuf,
}

pub fn resolve_app_dir() -> Result<PathBuf, AppError> {
  if let Ok(dir) = std::env::var("CENTRALTRUCK_DATA_DIR") {
    if !dir.trim().is_empty() {
      return Ok(PathBuf::from(dir));
    }
  }

  let base = dirs_next::data_local_dir()
    .ok_or_else(|| AppError::storage("PATH", "AppData directory not found"))?;
  Ok(base.join("CentralTruckBackoffice"))
}

pub fn init_db(app_dir: &Path) -> Result<Db, AppError> {
  fs::create_dir_all(app_dir)?;
  let db_path = app_dir.join("backoffice.sqlite");
  let mut conn = Connection::open(&db_path)?;
  conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
  conn.busy_timeout(Duration::from_secs(5))?;

  run_migrations(&mut conn)?;
  settings::ensure_defaults(&conn)?;
  seed_bootstrap_users(&conn)?;

  Ok(Db {
    conn: Mutex::new(conn),
    db_path,
  })
}

pub fn with_conn<T>(db: &Db, f: impl FnOnce(&mut Connection) -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  f(&mut guard)
}

pub fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
  )?;

  apply_migration(conn, "001_init", include_str!("../migrations/001_init.sql"))?;
  Ok(())
}

fn apply_migration(conn: &mut Connection, version: &str, sql: &str) -> Result<(), AppError> {
  let exists: i64 = conn.query_row(
    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
    params![version],
    |row| row.get(0),
  )?;
  if exists > 0 {
    return Ok(());
  }

  conn.execute_batch(sql)?;
  conn.execute(
    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
    params![version, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

// A fresh database gets one admin so the first login is possible. The password
// must be changed through the API afterwards.
fn seed_bootstrap_users(conn: &Connection) -> Result<(), AppError> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
  if count > 0 {
    return Ok(());
  }

  let password = std::env::var("CENTRALTRUCK_BOOTSTRAP_PASSWORD").unwrap_or_else(|_| "mudar123".to_string());
  let hash = auth::hash_password(&password)?;
  conn.execute(
    "INSERT INTO admins (id, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![generate_id(20), "FELIPE", hash, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

pub fn generate_id(length: usize) -> String {
  use rand::{distributions::Alphanumeric, Rng};
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(length)
    .map(char::from)
    .collect()
}

#[cfg(test)]
pub fn open_test_db() -> Db {
  let mut conn = Connection::open_in_memory().expect("in-memory db");
  conn
    .execute_batch("PRAGMA foreign_keys = ON;")
    .expect("pragma");
  run_migrations(&mut conn).expect("migrations");
  settings::ensure_defaults(&conn).expect("settings");
  Db {
    conn: Mutex::new(conn),
    db_path: PathBuf::from(":memory:"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn migrations_are_idempotent() {
    let db = open_test_db();
    let mut guard = db.conn.lock().unwrap();
    run_migrations(&mut guard).unwrap();
    let applied: i64 = guard
      .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
      .unwrap();
    assert_eq!(applied, 1);
  }

  #[test]
  fn generated_ids_are_opaque_and_unique() {
    let a = generate_id(20);
    let b = generate_id(20);
    assert_eq!(a.len(), 20);
    assert_ne!(a, b);
  }
}
