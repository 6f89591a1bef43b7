use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::AppError;

pub fn append_audit(
  conn: &Connection,
  actor: Option<String>,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload_json: String,
  details: Option<String>,
) -> Result<(), AppError> {
  let ts = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO audit_log (ts, actor, action, entity_type, entity_id, payload_json, details) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![ts, actor, action, entity_type, entity_id, payload_json, details],
  )?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn appends_rows_with_timestamp() {
    let db = db::open_test_db();
    let conn = db.conn.lock().unwrap();
    append_audit(
      &conn,
      Some("FELIPE".to_string()),
      "CREATE_TRIP",
      "TRIP",
      Some("abc".to_string()),
      "{}".to_string(),
      None,
    )
    .unwrap();

    let (actor, action): (Option<String>, String) = conn
      .query_row("SELECT actor, action FROM audit_log", [], |row| {
        Ok((row.get(0)?, row.get(1)?))
      })
      .unwrap();
    assert_eq!(actor.as_deref(), Some("FELIPE"));
    assert_eq!(action, "CREATE_TRIP");
  }
}
