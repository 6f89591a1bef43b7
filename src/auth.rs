use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::domain::validation::ensure_password_length;
use crate::error::AppError;
use crate::models::{ChangePasswordRequest, LoginRequest, SessionUser};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DRIVER: &str = "driver";
pub const ROLE_FINANCE: &str = "finance";

pub fn hash_password(password: &str) -> Result<String, AppError> {
  Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
  Ok(bcrypt::verify(password, hash)?)
}

/// In-memory session registry. Tokens are opaque and die with the process.
pub struct SessionStore {
  sessions: Mutex<HashMap<String, SessionUser>>,
}

impl SessionStore {
  pub fn new() -> Self {
    Self {
      sessions: Mutex::new(HashMap::new()),
    }
  }

  pub fn issue(&self, user: SessionUser) -> Result<String, AppError> {
    let token = db::generate_id(48);
    self.sessions.lock()?.insert(token.clone(), user);
    Ok(token)
  }

  pub fn get(&self, token: &str) -> Result<Option<SessionUser>, AppError> {
    Ok(self.sessions.lock()?.get(token).cloned())
  }

  pub fn revoke(&self, token: &str) -> Result<(), AppError> {
    self.sessions.lock()?.remove(token);
    Ok(())
  }
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::new()
  }
}

fn invalid_credentials() -> AppError {
  AppError::unauthorized("INVALID_CREDENTIALS", "Usuario ou senha invalidos")
}

/// Checks the three account tables in order: admins, drivers, finance users.
/// Usernames are matched case-insensitively by uppercasing both sides.
pub fn login(conn: &Connection, req: &LoginRequest) -> Result<SessionUser, AppError> {
  let username = req.username.trim().to_uppercase();
  if username.is_empty() || req.password.is_empty() {
    return Err(invalid_credentials());
  }

  let admin: Option<(String, String, Option<String>)> = conn
    .query_row(
      "SELECT id, name, password_hash FROM admins WHERE UPPER(name) = ?1",
      params![username],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;
  if let Some((id, name, hash)) = admin {
    return check_account(&req.password, hash, SessionUser {
      user_id: id,
      name,
      role: ROLE_ADMIN.to_string(),
      driver_id: None,
    });
  }

  let driver: Option<(String, String, Option<String>)> = conn
    .query_row(
      "SELECT id, name, password_hash FROM drivers WHERE UPPER(name) = ?1 AND status = 'ACTIVE'",
      params![username],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;
  if let Some((id, name, hash)) = driver {
    let driver_id = id.clone();
    return check_account(&req.password, hash, SessionUser {
      user_id: id,
      name,
      role: ROLE_DRIVER.to_string(),
      driver_id: Some(driver_id),
    });
  }

  let usuario: Option<(i64, String, String)> = conn
    .query_row(
      "SELECT id, nome, senha_hash FROM usuarios_sistema WHERE UPPER(nome) = ?1",
      params![username],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;
  if let Some((id, nome, hash)) = usuario {
    return check_account(&req.password, Some(hash), SessionUser {
      user_id: id.to_string(),
      name: nome,
      role: ROLE_FINANCE.to_string(),
      driver_id: None,
    });
  }

  Err(invalid_credentials())
}

fn check_account(
  password: &str,
  hash: Option<String>,
  user: SessionUser,
) -> Result<SessionUser, AppError> {
  let hash = hash.ok_or_else(invalid_credentials)?;
  if verify_password(password, &hash)? {
    Ok(user)
  } else {
    Err(invalid_credentials())
  }
}

/// Rehashes and stores a new password. Self-service changes must present the
/// current password; an admin actor may reset without it.
pub fn change_password(
  conn: &Connection,
  actor: &SessionUser,
  req: &ChangePasswordRequest,
) -> Result<(), AppError> {
  ensure_password_length(&req.new_password)?;

  let (table, hash_column, where_column) = match req.user_type.as_str() {
    "admin" => ("admins", "password_hash", "id"),
    "driver" => ("drivers", "password_hash", "id"),
    "usuario" => ("usuarios_sistema", "senha_hash", "id"),
    other => {
      return Err(AppError::validation(
        "INVALID_USER_TYPE",
        format!("Tipo de usuario desconhecido: {other}"),
      ))
    }
  };

  let is_self = actor.user_id == req.user_id;
  if actor.role != ROLE_ADMIN && !is_self {
    return Err(AppError::unauthorized("FORBIDDEN", "Sem permissao para alterar esta senha"));
  }
  if actor.role != ROLE_ADMIN || is_self {
    let old = req
      .old_password
      .as_deref()
      .ok_or_else(|| AppError::validation("OLD_PASSWORD_REQUIRED", "Senha atual obrigatoria"))?;
    // usuarios_sistema has an integer key, the fleet tables use text ids.
    let sql = format!("SELECT {hash_column} FROM {table} WHERE CAST({where_column} AS TEXT) = ?1");
    let current: Option<String> = conn
      .query_row(&sql, params![req.user_id], |row| row.get(0))
      .optional()?
      .flatten();
    let current = current.ok_or_else(invalid_credentials)?;
    if !verify_password(old, &current)? {
      return Err(invalid_credentials());
    }
  }

  let hash = hash_password(&req.new_password)?;
  let sql = format!("UPDATE {table} SET {hash_column} = ?1 WHERE CAST({where_column} AS TEXT) = ?2");
  let updated = conn.execute(&sql, params![hash, req.user_id])?;
  if updated == 0 {
    return Err(AppError::not_found("USER_NOT_FOUND", "Usuario nao encontrado"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::open_test_db;

  fn insert_admin(conn: &Connection, name: &str, password: &str) -> String {
    let id = db::generate_id(20);
    let hash = hash_password(password).unwrap();
    conn
      .execute(
        "INSERT INTO admins (id, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, hash, "2024-01-01T00:00:00Z"],
      )
      .unwrap();
    id
  }

  #[test]
  fn stored_hash_is_not_the_password_and_verifies() {
    let hash = hash_password("segredo1").unwrap();
    assert_ne!(hash, "segredo1");
    assert!(hash.starts_with("$2"));
    assert!(verify_password("segredo1", &hash).unwrap());
    assert!(!verify_password("segredo2", &hash).unwrap());
  }

  #[test]
  fn login_is_case_insensitive_on_username() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    insert_admin(&conn, "FELIPE", "segredo1");

    let user = login(
      &conn,
      &LoginRequest {
        username: "felipe".to_string(),
        password: "segredo1".to_string(),
      },
    )
    .unwrap();
    assert_eq!(user.role, ROLE_ADMIN);
    assert_eq!(user.name, "FELIPE");
  }

  #[test]
  fn wrong_password_is_unauthorized() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    insert_admin(&conn, "FELIPE", "segredo1");

    let err = login(
      &conn,
      &LoginRequest {
        username: "FELIPE".to_string(),
        password: "errada".to_string(),
      },
    )
    .unwrap_err();
    assert_eq!(err.http_status(), 401);
  }

  #[test]
  fn unknown_user_gets_the_same_error_as_wrong_password() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    insert_admin(&conn, "FELIPE", "segredo1");

    let unknown = login(
      &conn,
      &LoginRequest {
        username: "NINGUEM".to_string(),
        password: "segredo1".to_string(),
      },
    )
    .unwrap_err();
    assert_eq!(unknown.code, "INVALID_CREDENTIALS");
  }

  #[test]
  fn change_password_requires_current_password_for_self() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    let id = insert_admin(&conn, "FELIPE", "segredo1");
    let actor = SessionUser {
      user_id: id.clone(),
      name: "FELIPE".to_string(),
      role: ROLE_ADMIN.to_string(),
      driver_id: None,
    };

    let missing_old = change_password(
      &conn,
      &actor,
      &ChangePasswordRequest {
        user_id: id.clone(),
        user_type: "admin".to_string(),
        new_password: "novasenha".to_string(),
        old_password: None,
      },
    );
    assert!(missing_old.is_err());

    change_password(
      &conn,
      &actor,
      &ChangePasswordRequest {
        user_id: id.clone(),
        user_type: "admin".to_string(),
        new_password: "novasenha".to_string(),
        old_password: Some("segredo1".to_string()),
      },
    )
    .unwrap();

    let user = login(
      &conn,
      &LoginRequest {
        username: "FELIPE".to_string(),
        password: "novasenha".to_string(),
      },
    )
    .unwrap();
    assert_eq!(user.name, "FELIPE");
  }

  #[test]
  fn admin_resets_other_accounts_without_old_password() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    let admin_id = insert_admin(&conn, "FELIPE", "segredo1");
    let other_id = insert_admin(&conn, "MARCOS", "antiga1");
    let actor = SessionUser {
      user_id: admin_id,
      name: "FELIPE".to_string(),
      role: ROLE_ADMIN.to_string(),
      driver_id: None,
    };

    change_password(
      &conn,
      &actor,
      &ChangePasswordRequest {
        user_id: other_id,
        user_type: "admin".to_string(),
        new_password: "trocada1".to_string(),
        old_password: None,
      },
    )
    .unwrap();

    assert!(login(
      &conn,
      &LoginRequest {
        username: "MARCOS".to_string(),
        password: "trocada1".to_string(),
      },
    )
    .is_ok());
  }

  #[test]
  fn sessions_issue_and_revoke() {
    let store = SessionStore::new();
    let token = store
      .issue(SessionUser {
        user_id: "u1".to_string(),
        name: "FELIPE".to_string(),
        role: ROLE_ADMIN.to_string(),
        driver_id: None,
      })
      .unwrap();
    assert!(store.get(&token).unwrap().is_some());
    store.revoke(&token).unwrap();
    assert!(store.get(&token).unwrap().is_none());
  }
}
