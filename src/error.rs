use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
  Validation,
  Unauthorized,
  NotFound,
  Conflict,
  Storage,
}

#[derive(Debug, Serialize)]
pub struct AppError {
  pub kind: ErrorKind,
  pub code: String,
  pub message: String,
}

impl AppError {
  pub fn new(kind: ErrorKind, code: &str, message: impl Into<String>) -> Self {
    Self {
      kind,
      code: code.to_string(),
      message: message.into(),
    }
  }

  pub fn validation(code: &str, message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Validation, code, message)
  }

  pub fn unauthorized(code: &str, message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Unauthorized, code, message)
  }

  pub fn not_found(code: &str, message: impl Into<String>) -> Self {
    Self::new(ErrorKind::NotFound, code, message)
  }

  pub fn conflict(code: &str, message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Conflict, code, message)
  }

  pub fn storage(code: &str, message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Storage, code, message)
  }

  /// Storage failures are the only class a caller may sensibly retry.
  pub fn is_retryable(&self) -> bool {
    self.kind == ErrorKind::Storage
  }

  pub fn http_status(&self) -> u16 {
    match self.kind {
      ErrorKind::Validation => 400,
      ErrorKind::Unauthorized => 401,
      ErrorKind::NotFound => 404,
      ErrorKind::Conflict => 409,
      ErrorKind::Storage => 500,
    }
  }
}

impl std::fmt::Display for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

impl std::error::Error for AppError {}

impl From<rusqlite::Error> for AppError {
  fn from(err: rusqlite::Error) -> Self {
    match err {
      rusqlite::Error::QueryReturnedNoRows => {
        AppError::not_found("NOT_FOUND", "Registro nao encontrado")
      }
      other => AppError::storage("DB_ERROR", other.to_string()),
    }
  }
}

impl From<std::io::Error> for AppError {
  fn from(err: std::io::Error) -> Self {
    AppError::storage("IO_ERROR", err.to_string())
  }
}

impl From<bcrypt::BcryptError> for AppError {
  fn from(err: bcrypt::BcryptError) -> Self {
    AppError::storage("HASH_ERROR", err.to_string())
  }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
  fn from(_: std::sync::PoisonError<T>) -> Self {
    AppError::storage("LOCK_ERROR", "Database lock failed")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_row_maps_to_not_found() {
    let err = AppError::from(rusqlite::Error::QueryReturnedNoRows);
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.http_status(), 404);
    assert!(!err.is_retryable());
  }

  #[test]
  fn storage_errors_are_retryable() {
    let err = AppError::storage("DB_ERROR", "disk full");
    assert!(err.is_retryable());
    assert_eq!(err.http_status(), 500);
  }
}
