use chrono::NaiveDate;

use crate::error::AppError;

pub fn parse_date(date: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .map_err(|_| AppError::validation("INVALID_DATE", "Data deve ser YYYY-MM-DD"))
}

/// Parses a "YYYY-MM" month selector into (year, month).
pub fn parse_month(value: &str) -> Result<(i32, u32), AppError> {
  let mut parts = value.splitn(2, '-');
  let year = parts
    .next()
    .and_then(|v| v.parse::<i32>().ok())
    .ok_or_else(|| AppError::validation("INVALID_MONTH", "Mes deve ser YYYY-MM"))?;
  let month = parts
    .next()
    .and_then(|v| v.parse::<u32>().ok())
    .filter(|m| (1..=12).contains(m))
    .ok_or_else(|| AppError::validation("INVALID_MONTH", "Mes deve ser YYYY-MM"))?;
  Ok((year, month))
}

pub fn ensure_amount_positive(amount: f64) -> Result<(), AppError> {
  if !(amount > 0.0) || !amount.is_finite() {
    Err(AppError::validation("INVALID_AMOUNT", "Valor deve ser > 0"))
  } else {
    Ok(())
  }
}

pub fn ensure_commission_rate(rate: f64) -> Result<(), AppError> {
  if !(0.0..=100.0).contains(&rate) {
    Err(AppError::validation("INVALID_COMMISSION", "Comissao deve estar entre 0 e 100"))
  } else {
    Ok(())
  }
}

pub fn ensure_password_length(password: &str) -> Result<(), AppError> {
  if password.len() < 6 {
    Err(AppError::validation("INVALID_PASSWORD", "Senha deve ter pelo menos 6 caracteres"))
  } else {
    Ok(())
  }
}

pub fn ensure_not_blank(value: &str, code: &str, message: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    Err(AppError::validation(code, message))
  } else {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_valid_date() {
    assert!(parse_date("2024-02-29").is_ok());
    assert!(parse_date("2024-13-01").is_err());
    assert!(parse_date("01/02/2024").is_err());
  }

  #[test]
  fn parses_month_selectors() {
    assert_eq!(parse_month("2024-01").unwrap(), (2024, 1));
    assert!(parse_month("2024-13").is_err());
    assert!(parse_month("2024").is_err());
  }

  #[test]
  fn rejects_bad_amounts() {
    assert!(ensure_amount_positive(0.0).is_err());
    assert!(ensure_amount_positive(-1.0).is_err());
    assert!(ensure_amount_positive(f64::NAN).is_err());
    assert!(ensure_amount_positive(10.5).is_ok());
  }

  #[test]
  fn enforces_minimum_password_length() {
    assert!(ensure_password_length("12345").is_err());
    assert!(ensure_password_length("123456").is_ok());
  }
}
