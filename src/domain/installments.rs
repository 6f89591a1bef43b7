use chrono::{Months, NaiveDate};

use crate::error::AppError;
use crate::models::{FixedExpense, WorkshopExpense};

/// One matured installment of an installment-bearing expense.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentDue {
  pub due_date: NaiveDate,
  pub amount: f64,
  pub vehicle_id: String,
}

pub trait InstallmentBearing {
  fn vehicle_id(&self) -> &str;
  fn total_amount(&self) -> f64;
  fn installments(&self) -> i64;
  fn first_payment_date(&self) -> &str;
}

impl InstallmentBearing for FixedExpense {
  fn vehicle_id(&self) -> &str {
    &self.vehicle_id
  }
  fn total_amount(&self) -> f64 {
    self.total_amount
  }
  fn installments(&self) -> i64 {
    self.installments
  }
  fn first_payment_date(&self) -> &str {
    &self.first_payment_date
  }
}

impl InstallmentBearing for WorkshopExpense {
  fn vehicle_id(&self) -> &str {
    &self.vehicle_id
  }
  fn total_amount(&self) -> f64 {
    self.total_amount
  }
  fn installments(&self) -> i64 {
    self.installments
  }
  fn first_payment_date(&self) -> &str {
    &self.first_payment_date
  }
}

pub fn installment_amount(total_amount: f64, installments: i64) -> Result<f64, AppError> {
  if installments <= 0 {
    return Err(AppError::validation("INVALID_INSTALLMENTS", "Numero de parcelas deve ser >= 1"));
  }
  if !total_amount.is_finite() || total_amount < 0.0 {
    return Err(AppError::validation("INVALID_AMOUNT", "Valor total invalido"));
  }
  Ok(total_amount / installments as f64)
}

/// Due date of installment `index` (0-based). Stepping by calendar months
/// clamps the day to the last day of shorter months (Jan 31 -> Feb 28/29).
pub fn installment_date(first_payment: NaiveDate, index: u32) -> Option<NaiveDate> {
  first_payment.checked_add_months(Months::new(index))
}

/// Expands the synthetic payment schedule of one expense and keeps only the
/// installments due inside `[window_start, window_end]`, both ends inclusive.
/// The result is in schedule order, so dates are non-decreasing.
pub fn expand<E: InstallmentBearing>(
  expense: &E,
  window_start: NaiveDate,
  window_end: NaiveDate,
) -> Result<Vec<InstallmentDue>, AppError> {
  let amount = installment_amount(expense.total_amount(), expense.installments())?;
  let first = crate::domain::validation::parse_date(expense.first_payment_date())?;

  let mut dues = Vec::new();
  for index in 0..expense.installments() {
    let due_date = match installment_date(first, index as u32) {
      Some(date) => date,
      None => break,
    };
    if due_date > window_end {
      break;
    }
    if due_date >= window_start {
      dues.push(InstallmentDue {
        due_date,
        amount,
        vehicle_id: expense.vehicle_id().to_string(),
      });
    }
  }
  Ok(dues)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fixed(total: f64, installments: i64, first_payment: &str) -> FixedExpense {
    FixedExpense {
      id: "fe1".to_string(),
      vehicle_id: "v1".to_string(),
      description: "Pneus".to_string(),
      category: "Pneus".to_string(),
      total_amount: total,
      installments,
      first_payment_date: first_payment.to_string(),
      payments: Vec::new(),
      created_at: "2024-01-01T00:00:00Z".to_string(),
    }
  }

  fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn splits_total_evenly() {
    let expense = fixed(1200.0, 4, "2024-01-10");
    let dues = expand(&expense, date("2024-01-01"), date("2024-12-31")).unwrap();
    assert_eq!(dues.len(), 4);
    for due in &dues {
      assert!((due.amount - 300.0).abs() < 1e-9);
    }
    let sum: f64 = dues.iter().take(3).map(|d| d.amount).sum();
    assert!((sum - 3.0 * (1200.0 / 4.0)).abs() < 1e-9);
  }

  #[test]
  fn dates_advance_by_calendar_month() {
    let expense = fixed(300.0, 3, "2024-01-15");
    let dues = expand(&expense, date("2024-01-01"), date("2024-12-31")).unwrap();
    let dates: Vec<_> = dues.iter().map(|d| d.due_date).collect();
    assert_eq!(dates, vec![date("2024-01-15"), date("2024-02-15"), date("2024-03-15")]);
  }

  #[test]
  fn day_of_month_clamps_in_short_months() {
    let expense = fixed(400.0, 4, "2024-01-31");
    let dues = expand(&expense, date("2024-01-01"), date("2024-12-31")).unwrap();
    let dates: Vec<_> = dues.iter().map(|d| d.due_date).collect();
    assert_eq!(
      dates,
      vec![date("2024-01-31"), date("2024-02-29"), date("2024-03-31"), date("2024-04-30")]
    );
  }

  #[test]
  fn window_is_inclusive_and_dates_monotonic() {
    let expense = fixed(600.0, 6, "2024-01-10");
    let dues = expand(&expense, date("2024-02-10"), date("2024-04-10")).unwrap();
    let dates: Vec<_> = dues.iter().map(|d| d.due_date).collect();
    assert_eq!(dates, vec![date("2024-02-10"), date("2024-03-10"), date("2024-04-10")]);
    assert!(dates.windows(2).all(|pair| pair[0] <= pair[1]));
  }

  #[test]
  fn first_payment_after_window_yields_empty() {
    let expense = fixed(600.0, 6, "2025-01-10");
    let dues = expand(&expense, date("2024-01-01"), date("2024-12-31")).unwrap();
    assert!(dues.is_empty());
  }

  #[test]
  fn rejects_non_positive_installment_count() {
    let expense = fixed(600.0, 0, "2024-01-10");
    assert!(expand(&expense, date("2024-01-01"), date("2024-12-31")).is_err());
    assert!(installment_amount(100.0, -3).is_err());
  }
}
