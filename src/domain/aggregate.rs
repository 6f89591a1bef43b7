use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::domain::installments;
use crate::domain::trip as trip_math;
use crate::domain::validation::parse_date;
use crate::models::{FixedExpense, Trip, WorkshopExpense};

/// Monthly series for the fleet analysis charts. All four vectors share the
/// same length and index the same months.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FleetSeries {
  pub labels: Vec<String>,
  pub revenue: Vec<f64>,
  pub expenses: Vec<f64>,
  pub profit: Vec<f64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FleetKpis {
  pub gross_revenue: f64,
  pub trip_costs: f64,
  pub fixed_installments: f64,
  pub workshop_installments: f64,
  pub final_profit: f64,
  pub trip_count: i64,
  pub total_km: f64,
}

/// Inclusive list of (year, month) pairs. An inverted range is empty, not an
/// error.
pub fn month_range(start: (i32, u32), end: (i32, u32)) -> Vec<(i32, u32)> {
  let mut months = Vec::new();
  let (mut year, mut month) = start;
  while (year, month) <= end {
    months.push((year, month));
    if month == 12 {
      year += 1;
      month = 1;
    } else {
      month += 1;
    }
  }
  months
}

pub fn month_label(year: i32, month: u32) -> String {
  format!("{:02}/{:02}", month, year.rem_euclid(100))
}

fn month_of(date: &str) -> Option<(i32, u32)> {
  let parsed = parse_date(date).ok()?;
  Some((parsed.year(), parsed.month()))
}

fn month_bounds(months: &[(i32, u32)]) -> Option<(NaiveDate, NaiveDate)> {
  let (first_year, first_month) = *months.first()?;
  let (last_year, last_month) = *months.last()?;
  let start = NaiveDate::from_ymd_opt(first_year, first_month, 1)?;
  let last_start = NaiveDate::from_ymd_opt(last_year, last_month, 1)?;
  let end = last_start
    .checked_add_months(chrono::Months::new(1))?
    .pred_opt()?;
  Some((start, end))
}

/// Buckets trips by start-date month and matured installments by due month
/// over the inclusive `[start_month, end_month]` window. Buckets with no
/// activity stay zero-filled so chart axes line up.
pub fn aggregate(
  trips: &[Trip],
  fixed: &[FixedExpense],
  workshop: &[WorkshopExpense],
  start_month: (i32, u32),
  end_month: (i32, u32),
  vehicle_filter: Option<&str>,
) -> FleetSeries {
  let months = month_range(start_month, end_month);
  let mut series = FleetSeries {
    labels: months.iter().map(|&(y, m)| month_label(y, m)).collect(),
    revenue: vec![0.0; months.len()],
    expenses: vec![0.0; months.len()],
    profit: vec![0.0; months.len()],
  };
  let bounds = match month_bounds(&months) {
    Some(bounds) => bounds,
    None => return series,
  };

  let keeps_vehicle = |vehicle_id: &str| match vehicle_filter {
    Some(wanted) => vehicle_id == wanted,
    None => true,
  };
  let bucket_of = |year: i32, month: u32| months.iter().position(|&b| b == (year, month));

  for trip in trips.iter().filter(|t| keeps_vehicle(&t.vehicle_id)) {
    let Some((year, month)) = month_of(&trip.start_date) else {
      continue;
    };
    let Some(bucket) = bucket_of(year, month) else {
      continue;
    };
    let summary = trip_math::summarize(trip);
    series.revenue[bucket] += summary.gross_freight;
    series.expenses[bucket] +=
      summary.fueling_total + summary.other_expenses + summary.commission;
  }

  for expense in fixed.iter().filter(|e| keeps_vehicle(&e.vehicle_id)) {
    if let Ok(dues) = installments::expand(expense, bounds.0, bounds.1) {
      for due in dues {
        if let Some(bucket) = bucket_of(due.due_date.year(), due.due_date.month()) {
          series.expenses[bucket] += due.amount;
        }
      }
    }
  }
  for expense in workshop.iter().filter(|e| keeps_vehicle(&e.vehicle_id)) {
    if let Ok(dues) = installments::expand(expense, bounds.0, bounds.1) {
      for due in dues {
        if let Some(bucket) = bucket_of(due.due_date.year(), due.due_date.month()) {
          series.expenses[bucket] += due.amount;
        }
      }
    }
  }

  for i in 0..months.len() {
    series.profit[i] = series.revenue[i] - series.expenses[i];
  }
  series
}

/// KPI cards over the same filtered window as [`aggregate`].
pub fn kpis(
  trips: &[Trip],
  fixed: &[FixedExpense],
  workshop: &[WorkshopExpense],
  start_month: (i32, u32),
  end_month: (i32, u32),
  vehicle_filter: Option<&str>,
) -> FleetKpis {
  let months = month_range(start_month, end_month);
  let mut out = FleetKpis {
    gross_revenue: 0.0,
    trip_costs: 0.0,
    fixed_installments: 0.0,
    workshop_installments: 0.0,
    final_profit: 0.0,
    trip_count: 0,
    total_km: 0.0,
  };
  let Some(bounds) = month_bounds(&months) else {
    return out;
  };
  let keeps_vehicle = |vehicle_id: &str| match vehicle_filter {
    Some(wanted) => vehicle_id == wanted,
    None => true,
  };

  for trip in trips.iter().filter(|t| keeps_vehicle(&t.vehicle_id)) {
    let in_window = match month_of(&trip.start_date) {
      Some(month) => months.contains(&month),
      None => false,
    };
    if !in_window {
      continue;
    }
    let summary = trip_math::summarize(trip);
    out.gross_revenue += summary.gross_freight;
    out.trip_costs += summary.fueling_total + summary.other_expenses + summary.commission;
    out.total_km += summary.total_km;
    out.trip_count += 1;
  }
  for expense in fixed.iter().filter(|e| keeps_vehicle(&e.vehicle_id)) {
    if let Ok(dues) = installments::expand(expense, bounds.0, bounds.1) {
      out.fixed_installments += dues.iter().map(|d| d.amount).sum::<f64>();
    }
  }
  for expense in workshop.iter().filter(|e| keeps_vehicle(&e.vehicle_id)) {
    if let Ok(dues) = installments::expand(expense, bounds.0, bounds.1) {
      out.workshop_installments += dues.iter().map(|d| d.amount).sum::<f64>();
    }
  }
  out.final_profit =
    out.gross_revenue - out.trip_costs - out.fixed_installments - out.workshop_installments;
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Cargo;

  fn trip(vehicle_id: &str, start_date: &str, weight: f64, price: f64) -> Trip {
    Trip {
      id: crate::db::generate_id(20),
      driver_id: "d1".to_string(),
      vehicle_id: vehicle_id.to_string(),
      origin: "A".to_string(),
      destination: "B".to_string(),
      start_date: start_date.to_string(),
      end_date: None,
      start_km: 0.0,
      end_km: 0.0,
      status: "COMPLETED".to_string(),
      commission_rate: 0.0,
      monthly_trip_number: Some(1),
      signed_at: None,
      signature_confirmed: false,
      cargo: vec![Cargo {
        id: "c1".to_string(),
        cargo_type: "Milho".to_string(),
        weight,
        price_per_ton: price,
        tax: None,
      }],
      fueling: Vec::new(),
      expenses: Vec::new(),
      received_payments: Vec::new(),
      created_at: "2024-01-01T00:00:00Z".to_string(),
      updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
  }

  #[test]
  fn empty_period_yields_zero_filled_buckets() {
    let series = aggregate(&[], &[], &[], (2024, 1), (2024, 3), None);
    assert_eq!(series.labels, vec!["01/24", "02/24", "03/24"]);
    assert_eq!(series.revenue, vec![0.0, 0.0, 0.0]);
    assert_eq!(series.expenses, vec![0.0, 0.0, 0.0]);
    assert_eq!(series.profit, vec![0.0, 0.0, 0.0]);
  }

  #[test]
  fn inverted_range_is_empty_not_an_error() {
    let series = aggregate(&[], &[], &[], (2024, 6), (2024, 1), None);
    assert!(series.labels.is_empty());
    assert!(series.revenue.is_empty());
  }

  #[test]
  fn range_crosses_year_boundary() {
    let months = month_range((2023, 11), (2024, 2));
    assert_eq!(months, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
    assert_eq!(month_label(2023, 11), "11/23");
  }

  #[test]
  fn trips_bucket_by_start_month() {
    let trips = vec![
      trip("v1", "2024-01-10", 10.0, 100.0),
      trip("v1", "2024-01-25", 5.0, 100.0),
      trip("v1", "2024-03-05", 20.0, 100.0),
    ];
    let series = aggregate(&trips, &[], &[], (2024, 1), (2024, 3), None);
    assert_eq!(series.revenue, vec![1500.0, 0.0, 2000.0]);
    assert_eq!(series.profit, vec![1500.0, 0.0, 2000.0]);
  }

  #[test]
  fn vehicle_filter_applies_before_bucketing() {
    let trips = vec![
      trip("v1", "2024-01-10", 10.0, 100.0),
      trip("v2", "2024-01-10", 99.0, 100.0),
    ];
    let series = aggregate(&trips, &[], &[], (2024, 1), (2024, 1), Some("v1"));
    assert_eq!(series.revenue, vec![1000.0]);
  }

  #[test]
  fn installments_land_in_their_due_month() {
    let fixed = vec![FixedExpense {
      id: "fe1".to_string(),
      vehicle_id: "v1".to_string(),
      description: "Seguro".to_string(),
      category: "Seguro".to_string(),
      total_amount: 900.0,
      installments: 3,
      first_payment_date: "2024-01-15".to_string(),
      payments: Vec::new(),
      created_at: "2024-01-01T00:00:00Z".to_string(),
    }];
    let series = aggregate(&[], &fixed, &[], (2024, 1), (2024, 4), None);
    assert_eq!(series.expenses, vec![300.0, 300.0, 300.0, 0.0]);
    assert_eq!(series.profit, vec![-300.0, -300.0, -300.0, 0.0]);
  }

  #[test]
  fn vehicle_filter_excludes_other_vehicles_installments() {
    let fixed = vec![FixedExpense {
      id: "fe1".to_string(),
      vehicle_id: "v2".to_string(),
      description: "Seguro".to_string(),
      category: "Seguro".to_string(),
      total_amount: 900.0,
      installments: 3,
      first_payment_date: "2024-01-15".to_string(),
      payments: Vec::new(),
      created_at: "2024-01-01T00:00:00Z".to_string(),
    }];
    let series = aggregate(&[], &fixed, &[], (2024, 1), (2024, 3), Some("v1"));
    assert_eq!(series.expenses, vec![0.0, 0.0, 0.0]);
    assert_eq!(series.profit, vec![0.0, 0.0, 0.0]);

    let unfiltered = aggregate(&[], &fixed, &[], (2024, 1), (2024, 3), None);
    assert_eq!(unfiltered.expenses, vec![300.0, 300.0, 300.0]);
  }

  #[test]
  fn kpis_cover_the_filtered_window() {
    let trips = vec![
      trip("v1", "2024-01-10", 10.0, 100.0),
      trip("v1", "2024-06-10", 10.0, 100.0),
    ];
    let out = kpis(&trips, &[], &[], (2024, 1), (2024, 3), None);
    assert_eq!(out.trip_count, 1);
    assert!((out.gross_revenue - 1000.0).abs() < 1e-9);
    assert!((out.final_profit - 1000.0).abs() < 1e-9);
  }
}
