use serde::Serialize;

use crate::models::Trip;

/// Financial rollup of one trip. Every figure is derived from the trip's
/// child collections, nothing here is stored.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TripSummary {
  pub gross_freight: f64,
  pub net_freight: f64,
  pub fueling_total: f64,
  pub other_expenses: f64,
  pub commission: f64,
  pub net_profit: f64,
  pub total_km: f64,
  pub total_liters: f64,
  pub received: f64,
  pub balance: f64,
  pub fuel_efficiency: Option<f64>,
}

pub fn gross_freight(trip: &Trip) -> f64 {
  trip.cargo.iter().map(|c| c.weight * c.price_per_ton).sum()
}

/// Net freight: each cargo line's value minus its tax, missing tax counts
/// as zero.
pub fn net_freight(trip: &Trip) -> f64 {
  trip
    .cargo
    .iter()
    .map(|c| c.weight * c.price_per_ton - c.tax.unwrap_or(0.0))
    .sum()
}

pub fn fueling_total(trip: &Trip) -> f64 {
  trip.fueling.iter().map(|f| f.total_amount).sum()
}

pub fn other_expenses(trip: &Trip) -> f64 {
  trip.expenses.iter().map(|e| e.amount).sum()
}

pub fn received_total(trip: &Trip) -> f64 {
  trip.received_payments.iter().map(|p| p.amount).sum()
}

/// Odometer distance. A trip still on the road (end_km unset or zero)
/// contributes no distance rather than a negative one.
pub fn total_km(trip: &Trip) -> f64 {
  if trip.end_km > 0.0 {
    trip.end_km - trip.start_km
  } else {
    0.0
  }
}

pub fn summarize(trip: &Trip) -> TripSummary {
  let gross = gross_freight(trip);
  let net = net_freight(trip);
  let fueling = fueling_total(trip);
  let expenses = other_expenses(trip);
  let commission = net * trip.commission_rate / 100.0;
  let net_profit = net - commission - fueling - expenses;
  let km = total_km(trip);
  let liters: f64 = trip.fueling.iter().map(|f| f.liters).sum();
  let received = received_total(trip);

  let fuel_efficiency = if km > 0.0 && liters > 0.0 {
    Some(km / liters)
  } else {
    None
  };

  TripSummary {
    gross_freight: gross,
    net_freight: net,
    fueling_total: fueling,
    other_expenses: expenses,
    commission,
    net_profit,
    total_km: km,
    total_liters: liters,
    received,
    balance: net - received,
    fuel_efficiency,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Cargo, Fueling, ReceivedPayment, TripExpense};

  fn base_trip() -> Trip {
    Trip {
      id: "t1".to_string(),
      driver_id: "d1".to_string(),
      vehicle_id: "v1".to_string(),
      origin: "Curitiba".to_string(),
      destination: "Paranagua".to_string(),
      start_date: "2024-03-01".to_string(),
      end_date: Some("2024-03-03".to_string()),
      start_km: 100000.0,
      end_km: 100650.0,
      status: "COMPLETED".to_string(),
      commission_rate: 10.0,
      monthly_trip_number: Some(1),
      signed_at: None,
      signature_confirmed: false,
      cargo: Vec::new(),
      fueling: Vec::new(),
      expenses: Vec::new(),
      received_payments: Vec::new(),
      created_at: "2024-03-01T08:00:00Z".to_string(),
      updated_at: "2024-03-03T18:00:00Z".to_string(),
    }
  }

  fn cargo(weight: f64, price: f64, tax: Option<f64>) -> Cargo {
    Cargo {
      id: "c1".to_string(),
      cargo_type: "Soja".to_string(),
      weight,
      price_per_ton: price,
      tax,
    }
  }

  #[test]
  fn rollup_matches_hand_computed_scenario() {
    let mut trip = base_trip();
    trip.cargo = vec![cargo(30.0, 170.0, Some(300.0))];
    trip.fueling.push(Fueling {
      id: "f1".to_string(),
      station: "Posto BR".to_string(),
      date: "2024-03-01".to_string(),
      km: 100200.0,
      liters: 80.0,
      total_amount: 250.0,
      payment_method: "Cartao".to_string(),
    });
    trip.expenses.push(TripExpense {
      id: "e1".to_string(),
      category: "Pedagio".to_string(),
      description: "Pedagio BR-277".to_string(),
      amount: 100.0,
      date: "2024-03-01".to_string(),
    });

    let summary = summarize(&trip);
    assert!((summary.gross_freight - 5100.0).abs() < 1e-9);
    assert!((summary.net_freight - 4800.0).abs() < 1e-9);
    assert!((summary.commission - 480.0).abs() < 1e-9);
    assert!((summary.net_profit - 3970.0).abs() < 1e-9);
  }

  #[test]
  fn missing_tax_counts_as_zero() {
    let mut trip = base_trip();
    trip.cargo = vec![cargo(10.0, 100.0, None), cargo(10.0, 100.0, Some(50.0))];
    let summary = summarize(&trip);
    assert!((summary.gross_freight - 2000.0).abs() < 1e-9);
    assert!((summary.net_freight - 1950.0).abs() < 1e-9);
  }

  #[test]
  fn open_trip_has_zero_distance_and_no_efficiency() {
    let mut trip = base_trip();
    trip.end_km = 0.0;
    trip.fueling.push(Fueling {
      id: "f1".to_string(),
      station: "Posto BR".to_string(),
      date: "2024-03-01".to_string(),
      km: 100200.0,
      liters: 80.0,
      total_amount: 250.0,
      payment_method: "Pix".to_string(),
    });
    let summary = summarize(&trip);
    assert_eq!(summary.total_km, 0.0);
    assert_eq!(summary.fuel_efficiency, None);
  }

  #[test]
  fn efficiency_is_none_without_liters() {
    let trip = base_trip();
    let summary = summarize(&trip);
    assert_eq!(summary.total_km, 650.0);
    assert_eq!(summary.fuel_efficiency, None);
  }

  #[test]
  fn efficiency_is_km_per_liter() {
    let mut trip = base_trip();
    trip.fueling.push(Fueling {
      id: "f1".to_string(),
      station: "Posto BR".to_string(),
      date: "2024-03-01".to_string(),
      km: 100200.0,
      liters: 260.0,
      total_amount: 1500.0,
      payment_method: "Pix".to_string(),
    });
    let summary = summarize(&trip);
    assert_eq!(summary.fuel_efficiency, Some(650.0 / 260.0));
  }

  #[test]
  fn rollup_does_not_depend_on_child_row_order() {
    let mut trip = base_trip();
    trip.cargo = vec![cargo(30.0, 170.0, Some(300.0)), cargo(10.0, 100.0, None)];
    trip.fueling = vec![
      Fueling {
        id: "f1".to_string(),
        station: "Posto BR".to_string(),
        date: "2024-03-01".to_string(),
        km: 100200.0,
        liters: 80.0,
        total_amount: 250.0,
        payment_method: "Cartao".to_string(),
      },
      Fueling {
        id: "f2".to_string(),
        station: "Posto Ipiranga".to_string(),
        date: "2024-03-02".to_string(),
        km: 100500.0,
        liters: 120.0,
        total_amount: 700.0,
        payment_method: "Pix".to_string(),
      },
    ];
    trip.expenses = vec![
      TripExpense {
        id: "e1".to_string(),
        category: "Pedagio".to_string(),
        description: "Pedagio BR-277".to_string(),
        amount: 100.0,
        date: "2024-03-01".to_string(),
      },
      TripExpense {
        id: "e2".to_string(),
        category: "Alimentacao".to_string(),
        description: "Refeicao".to_string(),
        amount: 45.0,
        date: "2024-03-02".to_string(),
      },
    ];
    trip.received_payments = vec![
      ReceivedPayment {
        id: "p1".to_string(),
        pay_type: "Adiantamento".to_string(),
        method: "Pix".to_string(),
        amount: 2000.0,
        date: "2024-03-01".to_string(),
      },
      ReceivedPayment {
        id: "p2".to_string(),
        pay_type: "Saldo".to_string(),
        method: "Transferencia".to_string(),
        amount: 500.0,
        date: "2024-03-05".to_string(),
      },
    ];
    let forward = summarize(&trip);

    trip.cargo.reverse();
    trip.fueling.reverse();
    trip.expenses.reverse();
    trip.received_payments.reverse();
    let reversed = summarize(&trip);

    assert_eq!(forward.gross_freight, reversed.gross_freight);
    assert_eq!(forward.net_freight, reversed.net_freight);
    assert_eq!(forward.commission, reversed.commission);
    assert_eq!(forward.net_profit, reversed.net_profit);
    assert_eq!(forward.balance, reversed.balance);
    assert_eq!(forward.total_liters, reversed.total_liters);
    assert_eq!(forward.fuel_efficiency, reversed.fuel_efficiency);
  }

  #[test]
  fn balance_is_net_minus_received() {
    let mut trip = base_trip();
    trip.cargo = vec![cargo(30.0, 170.0, Some(300.0))];
    trip.received_payments.push(ReceivedPayment {
      id: "p1".to_string(),
      pay_type: "Adiantamento".to_string(),
      method: "Pix".to_string(),
      amount: 2000.0,
      date: "2024-03-01".to_string(),
    });
    let summary = summarize(&trip);
    assert!((summary.balance - 2800.0).abs() < 1e-9);
  }
}
