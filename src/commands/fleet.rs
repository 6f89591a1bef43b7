use chrono::{Datelike, Months, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::audit::log::append_audit;
use crate::auth;
use crate::db;
use crate::domain::{aggregate, installments, trip as trip_math, validation};
use crate::error::AppError;
use crate::models::*;
use crate::AppState;

fn payload_of<T: Serialize>(input: &T) -> String {
  serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string())
}

// --- Drivers ---

pub fn list_drivers(state: &AppState) -> Result<Vec<Driver>, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut stmt =
      conn.prepare("SELECT id, name, cnh, phone, status, created_at FROM drivers ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
      Ok(Driver {
        id: row.get(0)?,
        name: row.get(1)?,
        cnh: row.get(2)?,
        phone: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn create_driver(state: &AppState, input: DriverInput, actor: Option<String>) -> Result<Driver, AppError> {
  validation::ensure_not_blank(&input.name, "INVALID_NAME", "Nome obrigatorio")?;
  validation::ensure_password_length(&input.password)?;
  let payload_json = payload_of(&DriverUpdateInput {
    name: input.name.clone(),
    cnh: input.cnh.clone(),
    phone: input.phone.clone(),
    status: "ACTIVE".to_string(),
  });
  let hash = auth::hash_password(&input.password)?;

  db::with_conn(&state.db, |conn| {
    let name = input.name.trim().to_uppercase();
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM drivers WHERE UPPER(name) = ?1",
      params![name],
      |row| row.get(0),
    )?;
    if exists > 0 {
      return Err(AppError::conflict("DUPLICATE_DRIVER", "Ja existe motorista com este nome"));
    }

    let id = db::generate_id(20);
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO drivers (id, name, cnh, phone, status, password_hash, created_at)
       VALUES (?1, ?2, ?3, ?4, 'ACTIVE', ?5, ?6)",
      params![id, name, input.cnh, input.phone, hash, created_at],
    )?;
    append_audit(conn, actor, "CREATE_DRIVER", "DRIVER", Some(id.clone()), payload_json, None)?;
    Ok(Driver {
      id,
      name,
      cnh: input.cnh,
      phone: input.phone,
      status: "ACTIVE".to_string(),
      created_at,
    })
  })
}

pub fn update_driver(
  state: &AppState,
  id: String,
  input: DriverUpdateInput,
  actor: Option<String>,
) -> Result<Driver, AppError> {
  validation::ensure_not_blank(&input.name, "INVALID_NAME", "Nome obrigatorio")?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let updated = conn.execute(
      "UPDATE drivers SET name = ?1, cnh = ?2, phone = ?3, status = ?4 WHERE id = ?5",
      params![input.name.trim().to_uppercase(), input.cnh, input.phone, input.status, id],
    )?;
    if updated == 0 {
      return Err(AppError::not_found("DRIVER_NOT_FOUND", "Motorista nao encontrado"));
    }
    append_audit(conn, actor, "UPDATE_DRIVER", "DRIVER", Some(id.clone()), payload_json, None)?;
    conn
      .query_row(
        "SELECT id, name, cnh, phone, status, created_at FROM drivers WHERE id = ?1",
        params![id],
        |row| {
          Ok(Driver {
            id: row.get(0)?,
            name: row.get(1)?,
            cnh: row.get(2)?,
            phone: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
          })
        },
      )
      .map_err(AppError::from)
  })
}

pub fn delete_driver(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let trips: i64 = conn.query_row(
      "SELECT COUNT(*) FROM trips WHERE driver_id = ?1",
      params![id],
      |row| row.get(0),
    )?;
    if trips > 0 {
      return Err(AppError::conflict(
        "DRIVER_HAS_TRIPS",
        "Motorista possui viagens e nao pode ser excluido",
      ));
    }
    let deleted = conn.execute("DELETE FROM drivers WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("DRIVER_NOT_FOUND", "Motorista nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_DRIVER", "DRIVER", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

// --- Vehicles ---

pub fn list_vehicles(state: &AppState) -> Result<Vec<Vehicle>, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut stmt = conn
      .prepare("SELECT id, plate, model, chassi, status, created_at FROM vehicles ORDER BY plate")?;
    let rows = stmt.query_map([], |row| {
      Ok(Vehicle {
        id: row.get(0)?,
        plate: row.get(1)?,
        model: row.get(2)?,
        chassi: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn create_vehicle(state: &AppState, input: VehicleInput, actor: Option<String>) -> Result<Vehicle, AppError> {
  validation::ensure_not_blank(&input.plate, "INVALID_PLATE", "Placa obrigatoria")?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let plate = input.plate.trim().to_uppercase();
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM vehicles WHERE UPPER(plate) = ?1",
      params![plate],
      |row| row.get(0),
    )?;
    if exists > 0 {
      return Err(AppError::conflict("DUPLICATE_VEHICLE", "Ja existe veiculo com esta placa"));
    }

    let id = db::generate_id(20);
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO vehicles (id, plate, model, chassi, status, created_at)
       VALUES (?1, ?2, ?3, ?4, 'ACTIVE', ?5)",
      params![id, plate, input.model, input.chassi, created_at],
    )?;
    append_audit(conn, actor, "CREATE_VEHICLE", "VEHICLE", Some(id.clone()), payload_json, None)?;
    Ok(Vehicle {
      id,
      plate,
      model: input.model,
      chassi: input.chassi,
      status: "ACTIVE".to_string(),
      created_at,
    })
  })
}

pub fn delete_vehicle(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let references: i64 = conn.query_row(
      "SELECT (SELECT COUNT(*) FROM trips WHERE vehicle_id = ?1)
            + (SELECT COUNT(*) FROM fixed_expenses WHERE vehicle_id = ?1)
            + (SELECT COUNT(*) FROM workshop_expenses WHERE vehicle_id = ?1)",
      params![id],
      |row| row.get(0),
    )?;
    if references > 0 {
      return Err(AppError::conflict(
        "VEHICLE_IN_USE",
        "Veiculo possui viagens ou despesas e nao pode ser excluido",
      ));
    }
    let deleted = conn.execute("DELETE FROM vehicles WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("VEHICLE_NOT_FOUND", "Veiculo nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_VEHICLE", "VEHICLE", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

// --- Admins ---

pub fn list_admins(state: &AppState) -> Result<Vec<Admin>, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM admins ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
      Ok(Admin {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn create_admin(state: &AppState, input: AdminInput, actor: Option<String>) -> Result<Admin, AppError> {
  validation::ensure_not_blank(&input.name, "INVALID_NAME", "Nome obrigatorio")?;
  validation::ensure_password_length(&input.password)?;
  let hash = auth::hash_password(&input.password)?;

  db::with_conn(&state.db, |conn| {
    let name = input.name.trim().to_uppercase();
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM admins WHERE UPPER(name) = ?1",
      params![name],
      |row| row.get(0),
    )?;
    if exists > 0 {
      return Err(AppError::conflict("DUPLICATE_ADMIN", "Ja existe administrador com este nome"));
    }

    let id = db::generate_id(20);
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO admins (id, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
      params![id, name, hash, created_at],
    )?;
    append_audit(
      conn,
      actor,
      "CREATE_ADMIN",
      "ADMIN",
      Some(id.clone()),
      format!("{{\"name\":{}}}", serde_json::to_string(&name).unwrap_or_default()),
      None,
    )?;
    Ok(Admin { id, name, created_at })
  })
}

pub fn delete_admin(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let remaining: i64 = conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
    if remaining <= 1 {
      return Err(AppError::conflict("LAST_ADMIN", "Ultimo administrador nao pode ser excluido"));
    }
    let deleted = conn.execute("DELETE FROM admins WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("ADMIN_NOT_FOUND", "Administrador nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_ADMIN", "ADMIN", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

// --- Trips ---

fn load_trip(conn: &Connection, id: &str) -> Result<Trip, AppError> {
  let mut trip = conn
    .query_row(
      "SELECT id, driver_id, vehicle_id, origin, destination, start_date, end_date,
              start_km, end_km, status, commission_rate, monthly_trip_number,
              signed_at, signature_confirmed, created_at, updated_at
       FROM trips WHERE id = ?1",
      params![id],
      |row| {
        Ok(Trip {
          id: row.get(0)?,
          driver_id: row.get(1)?,
          vehicle_id: row.get(2)?,
          origin: row.get(3)?,
          destination: row.get(4)?,
          start_date: row.get(5)?,
          end_date: row.get(6)?,
          start_km: row.get(7)?,
          end_km: row.get(8)?,
          status: row.get(9)?,
          commission_rate: row.get(10)?,
          monthly_trip_number: row.get(11)?,
          signed_at: row.get(12)?,
          signature_confirmed: row.get::<_, i64>(13)? == 1,
          cargo: Vec::new(),
          fueling: Vec::new(),
          expenses: Vec::new(),
          received_payments: Vec::new(),
          created_at: row.get(14)?,
          updated_at: row.get(15)?,
        })
      },
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("TRIP_NOT_FOUND", "Viagem nao encontrada"))?;

  let mut stmt = conn.prepare(
    "SELECT id, cargo_type, weight, price_per_ton, tax FROM trip_cargo WHERE trip_id = ?1",
  )?;
  let rows = stmt.query_map(params![id], |row| {
    Ok(Cargo {
      id: row.get(0)?,
      cargo_type: row.get(1)?,
      weight: row.get(2)?,
      price_per_ton: row.get(3)?,
      tax: row.get(4)?,
    })
  })?;
  trip.cargo = rows.filter_map(Result::ok).collect();

  let mut stmt = conn.prepare(
    "SELECT id, station, date, km, liters, total_amount, payment_method
     FROM trip_fuelings WHERE trip_id = ?1 ORDER BY date",
  )?;
  let rows = stmt.query_map(params![id], |row| {
    Ok(Fueling {
      id: row.get(0)?,
      station: row.get(1)?,
      date: row.get(2)?,
      km: row.get(3)?,
      liters: row.get(4)?,
      total_amount: row.get(5)?,
      payment_method: row.get(6)?,
    })
  })?;
  trip.fueling = rows.filter_map(Result::ok).collect();

  let mut stmt = conn.prepare(
    "SELECT id, category, description, amount, date FROM trip_expenses WHERE trip_id = ?1 ORDER BY date",
  )?;
  let rows = stmt.query_map(params![id], |row| {
    Ok(TripExpense {
      id: row.get(0)?,
      category: row.get(1)?,
      description: row.get(2)?,
      amount: row.get(3)?,
      date: row.get(4)?,
    })
  })?;
  trip.expenses = rows.filter_map(Result::ok).collect();

  let mut stmt = conn.prepare(
    "SELECT id, pay_type, method, amount, date FROM trip_payments WHERE trip_id = ?1 ORDER BY date",
  )?;
  let rows = stmt.query_map(params![id], |row| {
    Ok(ReceivedPayment {
      id: row.get(0)?,
      pay_type: row.get(1)?,
      method: row.get(2)?,
      amount: row.get(3)?,
      date: row.get(4)?,
    })
  })?;
  trip.received_payments = rows.filter_map(Result::ok).collect();

  Ok(trip)
}

fn load_trips(conn: &Connection, driver_id: Option<&str>) -> Result<Vec<Trip>, AppError> {
  let mut ids: Vec<String> = Vec::new();
  match driver_id {
    Some(driver_id) => {
      let mut stmt = conn
        .prepare("SELECT id FROM trips WHERE driver_id = ?1 ORDER BY start_date DESC, created_at DESC")?;
      let rows = stmt.query_map(params![driver_id], |row| row.get(0))?;
      for row in rows {
        ids.push(row?);
      }
    }
    None => {
      let mut stmt = conn.prepare("SELECT id FROM trips ORDER BY start_date DESC, created_at DESC")?;
      let rows = stmt.query_map([], |row| row.get(0))?;
      for row in rows {
        ids.push(row?);
      }
    }
  }

  let mut trips = Vec::with_capacity(ids.len());
  for id in ids {
    trips.push(load_trip(conn, &id)?);
  }
  Ok(trips)
}

pub fn list_trips(state: &AppState, driver_id: Option<String>) -> Result<Vec<Trip>, AppError> {
  db::with_conn(&state.db, |conn| load_trips(conn, driver_id.as_deref()))
}

pub fn get_trip(state: &AppState, id: String) -> Result<Trip, AppError> {
  db::with_conn(&state.db, |conn| load_trip(conn, &id))
}

fn month_bounds_of(date: NaiveDate) -> Option<(String, String)> {
  let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
  let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
  Some((
    first.format("%Y-%m-%d").to_string(),
    last.format("%Y-%m-%d").to_string(),
  ))
}

pub fn create_trip(state: &AppState, input: TripInput, actor: Option<String>) -> Result<Trip, AppError> {
  let start = validation::parse_date(&input.start_date)?;
  validation::ensure_commission_rate(input.commission_rate)?;
  validation::ensure_not_blank(&input.origin, "INVALID_ORIGIN", "Origem obrigatoria")?;
  validation::ensure_not_blank(&input.destination, "INVALID_DESTINATION", "Destino obrigatorio")?;
  let status = input.status.clone().unwrap_or_else(|| "IN_PROGRESS".to_string());
  if status != "IN_PROGRESS" && status != "PLANNED" {
    // COMPLETED only via finish_trip, which checks the kilometrage.
    return Err(AppError::validation("INVALID_STATUS", "Status inicial invalido"));
  }
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let driver_exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM drivers WHERE id = ?1",
      params![input.driver_id],
      |row| row.get(0),
    )?;
    if driver_exists == 0 {
      return Err(AppError::not_found("DRIVER_NOT_FOUND", "Motorista nao encontrado"));
    }
    let vehicle_exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM vehicles WHERE id = ?1",
      params![input.vehicle_id],
      |row| row.get(0),
    )?;
    if vehicle_exists == 0 {
      return Err(AppError::not_found("VEHICLE_NOT_FOUND", "Veiculo nao encontrado"));
    }

    let (month_start, month_end) = month_bounds_of(start)
      .ok_or_else(|| AppError::validation("INVALID_DATE", "Data deve ser YYYY-MM-DD"))?;
    let in_month: i64 = conn.query_row(
      "SELECT COUNT(*) FROM trips WHERE driver_id = ?1 AND start_date BETWEEN ?2 AND ?3",
      params![input.driver_id, month_start, month_end],
      |row| row.get(0),
    )?;

    let id = db::generate_id(20);
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO trips (id, driver_id, vehicle_id, origin, destination, start_date,
                          start_km, end_km, status, commission_rate, monthly_trip_number,
                          signature_confirmed, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, 0, ?11, ?11)",
      params![
        id,
        input.driver_id,
        input.vehicle_id,
        input.origin,
        input.destination,
        input.start_date,
        input.start_km,
        status,
        input.commission_rate,
        in_month + 1,
        now
      ],
    )?;
    append_audit(conn, actor, "CREATE_TRIP", "TRIP", Some(id.clone()), payload_json, None)?;
    load_trip(conn, &id)
  })
}

pub fn finish_trip(
  state: &AppState,
  id: String,
  input: FinishTripInput,
  actor: Option<String>,
) -> Result<Trip, AppError> {
  validation::parse_date(&input.end_date)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let trip = load_trip(conn, &id)?;
    if trip.status == "COMPLETED" {
      return Err(AppError::conflict("TRIP_ALREADY_COMPLETED", "Viagem ja finalizada"));
    }
    if input.end_km <= trip.start_km {
      return Err(AppError::validation("INVALID_END_KM", "KM final deve ser maior que o inicial"));
    }

    conn.execute(
      "UPDATE trips SET end_date = ?1, end_km = ?2, status = 'COMPLETED', updated_at = ?3 WHERE id = ?4",
      params![input.end_date, input.end_km, Utc::now().to_rfc3339(), id],
    )?;
    append_audit(conn, actor, "FINISH_TRIP", "TRIP", Some(id.clone()), payload_json, None)?;
    load_trip(conn, &id)
  })
}

/// Driver signature on the settlement ("acerto") of a completed trip.
pub fn sign_trip(state: &AppState, id: String, actor: Option<String>) -> Result<Trip, AppError> {
  db::with_conn(&state.db, |conn| {
    let trip = load_trip(conn, &id)?;
    if trip.status != "COMPLETED" {
      return Err(AppError::conflict("TRIP_NOT_COMPLETED", "Somente viagens finalizadas podem ser assinadas"));
    }
    if trip.signature_confirmed {
      return Err(AppError::conflict("ALREADY_SIGNED", "Viagem ja assinada"));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
      "UPDATE trips SET signed_at = ?1, signature_confirmed = 1, updated_at = ?1 WHERE id = ?2",
      params![now, id],
    )?;
    append_audit(conn, actor, "SIGN_TRIP", "TRIP", Some(id.clone()), "{}".to_string(), None)?;
    load_trip(conn, &id)
  })
}

pub fn delete_trip(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM trips WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("TRIP_NOT_FOUND", "Viagem nao encontrada"));
    }
    append_audit(conn, actor, "DELETE_TRIP", "TRIP", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

fn ensure_trip_open(conn: &Connection, trip_id: &str) -> Result<(), AppError> {
  let signed: i64 = conn
    .query_row(
      "SELECT signature_confirmed FROM trips WHERE id = ?1",
      params![trip_id],
      |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("TRIP_NOT_FOUND", "Viagem nao encontrada"))?;
  if signed == 1 {
    return Err(AppError::conflict("TRIP_SIGNED", "Viagem assinada nao pode ser alterada"));
  }
  Ok(())
}

fn touch_trip(conn: &Connection, trip_id: &str) -> Result<(), AppError> {
  conn.execute(
    "UPDATE trips SET updated_at = ?1 WHERE id = ?2",
    params![Utc::now().to_rfc3339(), trip_id],
  )?;
  Ok(())
}

pub fn add_cargo(
  state: &AppState,
  trip_id: String,
  input: CargoInput,
  actor: Option<String>,
) -> Result<Trip, AppError> {
  validation::ensure_amount_positive(input.weight)?;
  validation::ensure_amount_positive(input.price_per_ton)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    ensure_trip_open(conn, &trip_id)?;
    conn.execute(
      "INSERT INTO trip_cargo (id, trip_id, cargo_type, weight, price_per_ton, tax)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![db::generate_id(20), trip_id, input.cargo_type, input.weight, input.price_per_ton, input.tax],
    )?;
    touch_trip(conn, &trip_id)?;
    append_audit(conn, actor, "ADD_CARGO", "TRIP", Some(trip_id.clone()), payload_json, None)?;
    load_trip(conn, &trip_id)
  })
}

pub fn add_fueling(
  state: &AppState,
  trip_id: String,
  input: FuelingInput,
  actor: Option<String>,
) -> Result<Trip, AppError> {
  validation::parse_date(&input.date)?;
  validation::ensure_amount_positive(input.total_amount)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    ensure_trip_open(conn, &trip_id)?;
    conn.execute(
      "INSERT INTO trip_fuelings (id, trip_id, station, date, km, liters, total_amount, payment_method)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        db::generate_id(20),
        trip_id,
        input.station,
        input.date,
        input.km,
        input.liters,
        input.total_amount,
        input.payment_method
      ],
    )?;
    touch_trip(conn, &trip_id)?;
    append_audit(conn, actor, "ADD_FUELING", "TRIP", Some(trip_id.clone()), payload_json, None)?;
    load_trip(conn, &trip_id)
  })
}

pub fn add_trip_expense(
  state: &AppState,
  trip_id: String,
  input: TripExpenseInput,
  actor: Option<String>,
) -> Result<Trip, AppError> {
  validation::parse_date(&input.date)?;
  validation::ensure_amount_positive(input.amount)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    ensure_trip_open(conn, &trip_id)?;
    conn.execute(
      "INSERT INTO trip_expenses (id, trip_id, category, description, amount, date)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![db::generate_id(20), trip_id, input.category, input.description, input.amount, input.date],
    )?;
    touch_trip(conn, &trip_id)?;
    append_audit(conn, actor, "ADD_TRIP_EXPENSE", "TRIP", Some(trip_id.clone()), payload_json, None)?;
    load_trip(conn, &trip_id)
  })
}

pub fn add_trip_payment(
  state: &AppState,
  trip_id: String,
  input: ReceivedPaymentInput,
  actor: Option<String>,
) -> Result<Trip, AppError> {
  validation::parse_date(&input.date)?;
  validation::ensure_amount_positive(input.amount)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    ensure_trip_open(conn, &trip_id)?;
    conn.execute(
      "INSERT INTO trip_payments (id, trip_id, pay_type, method, amount, date)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![db::generate_id(20), trip_id, input.pay_type, input.method, input.amount, input.date],
    )?;
    touch_trip(conn, &trip_id)?;
    append_audit(conn, actor, "ADD_TRIP_PAYMENT", "TRIP", Some(trip_id.clone()), payload_json, None)?;
    load_trip(conn, &trip_id)
  })
}

pub fn trip_summary(state: &AppState, id: String) -> Result<trip_math::TripSummary, AppError> {
  let trip = get_trip(state, id)?;
  Ok(trip_math::summarize(&trip))
}

// --- Installment-bearing expenses ---

fn load_fixed_expenses(conn: &Connection, vehicle_id: Option<&str>) -> Result<Vec<FixedExpense>, AppError> {
  let mut expenses: Vec<FixedExpense> = Vec::new();
  {
    let (sql, filter) = match vehicle_id {
      Some(v) => (
        "SELECT id, vehicle_id, description, category, total_amount, installments, first_payment_date, created_at
         FROM fixed_expenses WHERE vehicle_id = ?1 ORDER BY first_payment_date",
        Some(v),
      ),
      None => (
        "SELECT id, vehicle_id, description, category, total_amount, installments, first_payment_date, created_at
         FROM fixed_expenses ORDER BY first_payment_date",
        None,
      ),
    };
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
      Ok(FixedExpense {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        total_amount: row.get(4)?,
        installments: row.get(5)?,
        first_payment_date: row.get(6)?,
        payments: Vec::new(),
        created_at: row.get(7)?,
      })
    };
    match filter {
      Some(v) => {
        let rows = stmt.query_map(params![v], map_row)?;
        for row in rows {
          expenses.push(row?);
        }
      }
      None => {
        let rows = stmt.query_map([], map_row)?;
        for row in rows {
          expenses.push(row?);
        }
      }
    }
  }

  for expense in &mut expenses {
    let mut stmt = conn.prepare(
      "SELECT id, date, amount FROM fixed_expense_payments WHERE expense_id = ?1 ORDER BY date",
    )?;
    let rows = stmt.query_map(params![expense.id], |row| {
      Ok(ExpensePayment {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
      })
    })?;
    expense.payments = rows.filter_map(Result::ok).collect();
  }
  Ok(expenses)
}

fn load_workshop_expenses(conn: &Connection, vehicle_id: Option<&str>) -> Result<Vec<WorkshopExpense>, AppError> {
  let mut expenses: Vec<WorkshopExpense> = Vec::new();
  {
    let (sql, filter) = match vehicle_id {
      Some(v) => (
        "SELECT id, vehicle_id, description, service_date, first_payment_date, total_amount, installments, created_at
         FROM workshop_expenses WHERE vehicle_id = ?1 ORDER BY service_date",
        Some(v),
      ),
      None => (
        "SELECT id, vehicle_id, description, service_date, first_payment_date, total_amount, installments, created_at
         FROM workshop_expenses ORDER BY service_date",
        None,
      ),
    };
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
      Ok(WorkshopExpense {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        description: row.get(2)?,
        service_date: row.get(3)?,
        first_payment_date: row.get(4)?,
        total_amount: row.get(5)?,
        installments: row.get(6)?,
        payments: Vec::new(),
        created_at: row.get(7)?,
      })
    };
    match filter {
      Some(v) => {
        let rows = stmt.query_map(params![v], map_row)?;
        for row in rows {
          expenses.push(row?);
        }
      }
      None => {
        let rows = stmt.query_map([], map_row)?;
        for row in rows {
          expenses.push(row?);
        }
      }
    }
  }

  for expense in &mut expenses {
    let mut stmt = conn.prepare(
      "SELECT id, date, amount FROM workshop_expense_payments WHERE expense_id = ?1 ORDER BY date",
    )?;
    let rows = stmt.query_map(params![expense.id], |row| {
      Ok(ExpensePayment {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
      })
    })?;
    expense.payments = rows.filter_map(Result::ok).collect();
  }
  Ok(expenses)
}

pub fn list_fixed_expenses(state: &AppState, vehicle_id: Option<String>) -> Result<Vec<FixedExpense>, AppError> {
  db::with_conn(&state.db, |conn| load_fixed_expenses(conn, vehicle_id.as_deref()))
}

pub fn create_fixed_expense(
  state: &AppState,
  input: FixedExpenseInput,
  actor: Option<String>,
) -> Result<FixedExpense, AppError> {
  validation::parse_date(&input.first_payment_date)?;
  validation::ensure_amount_positive(input.total_amount)?;
  installments::installment_amount(input.total_amount, input.installments)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let id = db::generate_id(20);
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO fixed_expenses (id, vehicle_id, description, category, total_amount, installments, first_payment_date, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        id,
        input.vehicle_id,
        input.description,
        input.category,
        input.total_amount,
        input.installments,
        input.first_payment_date,
        created_at
      ],
    )?;
    append_audit(conn, actor, "CREATE_FIXED_EXPENSE", "FIXED_EXPENSE", Some(id.clone()), payload_json, None)?;
    Ok(FixedExpense {
      id,
      vehicle_id: input.vehicle_id,
      description: input.description,
      category: input.category,
      total_amount: input.total_amount,
      installments: input.installments,
      first_payment_date: input.first_payment_date,
      payments: Vec::new(),
      created_at,
    })
  })
}

pub fn delete_fixed_expense(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM fixed_expenses WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("EXPENSE_NOT_FOUND", "Despesa nao encontrada"));
    }
    append_audit(conn, actor, "DELETE_FIXED_EXPENSE", "FIXED_EXPENSE", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

pub fn record_fixed_payment(
  state: &AppState,
  expense_id: String,
  input: ExpensePaymentInput,
  actor: Option<String>,
) -> Result<(), AppError> {
  validation::parse_date(&input.date)?;
  validation::ensure_amount_positive(input.amount)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM fixed_expenses WHERE id = ?1",
      params![expense_id],
      |row| row.get(0),
    )?;
    if exists == 0 {
      return Err(AppError::not_found("EXPENSE_NOT_FOUND", "Despesa nao encontrada"));
    }
    conn.execute(
      "INSERT INTO fixed_expense_payments (id, expense_id, date, amount) VALUES (?1, ?2, ?3, ?4)",
      params![db::generate_id(20), expense_id, input.date, input.amount],
    )?;
    append_audit(conn, actor, "PAY_FIXED_EXPENSE", "FIXED_EXPENSE", Some(expense_id), payload_json, None)?;
    Ok(())
  })
}

pub fn list_workshop_expenses(state: &AppState, vehicle_id: Option<String>) -> Result<Vec<WorkshopExpense>, AppError> {
  db::with_conn(&state.db, |conn| load_workshop_expenses(conn, vehicle_id.as_deref()))
}

pub fn create_workshop_expense(
  state: &AppState,
  input: WorkshopExpenseInput,
  actor: Option<String>,
) -> Result<WorkshopExpense, AppError> {
  validation::parse_date(&input.service_date)?;
  validation::parse_date(&input.first_payment_date)?;
  validation::ensure_amount_positive(input.total_amount)?;
  installments::installment_amount(input.total_amount, input.installments)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let id = db::generate_id(20);
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO workshop_expenses (id, vehicle_id, description, service_date, first_payment_date, total_amount, installments, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        id,
        input.vehicle_id,
        input.description,
        input.service_date,
        input.first_payment_date,
        input.total_amount,
        input.installments,
        created_at
      ],
    )?;
    append_audit(conn, actor, "CREATE_WORKSHOP_EXPENSE", "WORKSHOP_EXPENSE", Some(id.clone()), payload_json, None)?;
    Ok(WorkshopExpense {
      id,
      vehicle_id: input.vehicle_id,
      description: input.description,
      service_date: input.service_date,
      first_payment_date: input.first_payment_date,
      total_amount: input.total_amount,
      installments: input.installments,
      payments: Vec::new(),
      created_at,
    })
  })
}

pub fn delete_workshop_expense(state: &AppState, id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM workshop_expenses WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("EXPENSE_NOT_FOUND", "Despesa nao encontrada"));
    }
    append_audit(conn, actor, "DELETE_WORKSHOP_EXPENSE", "WORKSHOP_EXPENSE", Some(id), "{}".to_string(), None)?;
    Ok(())
  })
}

pub fn record_workshop_payment(
  state: &AppState,
  expense_id: String,
  input: ExpensePaymentInput,
  actor: Option<String>,
) -> Result<(), AppError> {
  validation::parse_date(&input.date)?;
  validation::ensure_amount_positive(input.amount)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM workshop_expenses WHERE id = ?1",
      params![expense_id],
      |row| row.get(0),
    )?;
    if exists == 0 {
      return Err(AppError::not_found("EXPENSE_NOT_FOUND", "Despesa nao encontrada"));
    }
    conn.execute(
      "INSERT INTO workshop_expense_payments (id, expense_id, date, amount) VALUES (?1, ?2, ?3, ?4)",
      params![db::generate_id(20), expense_id, input.date, input.amount],
    )?;
    append_audit(conn, actor, "PAY_WORKSHOP_EXPENSE", "WORKSHOP_EXPENSE", Some(expense_id), payload_json, None)?;
    Ok(())
  })
}

// --- Dashboards and reports ---

#[derive(Debug, Serialize)]
pub struct FleetAnalysis {
  pub series: aggregate::FleetSeries,
  pub kpis: aggregate::FleetKpis,
}

pub fn fleet_analysis(
  state: &AppState,
  start_month: String,
  end_month: String,
  vehicle_id: Option<String>,
) -> Result<FleetAnalysis, AppError> {
  let start = validation::parse_month(&start_month)?;
  let end = validation::parse_month(&end_month)?;

  db::with_conn(&state.db, |conn| {
    let trips = load_trips(conn, None)?;
    let fixed = load_fixed_expenses(conn, None)?;
    let workshop = load_workshop_expenses(conn, None)?;
    let filter = vehicle_id.as_deref();
    Ok(FleetAnalysis {
      series: aggregate::aggregate(&trips, &fixed, &workshop, start, end, filter),
      kpis: aggregate::kpis(&trips, &fixed, &workshop, start, end, filter),
    })
  })
}

pub fn fleet_overview(state: &AppState) -> Result<FleetOverview, AppError> {
  db::with_conn(&state.db, |conn| {
    let (drivers, vehicles, trips_in_progress) = conn.query_row(
      "SELECT
          (SELECT COUNT(*) FROM drivers WHERE status = 'ACTIVE'),
          (SELECT COUNT(*) FROM vehicles WHERE status = 'ACTIVE'),
          (SELECT COUNT(*) FROM trips WHERE status = 'IN_PROGRESS')",
      [],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(FleetOverview {
      drivers,
      vehicles,
      trips_in_progress,
    })
  })
}

pub fn driver_overview(state: &AppState, driver_id: String) -> Result<DriverOverview, AppError> {
  db::with_conn(&state.db, |conn| {
    let trips = load_trips(conn, Some(&driver_id))?;
    let completed: Vec<_> = trips.iter().filter(|t| t.status == "COMPLETED").collect();
    Ok(DriverOverview {
      driver_id,
      completed_trips: completed.len() as i64,
      total_km: completed.iter().map(|t| trip_math::total_km(t)).sum(),
    })
  })
}

/// Month billing report: trips bucketed by start month, installment-bearing
/// expenses by due month, broken down per vehicle.
pub fn billing_report(state: &AppState, month: String) -> Result<BillingReport, AppError> {
  let (year, month_num) = validation::parse_month(&month)?;

  db::with_conn(&state.db, |conn| {
    let first = NaiveDate::from_ymd_opt(year, month_num, 1)
      .ok_or_else(|| AppError::validation("INVALID_MONTH", "Mes deve ser YYYY-MM"))?;
    let last = first
      .checked_add_months(Months::new(1))
      .and_then(|d| d.pred_opt())
      .ok_or_else(|| AppError::validation("INVALID_MONTH", "Mes deve ser YYYY-MM"))?;

    let trips = load_trips(conn, None)?;
    let fixed = load_fixed_expenses(conn, None)?;
    let workshop = load_workshop_expenses(conn, None)?;
    let vehicles = {
      let mut stmt = conn.prepare("SELECT id, plate FROM vehicles ORDER BY plate")?;
      let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
      rows.filter_map(Result::ok).collect::<Vec<_>>()
    };

    let mut report = BillingReport {
      month,
      gross_revenue: 0.0,
      net_revenue: 0.0,
      fixed_expenses: 0.0,
      workshop_expenses: 0.0,
      final_profit: 0.0,
      vehicles: Vec::new(),
    };

    for (vehicle_id, plate) in vehicles {
      let mut row = VehicleBillingRow {
        vehicle_id: vehicle_id.clone(),
        plate,
        gross_revenue: 0.0,
        net_revenue: 0.0,
        fixed_expenses: 0.0,
        workshop_expenses: 0.0,
        total_km: 0.0,
        total_liters: 0.0,
        final_profit: 0.0,
      };

      for trip in trips.iter().filter(|t| t.vehicle_id == vehicle_id) {
        let started = match validation::parse_date(&trip.start_date) {
          Ok(date) => date,
          Err(_) => continue,
        };
        if started < first || started > last {
          continue;
        }
        let summary = trip_math::summarize(trip);
        row.gross_revenue += summary.gross_freight;
        row.net_revenue += summary.net_freight - summary.commission - summary.fueling_total
          - summary.other_expenses;
        row.total_km += summary.total_km;
        row.total_liters += summary.total_liters;
      }
      for expense in fixed.iter().filter(|e| e.vehicle_id == vehicle_id) {
        let dues = installments::expand(expense, first, last)?;
        row.fixed_expenses += dues.iter().map(|d| d.amount).sum::<f64>();
      }
      for expense in workshop.iter().filter(|e| e.vehicle_id == vehicle_id) {
        let dues = installments::expand(expense, first, last)?;
        row.workshop_expenses += dues.iter().map(|d| d.amount).sum::<f64>();
      }
      row.final_profit = row.net_revenue - row.fixed_expenses - row.workshop_expenses;

      report.gross_revenue += row.gross_revenue;
      report.net_revenue += row.net_revenue;
      report.fixed_expenses += row.fixed_expenses;
      report.workshop_expenses += row.workshop_expenses;
      report.final_profit += row.final_profit;
      report.vehicles.push(row);
    }

    Ok(report)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::SessionStore;
  use crate::db::open_test_db;

  fn test_state() -> AppState {
    AppState {
      db: open_test_db(),
      sessions: SessionStore::new(),
    }
  }

  fn seed_driver(state: &AppState) -> Driver {
    create_driver(
      state,
      DriverInput {
        name: "Joao".to_string(),
        cnh: "123456".to_string(),
        phone: "41999990000".to_string(),
        password: "senha123".to_string(),
      },
      None,
    )
    .unwrap()
  }

  fn seed_vehicle(state: &AppState) -> Vehicle {
    create_vehicle(
      state,
      VehicleInput {
        plate: "abc1d23".to_string(),
        model: "Scania R450".to_string(),
        chassi: "9BW00000000000000".to_string(),
      },
      None,
    )
    .unwrap()
  }

  fn seed_trip(state: &AppState, driver: &Driver, vehicle: &Vehicle, start_date: &str) -> Trip {
    create_trip(
      state,
      TripInput {
        driver_id: driver.id.clone(),
        vehicle_id: vehicle.id.clone(),
        origin: "Curitiba".to_string(),
        destination: "Paranagua".to_string(),
        start_date: start_date.to_string(),
        start_km: 1000.0,
        commission_rate: 10.0,
        status: None,
      },
      None,
    )
    .unwrap()
  }

  #[test]
  fn driver_names_are_normalized_and_unique() {
    let state = test_state();
    let driver = seed_driver(&state);
    assert_eq!(driver.name, "JOAO");

    let duplicate = create_driver(
      &state,
      DriverInput {
        name: "joao".to_string(),
        cnh: "999".to_string(),
        phone: "0".to_string(),
        password: "senha123".to_string(),
      },
      None,
    );
    assert_eq!(duplicate.unwrap_err().http_status(), 409);
  }

  #[test]
  fn monthly_trip_number_counts_per_driver_month() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);

    let first = seed_trip(&state, &driver, &vehicle, "2024-03-05");
    let second = seed_trip(&state, &driver, &vehicle, "2024-03-20");
    let next_month = seed_trip(&state, &driver, &vehicle, "2024-04-01");

    assert_eq!(first.monthly_trip_number, Some(1));
    assert_eq!(second.monthly_trip_number, Some(2));
    assert_eq!(next_month.monthly_trip_number, Some(1));
  }

  #[test]
  fn finish_requires_end_km_beyond_start() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");

    let too_short = finish_trip(
      &state,
      trip.id.clone(),
      FinishTripInput {
        end_date: "2024-03-07".to_string(),
        end_km: 1000.0,
      },
      None,
    );
    assert_eq!(too_short.unwrap_err().http_status(), 400);

    let finished = finish_trip(
      &state,
      trip.id.clone(),
      FinishTripInput {
        end_date: "2024-03-07".to_string(),
        end_km: 1650.0,
      },
      None,
    )
    .unwrap();
    assert_eq!(finished.status, "COMPLETED");
    assert_eq!(finished.end_km, 1650.0);
  }

  #[test]
  fn trips_cannot_be_created_already_completed() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);

    let result = create_trip(
      &state,
      TripInput {
        driver_id: driver.id.clone(),
        vehicle_id: vehicle.id.clone(),
        origin: "Curitiba".to_string(),
        destination: "Paranagua".to_string(),
        start_date: "2024-03-05".to_string(),
        start_km: 1000.0,
        commission_rate: 10.0,
        status: Some("COMPLETED".to_string()),
      },
      None,
    );
    let err = result.unwrap_err();
    assert_eq!(err.http_status(), 400);
    assert_eq!(err.code, "INVALID_STATUS");

    let planned = create_trip(
      &state,
      TripInput {
        driver_id: driver.id,
        vehicle_id: vehicle.id,
        origin: "Curitiba".to_string(),
        destination: "Paranagua".to_string(),
        start_date: "2024-03-05".to_string(),
        start_km: 1000.0,
        commission_rate: 10.0,
        status: Some("PLANNED".to_string()),
      },
      None,
    )
    .unwrap();
    assert_eq!(planned.status, "PLANNED");
  }

  #[test]
  fn sign_only_applies_to_completed_trips() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");

    assert_eq!(sign_trip(&state, trip.id.clone(), None).unwrap_err().http_status(), 409);

    finish_trip(
      &state,
      trip.id.clone(),
      FinishTripInput {
        end_date: "2024-03-07".to_string(),
        end_km: 1650.0,
      },
      None,
    )
    .unwrap();
    let signed = sign_trip(&state, trip.id.clone(), None).unwrap();
    assert!(signed.signature_confirmed);

    // settled trips are frozen
    let frozen = add_cargo(
      &state,
      trip.id,
      CargoInput {
        cargo_type: "Soja".to_string(),
        weight: 10.0,
        price_per_ton: 100.0,
        tax: None,
      },
      None,
    );
    assert_eq!(frozen.unwrap_err().http_status(), 409);
  }

  #[test]
  fn trip_summary_reflects_child_rows() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");

    add_cargo(
      &state,
      trip.id.clone(),
      CargoInput {
        cargo_type: "Soja".to_string(),
        weight: 30.0,
        price_per_ton: 170.0,
        tax: Some(300.0),
      },
      None,
    )
    .unwrap();

    let summary = trip_summary(&state, trip.id).unwrap();
    assert!((summary.gross_freight - 5100.0).abs() < 1e-9);
    assert!((summary.net_freight - 4800.0).abs() < 1e-9);
    assert!((summary.commission - 480.0).abs() < 1e-9);
  }

  #[test]
  fn deleting_a_trip_cascades_children() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");
    add_cargo(
      &state,
      trip.id.clone(),
      CargoInput {
        cargo_type: "Soja".to_string(),
        weight: 30.0,
        price_per_ton: 170.0,
        tax: None,
      },
      None,
    )
    .unwrap();

    delete_trip(&state, trip.id, None).unwrap();
    let orphans: i64 = db::with_conn(&state.db, |conn| {
      Ok(conn.query_row("SELECT COUNT(*) FROM trip_cargo", [], |row| row.get(0))?)
    })
    .unwrap();
    assert_eq!(orphans, 0);
  }

  #[test]
  fn driver_with_trips_cannot_be_deleted() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    seed_trip(&state, &driver, &vehicle, "2024-03-05");

    assert_eq!(delete_driver(&state, driver.id, None).unwrap_err().http_status(), 409);
  }

  #[test]
  fn billing_report_breaks_down_per_vehicle() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");
    add_cargo(
      &state,
      trip.id.clone(),
      CargoInput {
        cargo_type: "Soja".to_string(),
        weight: 10.0,
        price_per_ton: 100.0,
        tax: None,
      },
      None,
    )
    .unwrap();
    create_fixed_expense(
      &state,
      FixedExpenseInput {
        vehicle_id: vehicle.id.clone(),
        description: "Seguro".to_string(),
        category: "Seguro".to_string(),
        total_amount: 1200.0,
        installments: 12,
        first_payment_date: "2024-01-10".to_string(),
      },
      None,
    )
    .unwrap();

    let report = billing_report(&state, "2024-03".to_string()).unwrap();
    assert_eq!(report.vehicles.len(), 1);
    let row = &report.vehicles[0];
    assert!((row.gross_revenue - 1000.0).abs() < 1e-9);
    assert!((row.fixed_expenses - 100.0).abs() < 1e-9);
    // commission 10% of net
    assert!((row.net_revenue - 900.0).abs() < 1e-9);
    assert!((report.final_profit - 800.0).abs() < 1e-9);
  }

  #[test]
  fn analysis_pipes_through_the_aggregator() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    let trip = seed_trip(&state, &driver, &vehicle, "2024-03-05");
    add_cargo(
      &state,
      trip.id,
      CargoInput {
        cargo_type: "Soja".to_string(),
        weight: 10.0,
        price_per_ton: 100.0,
        tax: None,
      },
      None,
    )
    .unwrap();

    let analysis =
      fleet_analysis(&state, "2024-01".to_string(), "2024-03".to_string(), None).unwrap();
    assert_eq!(analysis.series.labels, vec!["01/24", "02/24", "03/24"]);
    assert_eq!(analysis.series.revenue[2], 1000.0);
    assert_eq!(analysis.kpis.trip_count, 1);
  }

  #[test]
  fn overview_counts_active_rows() {
    let state = test_state();
    let driver = seed_driver(&state);
    let vehicle = seed_vehicle(&state);
    seed_trip(&state, &driver, &vehicle, "2024-03-05");

    let overview = fleet_overview(&state).unwrap();
    assert_eq!(overview.drivers, 1);
    assert_eq!(overview.vehicles, 1);
    assert_eq!(overview.trips_in_progress, 1);
  }
}
