use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};

use centraltruck_backoffice::auth;
use centraltruck_backoffice::db;
use centraltruck_backoffice::error::AppError;
use centraltruck_backoffice::reports;
use centraltruck_backoffice::settings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let trip_count = std::env::args()
    .nth(1)
    .and_then(|value| value.parse::<usize>().ok())
    .unwrap_or(60);

  let app_dir = db::resolve_app_dir()?;
  let db = db::init_db(&app_dir)?;
  let created = db::with_conn(&db, |conn| seed_demo_data(conn, trip_count))?;

  println!("Seeded {} viagens em {}", created, app_dir.display());
  Ok(())
}

fn seed_demo_data(conn: &mut Connection, trip_count: usize) -> Result<usize, AppError> {
  let year = settings::get_settings(conn)?.current_year;
  let mut rng = MockRng::new(Utc::now().timestamp_millis() as u64);
  let now = Utc::now().to_rfc3339();

  let driver_names = ["CARLOS", "MARCOS", "ANTONIO"];
  let mut driver_ids = Vec::new();
  for name in driver_names {
    let id = db::generate_id(20);
    let hash = auth::hash_password("senha123")?;
    conn.execute(
      "INSERT INTO drivers (id, name, cnh, phone, status, password_hash, created_at)
       VALUES (?1, ?2, ?3, ?4, 'ACTIVE', ?5, ?6)",
      params![id, name, format!("{:011}", rng.next_u32()), "41999990000", hash, now],
    )?;
    driver_ids.push(id);
  }

  let plates = ["ABC1D23", "DEF4G56", "GHI7J89"];
  let models = ["Scania R450", "Volvo FH 540", "Mercedes Actros"];
  let mut vehicle_ids = Vec::new();
  for (plate, model) in plates.iter().zip(models) {
    let id = db::generate_id(20);
    conn.execute(
      "INSERT INTO vehicles (id, plate, model, chassi, status, created_at)
       VALUES (?1, ?2, ?3, ?4, 'ACTIVE', ?5)",
      params![id, plate, model, format!("9BW{:014}", rng.next_u32()), now],
    )?;
    vehicle_ids.push(id);
  }

  let cargo_types = ["Soja", "Milho", "Fertilizante", "Calcario"];
  let stations = ["Posto BR", "Posto Ipiranga", "Posto Shell"];
  let expense_categories = ["Pedagio", "Alimentacao", "Estadia", "Manutencao"];

  let tx = conn.transaction()?;
  for _ in 0..trip_count {
    let driver_id = &driver_ids[(rng.next_u32() as usize) % driver_ids.len()];
    let vehicle_id = &vehicle_ids[(rng.next_u32() as usize) % vehicle_ids.len()];
    let month = rng.next_u32() % 12 + 1;
    let day = rng.next_u32() % 28 + 1;
    let start_date = date_str(year, month, day);

    let start_km = 50_000.0 + (rng.next_u32() % 400_000) as f64;
    let distance = 200.0 + (rng.next_u32() % 1_500) as f64;
    let completed = rng.next_u32() % 100 < 80;
    let trip_id = db::generate_id(20);

    let monthly_number: i64 = tx.query_row(
      "SELECT COUNT(*) FROM trips WHERE driver_id = ?1 AND start_date LIKE ?2",
      params![driver_id, format!("{year}-{month:02}-%")],
      |row| row.get(0),
    )?;

    tx.execute(
      "INSERT INTO trips (id, driver_id, vehicle_id, origin, destination, start_date, end_date,
                          start_km, end_km, status, commission_rate, monthly_trip_number,
                          signature_confirmed, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
      params![
        trip_id,
        driver_id,
        vehicle_id,
        "Curitiba",
        "Paranagua",
        start_date,
        if completed { Some(date_str(year, month, (day + 2).min(28))) } else { None },
        start_km,
        if completed { start_km + distance } else { 0.0 },
        if completed { "COMPLETED" } else { "IN_PROGRESS" },
        10.0,
        monthly_number + 1,
        if completed && rng.next_u32() % 2 == 0 { 1 } else { 0 },
        now
      ],
    )?;

    let weight = 20.0 + (rng.next_u32() % 15) as f64;
    let price = 120.0 + (rng.next_u32() % 120) as f64;
    tx.execute(
      "INSERT INTO trip_cargo (id, trip_id, cargo_type, weight, price_per_ton, tax) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        db::generate_id(20),
        trip_id,
        cargo_types[(rng.next_u32() as usize) % cargo_types.len()],
        weight,
        price,
        if rng.next_u32() % 2 == 0 { Some(weight * 8.0) } else { None }
      ],
    )?;

    if completed {
      tx.execute(
        "INSERT INTO trip_fuelings (id, trip_id, station, date, km, liters, total_amount, payment_method)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          db::generate_id(20),
          trip_id,
          stations[(rng.next_u32() as usize) % stations.len()],
          start_date,
          start_km + distance / 2.0,
          distance / 2.5,
          (distance / 2.5) * 5.8,
          "Cartao"
        ],
      )?;
      tx.execute(
        "INSERT INTO trip_expenses (id, trip_id, category, description, amount, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
          db::generate_id(20),
          trip_id,
          expense_categories[(rng.next_u32() as usize) % expense_categories.len()],
          "Despesa de viagem",
          50.0 + (rng.next_u32() % 300) as f64,
          start_date
        ],
      )?;
      tx.execute(
        "INSERT INTO trip_payments (id, trip_id, pay_type, method, amount, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
          db::generate_id(20),
          trip_id,
          "Adiantamento",
          "Pix",
          weight * price * 0.4,
          start_date
        ],
      )?;
    }
  }

  for vehicle_id in &vehicle_ids {
    tx.execute(
      "INSERT INTO fixed_expenses (id, vehicle_id, description, category, total_amount, installments, first_payment_date, created_at)
       VALUES (?1, ?2, 'Seguro anual', 'Seguro', ?3, 12, ?4, ?5)",
      params![db::generate_id(20), vehicle_id, 6000.0 + (rng.next_u32() % 6000) as f64, date_str(year, 1, 10), now],
    )?;
    tx.execute(
      "INSERT INTO workshop_expenses (id, vehicle_id, description, service_date, first_payment_date, total_amount, installments, created_at)
       VALUES (?1, ?2, 'Revisao geral', ?3, ?4, ?5, 3, ?6)",
      params![
        db::generate_id(20),
        vehicle_id,
        date_str(year, rng.next_u32() % 12 + 1, 15),
        date_str(year, rng.next_u32() % 12 + 1, 15),
        1500.0 + (rng.next_u32() % 4500) as f64,
        now
      ],
    )?;
  }

  for month in 1..=12u32 {
    for _ in 0..4 {
      let categoria = reports::CATEGORIAS_CONTAS_PAGAR
        [(rng.next_u32() as usize) % reports::CATEGORIAS_CONTAS_PAGAR.len()];
      tx.execute(
        "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
          format!("Demo: {categoria}"),
          (rng.next_u32() % 3000) as f64,
          (rng.next_u32() % 1000) as f64,
          categoria,
          date_str(year, month, rng.next_u32() % 28 + 1),
          if rng.next_u32() % 100 < 60 { "PAGO" } else { "PENDENTE" }
        ],
      )?;

      let tipo = if rng.next_u32() % 2 == 0 { "ENTRADA" } else { "SAIDA" };
      let fluxo_categoria = reports::CATEGORIAS_FLUXO_CAIXA
        [(rng.next_u32() as usize) % reports::CATEGORIAS_FLUXO_CAIXA.len()];
      tx.execute(
        "INSERT INTO fluxo_caixa (data_movimento, descricao, categoria, tipo_movimento, valor)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          date_str(year, month, rng.next_u32() % 28 + 1),
          format!("Demo: movimento {fluxo_categoria}"),
          fluxo_categoria,
          tipo,
          100.0 + (rng.next_u32() % 5000) as f64
        ],
      )?;

      tx.execute(
        "INSERT INTO faturamento_com_nf (data_faturamento, cliente, nota_servico, nota_peca, valor_total, parcelas, condicoes_pagamento)
         VALUES (?1, ?2, ?3, NULL, ?4, ?5, '30 dias')",
        params![
          date_str(year, month, rng.next_u32() % 28 + 1),
          format!("Transportadora {}", rng.next_u32() % 90 + 10),
          format!("NF-{:05}", rng.next_u32() % 100_000),
          500.0 + (rng.next_u32() % 10_000) as f64,
          rng.next_u32() % 3 + 1
        ],
      )?;

      let sem_nf_categoria =
        reports::CATEGORIAS_SEM_NF[(rng.next_u32() as usize) % reports::CATEGORIAS_SEM_NF.len()];
      tx.execute(
        "INSERT INTO faturamento_sem_nf (data_faturamento, numero_orcamento, valor_total, condicao_pagamento, categoria)
         VALUES (?1, ?2, ?3, 'A vista', ?4)",
        params![
          date_str(year, month, rng.next_u32() % 28 + 1),
          format!("ORC-{:05}", rng.next_u32() % 100_000),
          200.0 + (rng.next_u32() % 4000) as f64,
          sem_nf_categoria
        ],
      )?;
    }
  }

  tx.commit()?;
  Ok(trip_count)
}

fn date_str(year: i32, month: u32, day: u32) -> String {
  NaiveDate::from_ymd_opt(year, month, day)
    .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default())
    .format("%Y-%m-%d")
    .to_string()
}

struct MockRng {
  state: u64,
}

impl MockRng {
  fn new(seed: u64) -> Self {
    Self { state: seed }
  }

  fn next_u32(&mut self) -> u32 {
    self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
    (self.state >> 32) as u32
  }
}
