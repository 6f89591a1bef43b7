use chrono::{Datelike, Months, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::domain::aggregate::month_label;
use crate::error::AppError;
use crate::models::{CategoryTotal, FinanceDashboard};

pub const CATEGORIAS_CONTAS_PAGAR: &[&str] = &[
  "CONSÓRCIO",
  "DESPESAS FIXAS",
  "DIVERSOS",
  "DOAÇÃO",
  "FERRAMENTAS",
  "IMPOSTOS",
  "FORNECEDOR",
  "PEÇAS USADAS",
  "SALÁRIO",
  "TERCEIRIZADO",
  "TERRENO",
];

pub const CATEGORIAS_FLUXO_CAIXA: &[&str] = &[
  "CONSÓRCIO",
  "DESPESAS FIXAS",
  "DIVERSOS",
  "DOAÇÃO",
  "FERRAMENTAS",
  "IMPOSTOS",
  "FORNECEDOR",
  "PEÇAS USADAS",
  "SALÁRIO",
  "TERCEIRIZADO",
  "TERRENO",
  "TRANSPORTADORA",
  "BANCO",
];

pub const CATEGORIAS_SEM_NF: &[&str] = &[
  "FATURAMENTO",
  "RETORNO",
  "INTERNO",
  "GARANTIA",
  "CORTESIA",
  "CENTRAL TRUCK",
];

// Sem-NF categories that add to liquid revenue; everything else subtracts.
const SEM_NF_POSITIVAS: &[&str] = &["FATURAMENTO", "CENTRAL TRUCK"];

fn sum_com_nf(conn: &Connection, start: &str, end: &str) -> Result<f64, AppError> {
  Ok(conn.query_row(
    "SELECT COALESCE(SUM(valor_total), 0) FROM faturamento_com_nf
     WHERE data_faturamento BETWEEN ?1 AND ?2",
    params![start, end],
    |row| row.get(0),
  )?)
}

/// Liquid sem-NF revenue: billable categories add, courtesy/warranty/internal
/// work subtracts its cost.
fn sum_sem_nf_liquido(conn: &Connection, start: &str, end: &str) -> Result<f64, AppError> {
  let mut stmt = conn.prepare(
    "SELECT categoria, COALESCE(SUM(valor_total), 0) FROM faturamento_sem_nf
     WHERE data_faturamento BETWEEN ?1 AND ?2
     GROUP BY categoria",
  )?;
  let rows = stmt.query_map(params![start, end], |row| {
    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
  })?;

  let mut total = 0.0;
  for row in rows {
    let (categoria, valor) = row?;
    if SEM_NF_POSITIVAS.contains(&categoria.as_str()) {
      total += valor;
    } else {
      total -= valor;
    }
  }
  Ok(total)
}

fn sum_fluxo_balance(conn: &Connection, start: &str, end: &str) -> Result<f64, AppError> {
  Ok(conn.query_row(
    "SELECT COALESCE(SUM(CASE WHEN tipo_movimento = 'ENTRADA' THEN valor ELSE -valor END), 0)
     FROM fluxo_caixa WHERE data_movimento BETWEEN ?1 AND ?2",
    params![start, end],
    |row| row.get(0),
  )?)
}

fn sum_contas_pagar(conn: &Connection, start: &str, end: &str) -> Result<f64, AppError> {
  Ok(conn.query_row(
    "SELECT COALESCE(SUM(valor_com_nota + valor_sem_nota), 0) FROM contas_pagar
     WHERE vencimento BETWEEN ?1 AND ?2",
    params![start, end],
    |row| row.get(0),
  )?)
}

/// Overdue and still-pending totals ignore the period filter on purpose: an
/// unpaid bill from last year is still a liability today.
fn sum_contas_by_state(conn: &Connection, today: &str) -> Result<(f64, f64), AppError> {
  Ok(conn.query_row(
    "SELECT
        COALESCE(SUM(CASE WHEN status = 'PENDENTE' AND vencimento < ?1
                          THEN valor_com_nota + valor_sem_nota END), 0),
        COALESCE(SUM(CASE WHEN status = 'PENDENTE'
                          THEN valor_com_nota + valor_sem_nota END), 0)
     FROM contas_pagar",
    params![today],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?)
}

fn top_expense_categories(
  conn: &Connection,
  start: &str,
  end: &str,
  limit: i64,
) -> Result<Vec<CategoryTotal>, AppError> {
  let mut stmt = conn.prepare(
    "SELECT categoria, COALESCE(SUM(valor_com_nota + valor_sem_nota), 0) AS total
     FROM contas_pagar
     WHERE vencimento BETWEEN ?1 AND ?2
     GROUP BY categoria
     ORDER BY total DESC
     LIMIT ?3",
  )?;
  let rows = stmt.query_map(params![start, end, limit], |row| {
    Ok(CategoryTotal {
      categoria: row.get(0)?,
      total: row.get(1)?,
    })
  })?;
  Ok(rows.filter_map(Result::ok).collect())
}

fn month_window(reference: NaiveDate, index_back: u32) -> Option<(String, String, String)> {
  let first = NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1)?;
  let start = first.checked_sub_months(Months::new(index_back))?;
  let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
  Some((
    month_label(start.year(), start.month()),
    start.format("%Y-%m-%d").to_string(),
    end.format("%Y-%m-%d").to_string(),
  ))
}

/// KPI block for the finance dashboard over `[start, end]` (YYYY-MM-DD,
/// inclusive), plus the trailing-12-month billing evolution ending at `today`.
pub fn finance_dashboard(
  conn: &Connection,
  start: &str,
  end: &str,
) -> Result<FinanceDashboard, AppError> {
  let faturamento_com_nf = sum_com_nf(conn, start, end)?;
  let faturamento_sem_nf_liquido = sum_sem_nf_liquido(conn, start, end)?;
  let faturamento_total = faturamento_com_nf + faturamento_sem_nf_liquido;
  let balanco_caixa = sum_fluxo_balance(conn, start, end)?;
  let contas_pagar_total = sum_contas_pagar(conn, start, end)?;

  let today = Utc::now().date_naive();
  let (contas_vencidas_total, contas_pendentes_total) =
    sum_contas_by_state(conn, &today.format("%Y-%m-%d").to_string())?;

  let top_despesas = top_expense_categories(conn, start, end, 5)?;

  let mut evolucao_labels = Vec::with_capacity(12);
  let mut evolucao_com_nf = Vec::with_capacity(12);
  let mut evolucao_sem_nf = Vec::with_capacity(12);
  for back in (0..12).rev() {
    if let Some((label, month_start, month_end)) = month_window(today, back) {
      evolucao_labels.push(label);
      evolucao_com_nf.push(sum_com_nf(conn, &month_start, &month_end)?);
      evolucao_sem_nf.push(sum_sem_nf_liquido(conn, &month_start, &month_end)?);
    }
  }

  Ok(FinanceDashboard {
    faturamento_com_nf,
    faturamento_sem_nf_liquido,
    faturamento_total,
    balanco_caixa,
    contas_pagar_total,
    contas_vencidas_total,
    contas_pendentes_total,
    lucro_previsto: faturamento_total - contas_pagar_total,
    top_despesas,
    evolucao_labels,
    evolucao_com_nf,
    evolucao_sem_nf,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::open_test_db;

  fn insert_sem_nf(conn: &Connection, date: &str, categoria: &str, valor: f64) {
    conn
      .execute(
        "INSERT INTO faturamento_sem_nf (data_faturamento, valor_total, categoria) VALUES (?1, ?2, ?3)",
        params![date, valor, categoria],
      )
      .unwrap();
  }

  #[test]
  fn sem_nf_liquid_revenue_subtracts_non_billable_categories() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    insert_sem_nf(&conn, "2024-05-10", "FATURAMENTO", 1000.0);
    insert_sem_nf(&conn, "2024-05-11", "CENTRAL TRUCK", 200.0);
    insert_sem_nf(&conn, "2024-05-12", "GARANTIA", 300.0);
    insert_sem_nf(&conn, "2024-05-13", "CORTESIA", 100.0);

    let total = sum_sem_nf_liquido(&conn, "2024-05-01", "2024-05-31").unwrap();
    assert!((total - 800.0).abs() < 1e-9);
  }

  #[test]
  fn overdue_bills_ignore_the_period_filter() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    conn
      .execute(
        "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
         VALUES ('Fornecedor antigo', 500.0, 0.0, 'FORNECEDOR', '2020-01-10', 'PENDENTE')",
        [],
      )
      .unwrap();
    conn
      .execute(
        "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
         VALUES ('Ja paga', 900.0, 0.0, 'IMPOSTOS', '2020-01-10', 'PAGO')",
        [],
      )
      .unwrap();

    let (vencidas, pendentes) = sum_contas_by_state(&conn, "2024-05-01").unwrap();
    assert!((vencidas - 500.0).abs() < 1e-9);
    assert!((pendentes - 500.0).abs() < 1e-9);
  }

  #[test]
  fn dashboard_profit_is_billing_minus_bills() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    conn
      .execute(
        "INSERT INTO faturamento_com_nf (data_faturamento, cliente, valor_total, parcelas)
         VALUES ('2024-05-10', 'Transportadora X', 2000.0, 1)",
        [],
      )
      .unwrap();
    conn
      .execute(
        "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
         VALUES ('Pecas', 300.0, 200.0, 'FORNECEDOR', '2024-05-20', 'PENDENTE')",
        [],
      )
      .unwrap();

    let dash = finance_dashboard(&conn, "2024-05-01", "2024-05-31").unwrap();
    assert!((dash.faturamento_total - 2000.0).abs() < 1e-9);
    assert!((dash.contas_pagar_total - 500.0).abs() < 1e-9);
    assert!((dash.lucro_previsto - 1500.0).abs() < 1e-9);
    assert_eq!(dash.evolucao_labels.len(), 12);
  }

  #[test]
  fn top_categories_are_ranked_by_total() {
    let db = open_test_db();
    let conn = db.conn.lock().unwrap();
    for (categoria, valor) in [("SALÁRIO", 3000.0), ("FORNECEDOR", 5000.0), ("IMPOSTOS", 1000.0)] {
      conn
        .execute(
          "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
           VALUES ('x', ?1, 0.0, ?2, '2024-05-10', 'PENDENTE')",
          params![valor, categoria],
        )
        .unwrap();
    }
    let top = top_expense_categories(&conn, "2024-05-01", "2024-05-31", 5).unwrap();
    assert_eq!(top[0].categoria, "FORNECEDOR");
    assert_eq!(top.len(), 3);
  }
}
