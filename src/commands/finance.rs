use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;

use crate::audit::log::append_audit;
use crate::auth;
use crate::db;
use crate::domain::validation;
use crate::error::AppError;
use crate::models::*;
use crate::reports;
use crate::settings;
use crate::AppState;

fn payload_of<T: Serialize>(input: &T) -> String {
  serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string())
}

/// WHERE-clause builder shared by the four finance tables. Search is a LIKE
/// over the table's text columns, dates are an inclusive range.
struct Filter {
  conditions: Vec<String>,
  values: Vec<Value>,
}

impl Filter {
  fn new() -> Self {
    Self {
      conditions: Vec::new(),
      values: Vec::new(),
    }
  }

  fn search(mut self, query: &ListQuery, columns: &[&str]) -> Self {
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
      let like = format!("%{}%", search.trim());
      let clause = columns
        .iter()
        .map(|c| {
          self.values.push(Value::Text(like.clone()));
          format!("{} LIKE ?{}", c, self.values.len())
        })
        .collect::<Vec<_>>()
        .join(" OR ");
      self.conditions.push(format!("({clause})"));
    }
    self
  }

  fn date_range(mut self, query: &ListQuery, column: &str) -> Self {
    if let Some(start) = query.start_date.as_deref().filter(|s| !s.is_empty()) {
      self.values.push(Value::Text(start.to_string()));
      self.conditions.push(format!("{} >= ?{}", column, self.values.len()));
    }
    if let Some(end) = query.end_date.as_deref().filter(|s| !s.is_empty()) {
      self.values.push(Value::Text(end.to_string()));
      self.conditions.push(format!("{} <= ?{}", column, self.values.len()));
    }
    self
  }

  fn category(mut self, query: &ListQuery) -> Self {
    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
      self.values.push(Value::Text(category.to_string()));
      self.conditions.push(format!("categoria = ?{}", self.values.len()));
    }
    self
  }

  fn where_sql(&self) -> String {
    if self.conditions.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", self.conditions.join(" AND "))
    }
  }
}

fn page_window(conn: &Connection, page: i64) -> Result<(i64, i64), AppError> {
  let page_size = settings::get_settings(conn)?.page_size;
  let page = page.max(1);
  Ok((page_size, (page - 1) * page_size))
}

fn count_rows(conn: &Connection, table: &str, filter: &Filter) -> Result<i64, AppError> {
  let sql = format!("SELECT COUNT(*) FROM {}{}", table, filter.where_sql());
  Ok(conn.query_row(&sql, params_from_iter(filter.values.iter()), |row| row.get(0))?)
}

// --- Contas a pagar ---

fn contas_filter(query: &ListQuery) -> Filter {
  Filter::new()
    .search(query, &["descricao"])
    .date_range(query, "vencimento")
    .category(query)
}

pub fn list_contas_pagar(state: &AppState, query: ListQuery) -> Result<Paginated<ContaPagar>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = contas_filter(&query);
    let total = count_rows(conn, "contas_pagar", &filter)?;
    let (limit, offset) = page_window(conn, query.page)?;

    let sql = format!(
      "SELECT id, descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status
       FROM contas_pagar{} ORDER BY vencimento ASC, id ASC LIMIT {} OFFSET {}",
      filter.where_sql(),
      limit,
      offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(ContaPagar {
        id: row.get(0)?,
        descricao: row.get(1)?,
        valor_com_nota: row.get(2)?,
        valor_sem_nota: row.get(3)?,
        categoria: row.get(4)?,
        vencimento: row.get(5)?,
        status: row.get(6)?,
      })
    })?;
    Ok(Paginated {
      total,
      items: rows.filter_map(Result::ok).collect(),
    })
  })
}

pub fn create_conta_pagar(state: &AppState, input: ContaPagarInput, actor: Option<String>) -> Result<ContaPagar, AppError> {
  validation::parse_date(&input.vencimento)?;
  validation::ensure_not_blank(&input.descricao, "INVALID_DESCRIPTION", "Descricao obrigatoria")?;
  if input.valor_com_nota < 0.0 || input.valor_sem_nota < 0.0 {
    return Err(AppError::validation("INVALID_AMOUNT", "Valor deve ser > 0"));
  }
  validation::ensure_amount_positive(input.valor_com_nota + input.valor_sem_nota)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    conn.execute(
      "INSERT INTO contas_pagar (descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        input.descricao,
        input.valor_com_nota,
        input.valor_sem_nota,
        input.categoria,
        input.vencimento,
        input.status
      ],
    )?;
    let id = conn.last_insert_rowid();
    append_audit(conn, actor, "CREATE_CONTA_PAGAR", "CONTA_PAGAR", Some(id.to_string()), payload_json, None)?;
    Ok(ContaPagar {
      id,
      descricao: input.descricao,
      valor_com_nota: input.valor_com_nota,
      valor_sem_nota: input.valor_sem_nota,
      categoria: input.categoria,
      vencimento: input.vencimento,
      status: input.status,
    })
  })
}

pub fn update_conta_pagar(
  state: &AppState,
  id: i64,
  input: ContaPagarInput,
  actor: Option<String>,
) -> Result<ContaPagar, AppError> {
  validation::parse_date(&input.vencimento)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let updated = conn.execute(
      "UPDATE contas_pagar SET descricao = ?1, valor_com_nota = ?2, valor_sem_nota = ?3,
              categoria = ?4, vencimento = ?5, status = ?6 WHERE id = ?7",
      params![
        input.descricao,
        input.valor_com_nota,
        input.valor_sem_nota,
        input.categoria,
        input.vencimento,
        input.status,
        id
      ],
    )?;
    if updated == 0 {
      return Err(AppError::not_found("CONTA_NOT_FOUND", "Conta nao encontrada"));
    }
    append_audit(conn, actor, "UPDATE_CONTA_PAGAR", "CONTA_PAGAR", Some(id.to_string()), payload_json, None)?;
    Ok(ContaPagar {
      id,
      descricao: input.descricao,
      valor_com_nota: input.valor_com_nota,
      valor_sem_nota: input.valor_sem_nota,
      categoria: input.categoria,
      vencimento: input.vencimento,
      status: input.status,
    })
  })
}

pub fn delete_conta_pagar(state: &AppState, id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM contas_pagar WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("CONTA_NOT_FOUND", "Conta nao encontrada"));
    }
    append_audit(conn, actor, "DELETE_CONTA_PAGAR", "CONTA_PAGAR", Some(id.to_string()), "{}".to_string(), None)?;
    Ok(())
  })
}

pub fn total_contas_pagar(state: &AppState, query: ListQuery) -> Result<f64, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = contas_filter(&query);
    let sql = format!(
      "SELECT COALESCE(SUM(valor_com_nota + valor_sem_nota), 0) FROM contas_pagar{}",
      filter.where_sql()
    );
    Ok(conn.query_row(&sql, params_from_iter(filter.values.iter()), |row| row.get(0))?)
  })
}

// --- Fluxo de caixa ---

fn fluxo_filter(query: &ListQuery) -> Filter {
  Filter::new()
    .search(query, &["descricao"])
    .date_range(query, "data_movimento")
    .category(query)
}

pub fn list_fluxo_caixa(state: &AppState, query: ListQuery) -> Result<Paginated<FluxoCaixa>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = fluxo_filter(&query);
    let total = count_rows(conn, "fluxo_caixa", &filter)?;
    let (limit, offset) = page_window(conn, query.page)?;

    let sql = format!(
      "SELECT id, data_movimento, descricao, categoria, tipo_movimento, valor
       FROM fluxo_caixa{} ORDER BY data_movimento DESC, id DESC LIMIT {} OFFSET {}",
      filter.where_sql(),
      limit,
      offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FluxoCaixa {
        id: row.get(0)?,
        data_movimento: row.get(1)?,
        descricao: row.get(2)?,
        categoria: row.get(3)?,
        tipo_movimento: row.get(4)?,
        valor: row.get(5)?,
      })
    })?;
    Ok(Paginated {
      total,
      items: rows.filter_map(Result::ok).collect(),
    })
  })
}

pub fn create_fluxo_caixa(state: &AppState, input: FluxoCaixaInput, actor: Option<String>) -> Result<FluxoCaixa, AppError> {
  validation::parse_date(&input.data_movimento)?;
  validation::ensure_amount_positive(input.valor)?;
  if input.tipo_movimento != "ENTRADA" && input.tipo_movimento != "SAIDA" {
    return Err(AppError::validation("INVALID_MOVEMENT", "Tipo deve ser ENTRADA ou SAIDA"));
  }
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    conn.execute(
      "INSERT INTO fluxo_caixa (data_movimento, descricao, categoria, tipo_movimento, valor)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![input.data_movimento, input.descricao, input.categoria, input.tipo_movimento, input.valor],
    )?;
    let id = conn.last_insert_rowid();
    append_audit(conn, actor, "CREATE_FLUXO_CAIXA", "FLUXO_CAIXA", Some(id.to_string()), payload_json, None)?;
    Ok(FluxoCaixa {
      id,
      data_movimento: input.data_movimento,
      descricao: input.descricao,
      categoria: input.categoria,
      tipo_movimento: input.tipo_movimento,
      valor: input.valor,
    })
  })
}

pub fn update_fluxo_caixa(
  state: &AppState,
  id: i64,
  input: FluxoCaixaInput,
  actor: Option<String>,
) -> Result<FluxoCaixa, AppError> {
  validation::parse_date(&input.data_movimento)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let updated = conn.execute(
      "UPDATE fluxo_caixa SET data_movimento = ?1, descricao = ?2, categoria = ?3,
              tipo_movimento = ?4, valor = ?5 WHERE id = ?6",
      params![input.data_movimento, input.descricao, input.categoria, input.tipo_movimento, input.valor, id],
    )?;
    if updated == 0 {
      return Err(AppError::not_found("MOVIMENTO_NOT_FOUND", "Movimento nao encontrado"));
    }
    append_audit(conn, actor, "UPDATE_FLUXO_CAIXA", "FLUXO_CAIXA", Some(id.to_string()), payload_json, None)?;
    Ok(FluxoCaixa {
      id,
      data_movimento: input.data_movimento,
      descricao: input.descricao,
      categoria: input.categoria,
      tipo_movimento: input.tipo_movimento,
      valor: input.valor,
    })
  })
}

pub fn delete_fluxo_caixa(state: &AppState, id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM fluxo_caixa WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("MOVIMENTO_NOT_FOUND", "Movimento nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_FLUXO_CAIXA", "FLUXO_CAIXA", Some(id.to_string()), "{}".to_string(), None)?;
    Ok(())
  })
}

/// Signed balance under the current filters (ENTRADA adds, SAIDA subtracts).
pub fn total_fluxo_caixa(state: &AppState, query: ListQuery) -> Result<f64, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = fluxo_filter(&query);
    let sql = format!(
      "SELECT COALESCE(SUM(CASE WHEN tipo_movimento = 'ENTRADA' THEN valor ELSE -valor END), 0)
       FROM fluxo_caixa{}",
      filter.where_sql()
    );
    Ok(conn.query_row(&sql, params_from_iter(filter.values.iter()), |row| row.get(0))?)
  })
}

// --- Faturamento com NF ---

fn com_nf_filter(query: &ListQuery) -> Filter {
  Filter::new()
    .search(query, &["cliente", "nota_servico", "nota_peca"])
    .date_range(query, "data_faturamento")
}

pub fn list_faturamento_com_nf(
  state: &AppState,
  query: ListQuery,
) -> Result<Paginated<FaturamentoComNf>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = com_nf_filter(&query);
    let total = count_rows(conn, "faturamento_com_nf", &filter)?;
    let (limit, offset) = page_window(conn, query.page)?;

    let sql = format!(
      "SELECT id, data_faturamento, cliente, nota_servico, nota_peca, valor_total, parcelas, condicoes_pagamento
       FROM faturamento_com_nf{} ORDER BY data_faturamento DESC, id DESC LIMIT {} OFFSET {}",
      filter.where_sql(),
      limit,
      offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FaturamentoComNf {
        id: row.get(0)?,
        data_faturamento: row.get(1)?,
        cliente: row.get(2)?,
        nota_servico: row.get(3)?,
        nota_peca: row.get(4)?,
        valor_total: row.get(5)?,
        parcelas: row.get(6)?,
        condicoes_pagamento: row.get(7)?,
      })
    })?;
    Ok(Paginated {
      total,
      items: rows.filter_map(Result::ok).collect(),
    })
  })
}

pub fn create_faturamento_com_nf(
  state: &AppState,
  input: FaturamentoComNfInput,
  actor: Option<String>,
) -> Result<FaturamentoComNf, AppError> {
  validation::parse_date(&input.data_faturamento)?;
  validation::ensure_not_blank(&input.cliente, "INVALID_CLIENT", "Cliente obrigatorio")?;
  validation::ensure_amount_positive(input.valor_total)?;
  if input.parcelas < 1 {
    return Err(AppError::validation("INVALID_INSTALLMENTS", "Numero de parcelas deve ser >= 1"));
  }
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    conn.execute(
      "INSERT INTO faturamento_com_nf (data_faturamento, cliente, nota_servico, nota_peca, valor_total, parcelas, condicoes_pagamento)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      params![
        input.data_faturamento,
        input.cliente,
        input.nota_servico,
        input.nota_peca,
        input.valor_total,
        input.parcelas,
        input.condicoes_pagamento
      ],
    )?;
    let id = conn.last_insert_rowid();
    append_audit(conn, actor, "CREATE_FATURAMENTO_COM_NF", "FATURAMENTO_COM_NF", Some(id.to_string()), payload_json, None)?;
    Ok(FaturamentoComNf {
      id,
      data_faturamento: input.data_faturamento,
      cliente: input.cliente,
      nota_servico: input.nota_servico,
      nota_peca: input.nota_peca,
      valor_total: input.valor_total,
      parcelas: input.parcelas,
      condicoes_pagamento: input.condicoes_pagamento,
    })
  })
}

pub fn update_faturamento_com_nf(
  state: &AppState,
  id: i64,
  input: FaturamentoComNfInput,
  actor: Option<String>,
) -> Result<FaturamentoComNf, AppError> {
  validation::parse_date(&input.data_faturamento)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let updated = conn.execute(
      "UPDATE faturamento_com_nf SET data_faturamento = ?1, cliente = ?2, nota_servico = ?3,
              nota_peca = ?4, valor_total = ?5, parcelas = ?6, condicoes_pagamento = ?7 WHERE id = ?8",
      params![
        input.data_faturamento,
        input.cliente,
        input.nota_servico,
        input.nota_peca,
        input.valor_total,
        input.parcelas,
        input.condicoes_pagamento,
        id
      ],
    )?;
    if updated == 0 {
      return Err(AppError::not_found("FATURAMENTO_NOT_FOUND", "Faturamento nao encontrado"));
    }
    append_audit(conn, actor, "UPDATE_FATURAMENTO_COM_NF", "FATURAMENTO_COM_NF", Some(id.to_string()), payload_json, None)?;
    Ok(FaturamentoComNf {
      id,
      data_faturamento: input.data_faturamento,
      cliente: input.cliente,
      nota_servico: input.nota_servico,
      nota_peca: input.nota_peca,
      valor_total: input.valor_total,
      parcelas: input.parcelas,
      condicoes_pagamento: input.condicoes_pagamento,
    })
  })
}

pub fn delete_faturamento_com_nf(state: &AppState, id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM faturamento_com_nf WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("FATURAMENTO_NOT_FOUND", "Faturamento nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_FATURAMENTO_COM_NF", "FATURAMENTO_COM_NF", Some(id.to_string()), "{}".to_string(), None)?;
    Ok(())
  })
}

pub fn total_faturamento_com_nf(state: &AppState, query: ListQuery) -> Result<f64, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = com_nf_filter(&query);
    let sql = format!(
      "SELECT COALESCE(SUM(valor_total), 0) FROM faturamento_com_nf{}",
      filter.where_sql()
    );
    Ok(conn.query_row(&sql, params_from_iter(filter.values.iter()), |row| row.get(0))?)
  })
}

// --- Faturamento sem NF ---

fn sem_nf_filter(query: &ListQuery) -> Filter {
  Filter::new()
    .search(query, &["numero_orcamento"])
    .date_range(query, "data_faturamento")
    .category(query)
}

pub fn list_faturamento_sem_nf(
  state: &AppState,
  query: ListQuery,
) -> Result<Paginated<FaturamentoSemNf>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = sem_nf_filter(&query);
    let total = count_rows(conn, "faturamento_sem_nf", &filter)?;
    let (limit, offset) = page_window(conn, query.page)?;

    let sql = format!(
      "SELECT id, data_faturamento, numero_orcamento, valor_total, condicao_pagamento, categoria
       FROM faturamento_sem_nf{} ORDER BY data_faturamento DESC, id DESC LIMIT {} OFFSET {}",
      filter.where_sql(),
      limit,
      offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FaturamentoSemNf {
        id: row.get(0)?,
        data_faturamento: row.get(1)?,
        numero_orcamento: row.get(2)?,
        valor_total: row.get(3)?,
        condicao_pagamento: row.get(4)?,
        categoria: row.get(5)?,
      })
    })?;
    Ok(Paginated {
      total,
      items: rows.filter_map(Result::ok).collect(),
    })
  })
}

pub fn create_faturamento_sem_nf(
  state: &AppState,
  input: FaturamentoSemNfInput,
  actor: Option<String>,
) -> Result<FaturamentoSemNf, AppError> {
  validation::parse_date(&input.data_faturamento)?;
  validation::ensure_amount_positive(input.valor_total)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    conn.execute(
      "INSERT INTO faturamento_sem_nf (data_faturamento, numero_orcamento, valor_total, condicao_pagamento, categoria)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        input.data_faturamento,
        input.numero_orcamento,
        input.valor_total,
        input.condicao_pagamento,
        input.categoria
      ],
    )?;
    let id = conn.last_insert_rowid();
    append_audit(conn, actor, "CREATE_FATURAMENTO_SEM_NF", "FATURAMENTO_SEM_NF", Some(id.to_string()), payload_json, None)?;
    Ok(FaturamentoSemNf {
      id,
      data_faturamento: input.data_faturamento,
      numero_orcamento: input.numero_orcamento,
      valor_total: input.valor_total,
      condicao_pagamento: input.condicao_pagamento,
      categoria: input.categoria,
    })
  })
}

pub fn update_faturamento_sem_nf(
  state: &AppState,
  id: i64,
  input: FaturamentoSemNfInput,
  actor: Option<String>,
) -> Result<FaturamentoSemNf, AppError> {
  validation::parse_date(&input.data_faturamento)?;
  let payload_json = payload_of(&input);

  db::with_conn(&state.db, |conn| {
    let updated = conn.execute(
      "UPDATE faturamento_sem_nf SET data_faturamento = ?1, numero_orcamento = ?2,
              valor_total = ?3, condicao_pagamento = ?4, categoria = ?5 WHERE id = ?6",
      params![
        input.data_faturamento,
        input.numero_orcamento,
        input.valor_total,
        input.condicao_pagamento,
        input.categoria,
        id
      ],
    )?;
    if updated == 0 {
      return Err(AppError::not_found("FATURAMENTO_NOT_FOUND", "Faturamento nao encontrado"));
    }
    append_audit(conn, actor, "UPDATE_FATURAMENTO_SEM_NF", "FATURAMENTO_SEM_NF", Some(id.to_string()), payload_json, None)?;
    Ok(FaturamentoSemNf {
      id,
      data_faturamento: input.data_faturamento,
      numero_orcamento: input.numero_orcamento,
      valor_total: input.valor_total,
      condicao_pagamento: input.condicao_pagamento,
      categoria: input.categoria,
    })
  })
}

pub fn delete_faturamento_sem_nf(state: &AppState, id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM faturamento_sem_nf WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("FATURAMENTO_NOT_FOUND", "Faturamento nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_FATURAMENTO_SEM_NF", "FATURAMENTO_SEM_NF", Some(id.to_string()), "{}".to_string(), None)?;
    Ok(())
  })
}

pub fn total_faturamento_sem_nf(state: &AppState, query: ListQuery) -> Result<f64, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = sem_nf_filter(&query);
    let sql = format!(
      "SELECT COALESCE(SUM(valor_total), 0) FROM faturamento_sem_nf{}",
      filter.where_sql()
    );
    Ok(conn.query_row(&sql, params_from_iter(filter.values.iter()), |row| row.get(0))?)
  })
}

// --- Export queries (no page window, same filters and ordering) ---

pub fn export_contas_pagar(state: &AppState, query: ListQuery) -> Result<Vec<ContaPagar>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = contas_filter(&query);
    let sql = format!(
      "SELECT id, descricao, valor_com_nota, valor_sem_nota, categoria, vencimento, status
       FROM contas_pagar{} ORDER BY vencimento ASC, id ASC",
      filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(ContaPagar {
        id: row.get(0)?,
        descricao: row.get(1)?,
        valor_com_nota: row.get(2)?,
        valor_sem_nota: row.get(3)?,
        categoria: row.get(4)?,
        vencimento: row.get(5)?,
        status: row.get(6)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn export_fluxo_caixa(state: &AppState, query: ListQuery) -> Result<Vec<FluxoCaixa>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = fluxo_filter(&query);
    let sql = format!(
      "SELECT id, data_movimento, descricao, categoria, tipo_movimento, valor
       FROM fluxo_caixa{} ORDER BY data_movimento DESC, id DESC",
      filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FluxoCaixa {
        id: row.get(0)?,
        data_movimento: row.get(1)?,
        descricao: row.get(2)?,
        categoria: row.get(3)?,
        tipo_movimento: row.get(4)?,
        valor: row.get(5)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn export_faturamento_com_nf(
  state: &AppState,
  query: ListQuery,
) -> Result<Vec<FaturamentoComNf>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = com_nf_filter(&query);
    let sql = format!(
      "SELECT id, data_faturamento, cliente, nota_servico, nota_peca, valor_total, parcelas, condicoes_pagamento
       FROM faturamento_com_nf{} ORDER BY data_faturamento DESC, id DESC",
      filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FaturamentoComNf {
        id: row.get(0)?,
        data_faturamento: row.get(1)?,
        cliente: row.get(2)?,
        nota_servico: row.get(3)?,
        nota_peca: row.get(4)?,
        valor_total: row.get(5)?,
        parcelas: row.get(6)?,
        condicoes_pagamento: row.get(7)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn export_faturamento_sem_nf(
  state: &AppState,
  query: ListQuery,
) -> Result<Vec<FaturamentoSemNf>, AppError> {
  db::with_conn(&state.db, |conn| {
    let filter = sem_nf_filter(&query);
    let sql = format!(
      "SELECT id, data_faturamento, numero_orcamento, valor_total, condicao_pagamento, categoria
       FROM faturamento_sem_nf{} ORDER BY data_faturamento DESC, id DESC",
      filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |row| {
      Ok(FaturamentoSemNf {
        id: row.get(0)?,
        data_faturamento: row.get(1)?,
        numero_orcamento: row.get(2)?,
        valor_total: row.get(3)?,
        condicao_pagamento: row.get(4)?,
        categoria: row.get(5)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

// --- Dashboard ---

pub fn dashboard(state: &AppState, start: String, end: String) -> Result<FinanceDashboard, AppError> {
  validation::parse_date(&start)?;
  validation::parse_date(&end)?;
  db::with_conn(&state.db, |conn| reports::finance_dashboard(conn, &start, &end))
}

// --- Usuarios do sistema ---

pub fn list_usuarios(state: &AppState) -> Result<Vec<Usuario>, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut stmt = conn.prepare("SELECT id, nome FROM usuarios_sistema ORDER BY nome")?;
    let rows = stmt.query_map([], |row| {
      Ok(Usuario {
        id: row.get(0)?,
        nome: row.get(1)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}

pub fn create_usuario(state: &AppState, input: UsuarioInput, actor: Option<String>) -> Result<Usuario, AppError> {
  validation::ensure_not_blank(&input.nome, "INVALID_NAME", "Nome obrigatorio")?;
  validation::ensure_password_length(&input.password)?;
  let hash = auth::hash_password(&input.password)?;

  db::with_conn(&state.db, |conn| {
    let nome = input.nome.trim().to_uppercase();
    let exists: i64 = conn.query_row(
      "SELECT COUNT(*) FROM usuarios_sistema WHERE UPPER(nome) = ?1",
      params![nome],
      |row| row.get(0),
    )?;
    if exists > 0 {
      return Err(AppError::conflict("DUPLICATE_USER", "Ja existe usuario com este nome"));
    }

    conn.execute(
      "INSERT INTO usuarios_sistema (nome, senha_hash) VALUES (?1, ?2)",
      params![nome, hash],
    )?;
    let id = conn.last_insert_rowid();
    append_audit(
      conn,
      actor,
      "CREATE_USUARIO",
      "USUARIO",
      Some(id.to_string()),
      format!("{{\"nome\":{}}}", serde_json::to_string(&nome).unwrap_or_default()),
      None,
    )?;
    Ok(Usuario { id, nome })
  })
}

pub fn delete_usuario(state: &AppState, id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let deleted = conn.execute("DELETE FROM usuarios_sistema WHERE id = ?1", params![id])?;
    if deleted == 0 {
      return Err(AppError::not_found("USER_NOT_FOUND", "Usuario nao encontrado"));
    }
    append_audit(conn, actor, "DELETE_USUARIO", "USUARIO", Some(id.to_string()), "{}".to_string(), None)?;
    Ok(())
  })
}

// --- Audit listing ---

pub fn list_audit(state: &AppState, limit: i64) -> Result<Vec<AuditLogEntry>, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut stmt = conn.prepare(
      "SELECT id, ts, actor, action, entity_type, entity_id, payload_json, details
       FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit.clamp(1, 500)], |row| {
      Ok(AuditLogEntry {
        id: row.get(0)?,
        ts: row.get(1)?,
        actor: row.get(2)?,
        action: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        payload_json: row.get(6)?,
        details: row.get(7)?,
      })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
  })
}
