use crate::models::{ContaPagar, FaturamentoComNf, FaturamentoSemNf, FluxoCaixa};

/// CSV renditions of the finance listings, served as downloads. Rows follow
/// the same order the listing endpoints return.
pub fn contas_pagar_csv(rows: &[ContaPagar]) -> String {
  let mut out = String::from("id,descricao,valor_com_nota,valor_sem_nota,categoria,vencimento,status\n");
  for row in rows {
    out.push_str(&format!(
      "{},{},{},{},{},{},{}\n",
      row.id,
      escape_csv(&row.descricao),
      row.valor_com_nota,
      row.valor_sem_nota,
      escape_csv(&row.categoria),
      escape_csv(&row.vencimento),
      escape_csv(&row.status)
    ));
  }
  out
}

pub fn fluxo_caixa_csv(rows: &[FluxoCaixa]) -> String {
  let mut out = String::from("id,data_movimento,descricao,categoria,tipo_movimento,valor\n");
  for row in rows {
    out.push_str(&format!(
      "{},{},{},{},{},{}\n",
      row.id,
      escape_csv(&row.data_movimento),
      escape_csv(&row.descricao),
      escape_csv(&row.categoria),
      escape_csv(&row.tipo_movimento),
      row.valor
    ));
  }
  out
}

pub fn faturamento_com_nf_csv(rows: &[FaturamentoComNf]) -> String {
  let mut out = String::from(
    "id,data_faturamento,cliente,nota_servico,nota_peca,valor_total,parcelas,condicoes_pagamento\n",
  );
  for row in rows {
    out.push_str(&format!(
      "{},{},{},{},{},{},{},{}\n",
      row.id,
      escape_csv(&row.data_faturamento),
      escape_csv(&row.cliente),
      escape_csv(row.nota_servico.as_deref().unwrap_or("")),
      escape_csv(row.nota_peca.as_deref().unwrap_or("")),
      row.valor_total,
      row.parcelas,
      escape_csv(row.condicoes_pagamento.as_deref().unwrap_or(""))
    ));
  }
  out
}

pub fn faturamento_sem_nf_csv(rows: &[FaturamentoSemNf]) -> String {
  let mut out =
    String::from("id,data_faturamento,numero_orcamento,valor_total,condicao_pagamento,categoria\n");
  for row in rows {
    out.push_str(&format!(
      "{},{},{},{},{},{}\n",
      row.id,
      escape_csv(&row.data_faturamento),
      escape_csv(row.numero_orcamento.as_deref().unwrap_or("")),
      row.valor_total,
      escape_csv(row.condicao_pagamento.as_deref().unwrap_or("")),
      escape_csv(&row.categoria)
    ));
  }
  out
}

fn escape_csv(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quotes_fields_with_separators() {
    assert_eq!(escape_csv("simples"), "simples");
    assert_eq!(escape_csv("a,b"), "\"a,b\"");
    assert_eq!(escape_csv("diz \"oi\""), "\"diz \"\"oi\"\"\"");
  }

  #[test]
  fn contas_csv_has_header_and_rows() {
    let rows = vec![ContaPagar {
      id: 1,
      descricao: "Pecas, usadas".to_string(),
      valor_com_nota: 100.0,
      valor_sem_nota: 0.0,
      categoria: "PEÇAS USADAS".to_string(),
      vencimento: "2024-05-10".to_string(),
      status: "PENDENTE".to_string(),
    }];
    let csv = contas_pagar_csv(&rows);
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("id,descricao"));
    assert_eq!(
      lines.next().unwrap(),
      "1,\"Pecas, usadas\",100,0,PEÇAS USADAS,2024-05-10,PENDENTE"
    );
  }
}
