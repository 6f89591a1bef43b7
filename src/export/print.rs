use crate::domain::trip::TripSummary;
use crate::models::{ContaPagar, FaturamentoComNf, FaturamentoSemNf, FluxoCaixa, Trip};

const PAGE_STYLE: &str = "\
  body { font-family: Arial, Helvetica, sans-serif; margin: 24px; color: #222; }\
  h1 { font-size: 18px; margin-bottom: 2px; }\
  .periodo { color: #666; font-size: 12px; margin-bottom: 16px; }\
  table { width: 100%; border-collapse: collapse; font-size: 12px; }\
  th, td { border: 1px solid #ccc; padding: 4px 6px; text-align: left; }\
  th { background: #f0f0f0; }\
  td.num, th.num { text-align: right; }\
  tfoot td { font-weight: bold; }";

fn html_page(title: &str, subtitle: &str, body: &str) -> String {
  format!(
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title>\
     <style>{}</style></head><body><h1>{}</h1><p class=\"periodo\">{}</p>{}\
     <script>window.print();</script></body></html>",
    escape_html(title),
    PAGE_STYLE,
    escape_html(title),
    escape_html(subtitle),
    body
  )
}

fn brl(value: f64) -> String {
  format!("R$ {:.2}", value)
}

fn period_label(start: Option<&str>, end: Option<&str>) -> String {
  match (start, end) {
    (Some(start), Some(end)) => format!("Periodo: {start} a {end}"),
    (Some(start), None) => format!("Periodo: a partir de {start}"),
    (None, Some(end)) => format!("Periodo: ate {end}"),
    (None, None) => "Periodo: completo".to_string(),
  }
}

pub fn contas_pagar_html(
  company: &str,
  rows: &[ContaPagar],
  start: Option<&str>,
  end: Option<&str>,
) -> String {
  let mut body = String::from(
    "<table><thead><tr><th>Descricao</th><th>Categoria</th><th>Vencimento</th>\
     <th>Status</th><th class=\"num\">Com nota</th><th class=\"num\">Sem nota</th></tr></thead><tbody>",
  );
  let mut total = 0.0;
  for row in rows {
    total += row.valor_com_nota + row.valor_sem_nota;
    body.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
      escape_html(&row.descricao),
      escape_html(&row.categoria),
      escape_html(&row.vencimento),
      escape_html(&row.status),
      brl(row.valor_com_nota),
      brl(row.valor_sem_nota)
    ));
  }
  body.push_str(&format!(
    "</tbody><tfoot><tr><td colspan=\"4\">Total</td><td class=\"num\" colspan=\"2\">{}</td></tr></tfoot></table>",
    brl(total)
  ));
  html_page(
    &format!("{company} - Contas a Pagar"),
    &period_label(start, end),
    &body,
  )
}

pub fn fluxo_caixa_html(
  company: &str,
  rows: &[FluxoCaixa],
  start: Option<&str>,
  end: Option<&str>,
) -> String {
  let mut body = String::from(
    "<table><thead><tr><th>Data</th><th>Descricao</th><th>Categoria</th>\
     <th>Tipo</th><th class=\"num\">Valor</th></tr></thead><tbody>",
  );
  let mut balance = 0.0;
  for row in rows {
    if row.tipo_movimento == "ENTRADA" {
      balance += row.valor;
    } else {
      balance -= row.valor;
    }
    body.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
      escape_html(&row.data_movimento),
      escape_html(&row.descricao),
      escape_html(&row.categoria),
      escape_html(&row.tipo_movimento),
      brl(row.valor)
    ));
  }
  body.push_str(&format!(
    "</tbody><tfoot><tr><td colspan=\"4\">Balanco</td><td class=\"num\">{}</td></tr></tfoot></table>",
    brl(balance)
  ));
  html_page(
    &format!("{company} - Fluxo de Caixa"),
    &period_label(start, end),
    &body,
  )
}

pub fn faturamento_com_nf_html(
  company: &str,
  rows: &[FaturamentoComNf],
  start: Option<&str>,
  end: Option<&str>,
) -> String {
  let mut body = String::from(
    "<table><thead><tr><th>Data</th><th>Cliente</th><th>NF Servico</th><th>NF Peca</th>\
     <th class=\"num\">Parcelas</th><th class=\"num\">Valor</th></tr></thead><tbody>",
  );
  let mut total = 0.0;
  for row in rows {
    total += row.valor_total;
    body.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
      escape_html(&row.data_faturamento),
      escape_html(&row.cliente),
      escape_html(row.nota_servico.as_deref().unwrap_or("-")),
      escape_html(row.nota_peca.as_deref().unwrap_or("-")),
      row.parcelas,
      brl(row.valor_total)
    ));
  }
  body.push_str(&format!(
    "</tbody><tfoot><tr><td colspan=\"5\">Total</td><td class=\"num\">{}</td></tr></tfoot></table>",
    brl(total)
  ));
  html_page(
    &format!("{company} - Faturamento com NF"),
    &period_label(start, end),
    &body,
  )
}

pub fn faturamento_sem_nf_html(
  company: &str,
  rows: &[FaturamentoSemNf],
  start: Option<&str>,
  end: Option<&str>,
) -> String {
  let mut body = String::from(
    "<table><thead><tr><th>Data</th><th>Orcamento</th><th>Categoria</th>\
     <th>Condicao</th><th class=\"num\">Valor</th></tr></thead><tbody>",
  );
  let mut total = 0.0;
  for row in rows {
    total += row.valor_total;
    body.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
      escape_html(&row.data_faturamento),
      escape_html(row.numero_orcamento.as_deref().unwrap_or("-")),
      escape_html(&row.categoria),
      escape_html(row.condicao_pagamento.as_deref().unwrap_or("-")),
      brl(row.valor_total)
    ));
  }
  body.push_str(&format!(
    "</tbody><tfoot><tr><td colspan=\"4\">Total</td><td class=\"num\">{}</td></tr></tfoot></table>",
    brl(total)
  ));
  html_page(
    &format!("{company} - Faturamento sem NF"),
    &period_label(start, end),
    &body,
  )
}

/// Settlement ("acerto") document a driver signs at the end of a trip.
pub fn trip_settlement_html(
  company: &str,
  trip: &Trip,
  driver_name: &str,
  plate: &str,
  summary: &TripSummary,
) -> String {
  let efficiency = summary
    .fuel_efficiency
    .map(|v| format!("{:.2} km/l", v))
    .unwrap_or_else(|| "N/A".to_string());

  let mut body = format!(
    "<table><tbody>\
     <tr><th>Motorista</th><td>{}</td><th>Veiculo</th><td>{}</td></tr>\
     <tr><th>Rota</th><td colspan=\"3\">{} - {}</td></tr>\
     <tr><th>Inicio</th><td>{}</td><th>Fim</th><td>{}</td></tr>\
     <tr><th>KM rodados</th><td>{:.0}</td><th>Media</th><td>{}</td></tr>\
     </tbody></table><br>",
    escape_html(driver_name),
    escape_html(plate),
    escape_html(&trip.origin),
    escape_html(&trip.destination),
    escape_html(&trip.start_date),
    escape_html(trip.end_date.as_deref().unwrap_or("-")),
    summary.total_km,
    efficiency
  );

  body.push_str(&format!(
    "<table><tbody>\
     <tr><th>Frete bruto</th><td class=\"num\">{}</td></tr>\
     <tr><th>Frete liquido</th><td class=\"num\">{}</td></tr>\
     <tr><th>Comissao ({:.1}%)</th><td class=\"num\">{}</td></tr>\
     <tr><th>Abastecimentos</th><td class=\"num\">{}</td></tr>\
     <tr><th>Outras despesas</th><td class=\"num\">{}</td></tr>\
     <tr><th>Lucro da viagem</th><td class=\"num\">{}</td></tr>\
     <tr><th>Recebido</th><td class=\"num\">{}</td></tr>\
     <tr><th>Saldo</th><td class=\"num\">{}</td></tr>\
     </tbody></table>\
     <p>Assinatura do motorista: ______________________________</p>",
    brl(summary.gross_freight),
    brl(summary.net_freight),
    trip.commission_rate,
    brl(summary.commission),
    brl(summary.fueling_total),
    brl(summary.other_expenses),
    brl(summary.net_profit),
    brl(summary.received),
    brl(summary.balance)
  ));

  html_page(
    &format!("{company} - Acerto de Viagem"),
    &format!("Viagem {} de {}", trip.monthly_trip_number.unwrap_or(0), trip.start_date),
    &body,
  )
}

fn escape_html(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}
