use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::auth;
use crate::commands::{finance, fleet};
use crate::db;
use crate::domain::trip as trip_math;
use crate::error::AppError;
use crate::export::{csv, print};
use crate::models::*;
use crate::reports;
use crate::settings;
use crate::AppState;

pub const DEFAULT_PORT: u16 = 48090;

type HttpResponse = Response<Cursor<Vec<u8>>>;

pub fn local_ip_string() -> String {
  local_ip_address::local_ip()
    .map(|ip| ip.to_string())
    .unwrap_or_else(|_| "0.0.0.0".to_string())
}

pub fn run_server(state: Arc<AppState>, port: u16) -> Result<(), AppError> {
  let server = Server::http(("0.0.0.0", port))
    .map_err(|err| AppError::storage("SERVER_BIND", err.to_string()))?;
  eprintln!("listening on http://{}:{}", local_ip_string(), port);
  for request in server.incoming_requests() {
    handle_request(request, &state);
  }
  Ok(())
}

fn handle_request(mut request: Request, state: &AppState) {
  let method = request.method().clone();
  let url = request.url().to_string();
  let (path, query) = split_query(&url);
  let params = parse_query(query);
  let segments: Vec<String> = path
    .trim_matches('/')
    .split('/')
    .filter(|s| !s.is_empty())
    .map(percent_decode)
    .collect();
  let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

  let response = route(&method, &segments, &params, &mut request, state);
  let _ = request.respond(response);
}

fn route(
  method: &Method,
  segments: &[&str],
  params: &HashMap<String, String>,
  request: &mut Request,
  state: &AppState,
) -> HttpResponse {
  // Liveness probe and login run without a session.
  match (method, segments) {
    (Method::Get, ["api", "status"]) => return handle_status(state),
    (Method::Post, ["api", "login"]) => return handle_login(request, state),
    _ => {}
  }

  let (session, token) = match authorize(request, state) {
    Ok(pair) => pair,
    Err(response) => return response,
  };
  let actor = Some(session.name.clone());

  match (method, segments) {
    (Method::Post, ["api", "logout"]) => {
      json_or_error(state.sessions.revoke(&token).map(|_| serde_json::json!({ "ok": true })))
    }
    (Method::Post, ["api", "password"]) => {
      let input: ChangePasswordRequest = match read_json(request) {
        Ok(input) => input,
        Err(response) => return response,
      };
      json_or_error(
        db::with_conn(&state.db, |conn| auth::change_password(conn, &session, &input))
          .map(|_| serde_json::json!({ "ok": true })),
      )
    }
    (Method::Get, ["api", "audit"]) => {
      let limit = param_i64(params, "limit").unwrap_or(100);
      json_or_error(finance::list_audit(state, limit))
    }
    (Method::Get, ["api", "settings"]) => {
      json_or_error(db::with_conn(&state.db, |conn| settings::get_settings(conn)))
    }
    (Method::Put, ["api", "settings"]) => match read_json::<Settings>(request) {
      Ok(input) => json_or_error(
        db::with_conn(&state.db, |conn| {
          settings::update_settings(conn, &input)?;
          settings::get_settings(conn)
        }),
      ),
      Err(response) => response,
    },

    _ if segments.first() == Some(&"api") && segments.get(1) == Some(&"fleet") => {
      route_fleet(method, &segments[2..], params, request, state, actor)
    }
    _ if segments.first() == Some(&"api") && segments.get(1) == Some(&"finance") => {
      route_finance(method, &segments[2..], params, request, state, actor)
    }
    _ => json_error(StatusCode(404), "NOT_FOUND", "Rota nao encontrada"),
  }
}

fn route_fleet(
  method: &Method,
  segments: &[&str],
  params: &HashMap<String, String>,
  request: &mut Request,
  state: &AppState,
  actor: Option<String>,
) -> HttpResponse {
  match (method, segments) {
    (Method::Get, ["drivers"]) => json_or_error(fleet::list_drivers(state)),
    (Method::Post, ["drivers"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_driver(state, input, actor)),
      Err(response) => response,
    },
    (Method::Put, ["drivers", id]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::update_driver(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["drivers", id]) => {
      json_or_error(fleet::delete_driver(state, id.to_string(), actor).map(ok_body))
    }
    (Method::Get, ["drivers", id, "overview"]) => {
      json_or_error(fleet::driver_overview(state, id.to_string()))
    }

    (Method::Get, ["vehicles"]) => json_or_error(fleet::list_vehicles(state)),
    (Method::Post, ["vehicles"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_vehicle(state, input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["vehicles", id]) => {
      json_or_error(fleet::delete_vehicle(state, id.to_string(), actor).map(ok_body))
    }

    (Method::Get, ["admins"]) => json_or_error(fleet::list_admins(state)),
    (Method::Post, ["admins"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_admin(state, input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["admins", id]) => {
      json_or_error(fleet::delete_admin(state, id.to_string(), actor).map(ok_body))
    }

    (Method::Get, ["trips"]) => {
      json_or_error(fleet::list_trips(state, params.get("driver").cloned()))
    }
    (Method::Post, ["trips"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_trip(state, input, actor)),
      Err(response) => response,
    },
    (Method::Get, ["trips", id]) => json_or_error(fleet::get_trip(state, id.to_string())),
    (Method::Delete, ["trips", id]) => {
      json_or_error(fleet::delete_trip(state, id.to_string(), actor).map(ok_body))
    }
    (Method::Post, ["trips", id, "cargo"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::add_cargo(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Post, ["trips", id, "fuelings"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::add_fueling(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Post, ["trips", id, "expenses"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::add_trip_expense(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Post, ["trips", id, "payments"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::add_trip_payment(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Post, ["trips", id, "finish"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::finish_trip(state, id.to_string(), input, actor)),
      Err(response) => response,
    },
    (Method::Post, ["trips", id, "sign"]) => {
      json_or_error(fleet::sign_trip(state, id.to_string(), actor))
    }
    (Method::Get, ["trips", id, "summary"]) => {
      json_or_error(fleet::trip_summary(state, id.to_string()))
    }
    (Method::Get, ["trips", id, "settlement"]) => handle_trip_settlement(state, id),

    (Method::Get, ["fixed-expenses"]) => {
      json_or_error(fleet::list_fixed_expenses(state, params.get("vehicle").cloned()))
    }
    (Method::Post, ["fixed-expenses"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_fixed_expense(state, input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["fixed-expenses", id]) => {
      json_or_error(fleet::delete_fixed_expense(state, id.to_string(), actor).map(ok_body))
    }
    (Method::Post, ["fixed-expenses", id, "payments"]) => match read_json(request) {
      Ok(input) => {
        json_or_error(fleet::record_fixed_payment(state, id.to_string(), input, actor).map(ok_body))
      }
      Err(response) => response,
    },

    (Method::Get, ["workshop-expenses"]) => {
      json_or_error(fleet::list_workshop_expenses(state, params.get("vehicle").cloned()))
    }
    (Method::Post, ["workshop-expenses"]) => match read_json(request) {
      Ok(input) => json_or_error(fleet::create_workshop_expense(state, input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["workshop-expenses", id]) => {
      json_or_error(fleet::delete_workshop_expense(state, id.to_string(), actor).map(ok_body))
    }
    (Method::Post, ["workshop-expenses", id, "payments"]) => match read_json(request) {
      Ok(input) => json_or_error(
        fleet::record_workshop_payment(state, id.to_string(), input, actor).map(ok_body),
      ),
      Err(response) => response,
    },

    (Method::Get, ["analysis"]) => {
      let (start, end) = match (params.get("start"), params.get("end")) {
        (Some(start), Some(end)) => (start.clone(), end.clone()),
        _ => return json_error(StatusCode(400), "INVALID_PERIOD", "Parametros start e end obrigatorios"),
      };
      json_or_error(fleet::fleet_analysis(state, start, end, params.get("vehicle").cloned()))
    }
    (Method::Get, ["billing"]) => match params.get("month") {
      Some(month) => json_or_error(fleet::billing_report(state, month.clone())),
      None => json_error(StatusCode(400), "INVALID_MONTH", "Parametro month obrigatorio"),
    },
    (Method::Get, ["overview"]) => json_or_error(fleet::fleet_overview(state)),

    _ => json_error(StatusCode(404), "NOT_FOUND", "Rota nao encontrada"),
  }
}

fn route_finance(
  method: &Method,
  segments: &[&str],
  params: &HashMap<String, String>,
  request: &mut Request,
  state: &AppState,
  actor: Option<String>,
) -> HttpResponse {
  let query = list_query(params);
  match (method, segments) {
    (Method::Get, ["contas-pagar"]) => json_or_error(finance::list_contas_pagar(state, query)),
    (Method::Post, ["contas-pagar"]) => match read_json(request) {
      Ok(input) => json_or_error(finance::create_conta_pagar(state, input, actor)),
      Err(response) => response,
    },
    (Method::Put, ["contas-pagar", id]) => match (parse_id(id), read_json(request)) {
      (Ok(id), Ok(input)) => json_or_error(finance::update_conta_pagar(state, id, input, actor)),
      (Err(response), _) | (_, Err(response)) => response,
    },
    (Method::Delete, ["contas-pagar", id]) => match parse_id(id) {
      Ok(id) => json_or_error(finance::delete_conta_pagar(state, id, actor).map(ok_body)),
      Err(response) => response,
    },
    (Method::Get, ["contas-pagar", "total"]) => {
      json_or_error(finance::total_contas_pagar(state, query).map(total_body))
    }
    (Method::Get, ["contas-pagar", "csv"]) => {
      csv_or_error(finance::export_contas_pagar(state, query).map(|rows| csv::contas_pagar_csv(&rows)))
    }
    (Method::Get, ["contas-pagar", "print"]) => html_or_error(
      finance::export_contas_pagar(state, query).and_then(|rows| {
        let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))?.company_name;
        Ok(print::contas_pagar_html(
          &company,
          &rows,
          params.get("start").map(String::as_str),
          params.get("end").map(String::as_str),
        ))
      }),
    ),

    (Method::Get, ["fluxo-caixa"]) => json_or_error(finance::list_fluxo_caixa(state, query)),
    (Method::Post, ["fluxo-caixa"]) => match read_json(request) {
      Ok(input) => json_or_error(finance::create_fluxo_caixa(state, input, actor)),
      Err(response) => response,
    },
    (Method::Put, ["fluxo-caixa", id]) => match (parse_id(id), read_json(request)) {
      (Ok(id), Ok(input)) => json_or_error(finance::update_fluxo_caixa(state, id, input, actor)),
      (Err(response), _) | (_, Err(response)) => response,
    },
    (Method::Delete, ["fluxo-caixa", id]) => match parse_id(id) {
      Ok(id) => json_or_error(finance::delete_fluxo_caixa(state, id, actor).map(ok_body)),
      Err(response) => response,
    },
    (Method::Get, ["fluxo-caixa", "total"]) => {
      json_or_error(finance::total_fluxo_caixa(state, query).map(total_body))
    }
    (Method::Get, ["fluxo-caixa", "csv"]) => {
      csv_or_error(finance::export_fluxo_caixa(state, query).map(|rows| csv::fluxo_caixa_csv(&rows)))
    }
    (Method::Get, ["fluxo-caixa", "print"]) => html_or_error(
      finance::export_fluxo_caixa(state, query).and_then(|rows| {
        let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))?.company_name;
        Ok(print::fluxo_caixa_html(
          &company,
          &rows,
          params.get("start").map(String::as_str),
          params.get("end").map(String::as_str),
        ))
      }),
    ),

    (Method::Get, ["faturamento-com-nf"]) => {
      json_or_error(finance::list_faturamento_com_nf(state, query))
    }
    (Method::Post, ["faturamento-com-nf"]) => match read_json(request) {
      Ok(input) => json_or_error(finance::create_faturamento_com_nf(state, input, actor)),
      Err(response) => response,
    },
    (Method::Put, ["faturamento-com-nf", id]) => match (parse_id(id), read_json(request)) {
      (Ok(id), Ok(input)) => {
        json_or_error(finance::update_faturamento_com_nf(state, id, input, actor))
      }
      (Err(response), _) | (_, Err(response)) => response,
    },
    (Method::Delete, ["faturamento-com-nf", id]) => match parse_id(id) {
      Ok(id) => json_or_error(finance::delete_faturamento_com_nf(state, id, actor).map(ok_body)),
      Err(response) => response,
    },
    (Method::Get, ["faturamento-com-nf", "total"]) => {
      json_or_error(finance::total_faturamento_com_nf(state, query).map(total_body))
    }
    (Method::Get, ["faturamento-com-nf", "csv"]) => csv_or_error(
      finance::export_faturamento_com_nf(state, query).map(|rows| csv::faturamento_com_nf_csv(&rows)),
    ),
    (Method::Get, ["faturamento-com-nf", "print"]) => html_or_error(
      finance::export_faturamento_com_nf(state, query).and_then(|rows| {
        let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))?.company_name;
        Ok(print::faturamento_com_nf_html(
          &company,
          &rows,
          params.get("start").map(String::as_str),
          params.get("end").map(String::as_str),
        ))
      }),
    ),

    (Method::Get, ["faturamento-sem-nf"]) => {
      json_or_error(finance::list_faturamento_sem_nf(state, query))
    }
    (Method::Post, ["faturamento-sem-nf"]) => match read_json(request) {
      Ok(input) => json_or_error(finance::create_faturamento_sem_nf(state, input, actor)),
      Err(response) => response,
    },
    (Method::Put, ["faturamento-sem-nf", id]) => match (parse_id(id), read_json(request)) {
      (Ok(id), Ok(input)) => {
        json_or_error(finance::update_faturamento_sem_nf(state, id, input, actor))
      }
      (Err(response), _) | (_, Err(response)) => response,
    },
    (Method::Delete, ["faturamento-sem-nf", id]) => match parse_id(id) {
      Ok(id) => json_or_error(finance::delete_faturamento_sem_nf(state, id, actor).map(ok_body)),
      Err(response) => response,
    },
    (Method::Get, ["faturamento-sem-nf", "total"]) => {
      json_or_error(finance::total_faturamento_sem_nf(state, query).map(total_body))
    }
    (Method::Get, ["faturamento-sem-nf", "csv"]) => csv_or_error(
      finance::export_faturamento_sem_nf(state, query).map(|rows| csv::faturamento_sem_nf_csv(&rows)),
    ),
    (Method::Get, ["faturamento-sem-nf", "print"]) => html_or_error(
      finance::export_faturamento_sem_nf(state, query).and_then(|rows| {
        let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))?.company_name;
        Ok(print::faturamento_sem_nf_html(
          &company,
          &rows,
          params.get("start").map(String::as_str),
          params.get("end").map(String::as_str),
        ))
      }),
    ),

    (Method::Get, ["dashboard"]) => {
      let (start, end) = match (params.get("start"), params.get("end")) {
        (Some(start), Some(end)) => (start.clone(), end.clone()),
        _ => return json_error(StatusCode(400), "INVALID_PERIOD", "Parametros start e end obrigatorios"),
      };
      json_or_error(finance::dashboard(state, start, end))
    }
    (Method::Get, ["categories"]) => json_or_error(Ok::<_, AppError>(serde_json::json!({
      "contas_pagar": reports::CATEGORIAS_CONTAS_PAGAR,
      "fluxo_caixa": reports::CATEGORIAS_FLUXO_CAIXA,
      "faturamento_sem_nf": reports::CATEGORIAS_SEM_NF,
    }))),

    (Method::Get, ["usuarios"]) => json_or_error(finance::list_usuarios(state)),
    (Method::Post, ["usuarios"]) => match read_json(request) {
      Ok(input) => json_or_error(finance::create_usuario(state, input, actor)),
      Err(response) => response,
    },
    (Method::Delete, ["usuarios", id]) => match parse_id(id) {
      Ok(id) => json_or_error(finance::delete_usuario(state, id, actor).map(ok_body)),
      Err(response) => response,
    },

    _ => json_error(StatusCode(404), "NOT_FOUND", "Rota nao encontrada"),
  }
}

fn handle_status(state: &AppState) -> HttpResponse {
  let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))
    .map(|s| s.company_name)
    .unwrap_or_else(|_| "Central Truck".to_string());
  json_response(
    StatusCode(200),
    &serde_json::json!({
      "ok": true,
      "company": company,
      "ip": local_ip_string(),
      "version": env!("CARGO_PKG_VERSION"),
    }),
  )
}

fn handle_login(request: &mut Request, state: &AppState) -> HttpResponse {
  let input: LoginRequest = match read_json(request) {
    Ok(input) => input,
    Err(response) => return response,
  };
  let result = db::with_conn(&state.db, |conn| auth::login(conn, &input))
    .and_then(|user| Ok(LoginResponse { token: state.sessions.issue(user.clone())?, user }));
  json_or_error(result)
}

fn handle_trip_settlement(state: &AppState, trip_id: &str) -> HttpResponse {
  let result = (|| {
    let trip = fleet::get_trip(state, trip_id.to_string())?;
    let summary = trip_math::summarize(&trip);
    db::with_conn(&state.db, |conn| {
      let company = settings::get_settings(conn)?.company_name;
      let driver_name: String = conn.query_row(
        "SELECT name FROM drivers WHERE id = ?1",
        rusqlite::params![trip.driver_id],
        |row| row.get(0),
      )?;
      let plate: String = conn.query_row(
        "SELECT plate FROM vehicles WHERE id = ?1",
        rusqlite::params![trip.vehicle_id],
        |row| row.get(0),
      )?;
      Ok(print::trip_settlement_html(&company, &trip, &driver_name, &plate, &summary))
    })
  })();
  html_or_error(result)
}

// --- Request plumbing ---

fn authorize(request: &Request, state: &AppState) -> Result<(SessionUser, String), HttpResponse> {
  let token = read_header(request, "X-Auth-Token")
    .ok_or_else(|| json_error(StatusCode(401), "MISSING_TOKEN", "Token de acesso obrigatorio"))?;
  match state.sessions.get(&token) {
    Ok(Some(session)) => Ok((session, token)),
    Ok(None) => Err(json_error(StatusCode(401), "INVALID_TOKEN", "Sessao invalida ou expirada")),
    Err(err) => Err(error_response(&err)),
  }
}

fn read_header(request: &Request, name: &str) -> Option<String> {
  request
    .headers()
    .iter()
    .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
    .map(|header| header.value.to_string())
}

fn read_json<T: serde::de::DeserializeOwned>(request: &mut Request) -> Result<T, HttpResponse> {
  let mut body = Vec::new();
  if request.as_reader().read_to_end(&mut body).is_err() {
    return Err(json_error(StatusCode(400), "INVALID_BODY", "Corpo da requisicao ilegivel"));
  }
  serde_json::from_slice(&body)
    .map_err(|err| json_error(StatusCode(400), "INVALID_JSON", &err.to_string()))
}

fn list_query(params: &HashMap<String, String>) -> ListQuery {
  ListQuery {
    page: param_i64(params, "page").unwrap_or(1),
    search: params.get("search").cloned(),
    start_date: params.get("start").cloned(),
    end_date: params.get("end").cloned(),
    category: params.get("category").cloned(),
  }
}

fn param_i64(params: &HashMap<String, String>, name: &str) -> Option<i64> {
  params.get(name).and_then(|v| v.parse().ok())
}

fn parse_id(raw: &str) -> Result<i64, HttpResponse> {
  raw
    .parse()
    .map_err(|_| json_error(StatusCode(400), "INVALID_ID", "Identificador deve ser numerico"))
}

fn split_query(url: &str) -> (&str, &str) {
  match url.split_once('?') {
    Some((path, query)) => (path, query),
    None => (url, ""),
  }
}

fn parse_query(query: &str) -> HashMap<String, String> {
  query
    .split('&')
    .filter(|pair| !pair.is_empty())
    .filter_map(|pair| {
      let (key, value) = pair.split_once('=')?;
      Some((percent_decode(key), percent_decode(value)))
    })
    .collect()
}

fn percent_decode(value: &str) -> String {
  let bytes = value.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'+' => {
        out.push(b' ');
        i += 1;
      }
      b'%' if i + 2 < bytes.len() => {
        let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
          .ok()
          .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match decoded {
          Some(byte) => {
            out.push(byte);
            i += 3;
          }
          None => {
            out.push(b'%');
            i += 1;
          }
        }
      }
      other => {
        out.push(other);
        i += 1;
      }
    }
  }
  String::from_utf8_lossy(&out).into_owned()
}

fn ok_body(_: ()) -> serde_json::Value {
  serde_json::json!({ "ok": true })
}

fn total_body(total: f64) -> serde_json::Value {
  serde_json::json!({ "total": total })
}

fn json_or_error<T: Serialize>(result: Result<T, AppError>) -> HttpResponse {
  match result {
    Ok(payload) => json_response(StatusCode(200), &payload),
    Err(err) => error_response(&err),
  }
}

fn html_or_error(result: Result<String, AppError>) -> HttpResponse {
  match result {
    Ok(html) => {
      let mut response = Response::from_data(html.into_bytes());
      response.add_header(header("Content-Type", "text/html; charset=utf-8"));
      response
    }
    Err(err) => error_response(&err),
  }
}

fn csv_or_error(result: Result<String, AppError>) -> HttpResponse {
  match result {
    Ok(body) => {
      let mut response = Response::from_data(body.into_bytes());
      response.add_header(header("Content-Type", "text/csv; charset=utf-8"));
      response
    }
    Err(err) => error_response(&err),
  }
}

fn error_response(err: &AppError) -> HttpResponse {
  json_error(StatusCode(err.http_status()), &err.code, &err.message)
}

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> HttpResponse {
  let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
  let mut response = Response::from_data(body);
  response = response.with_status_code(status);
  response.add_header(header("Content-Type", "application/json"));
  response
}

fn json_error(status: StatusCode, code: &str, message: &str) -> HttpResponse {
  json_response(
    status,
    &serde_json::json!({
      "code": code,
      "message": message,
    }),
  )
}

fn header(name: &str, value: &str) -> Header {
  Header::from_bytes(name, value).unwrap()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_path_and_query() {
    let (path, query) = split_query("/api/finance/contas-pagar?page=2&search=pe%C3%A7as");
    assert_eq!(path, "/api/finance/contas-pagar");
    let params = parse_query(query);
    assert_eq!(params.get("page").map(String::as_str), Some("2"));
    assert_eq!(params.get("search").map(String::as_str), Some("peças"));
  }

  #[test]
  fn decodes_plus_and_percent_sequences() {
    assert_eq!(percent_decode("a+b"), "a b");
    assert_eq!(percent_decode("100%25"), "100%");
    assert_eq!(percent_decode("sem%"), "sem%");
  }

  #[test]
  fn query_without_assignments_is_ignored() {
    let params = parse_query("flag&x=1");
    assert_eq!(params.len(), 1);
    assert_eq!(params.get("x").map(String::as_str), Some("1"));
  }

  #[test]
  fn status_reads_company_name_from_settings() {
    let state = AppState {
      db: db::open_test_db(),
      sessions: auth::SessionStore::new(),
    };
    let response = handle_status(&state);
    assert_eq!(response.status_code(), StatusCode(200));

    let company = db::with_conn(&state.db, |conn| settings::get_settings(conn))
      .map(|s| s.company_name)
      .unwrap();
    assert_eq!(company, "Central Truck");
  }
}
