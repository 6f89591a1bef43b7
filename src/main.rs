use std::sync::Arc;

use centraltruck_backoffice::auth::SessionStore;
use centraltruck_backoffice::error::AppError;
use centraltruck_backoffice::{db, server, AppState};

fn main() {
  if let Err(err) = run() {
    eprintln!("fatal: {err}");
    std::process::exit(1);
  }
}

fn run() -> Result<(), AppError> {
  let app_dir = db::resolve_app_dir()?;
  let db = db::init_db(&app_dir)?;

  let port = std::env::var("CENTRALTRUCK_PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(server::DEFAULT_PORT);

  let state = Arc::new(AppState {
    db,
    sessions: SessionStore::new(),
  });
  server::run_server(state, port)
}
