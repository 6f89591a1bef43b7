pub mod audit;
pub mod auth;
pub mod commands;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod models;
pub mod reports;
pub mod server;
pub mod settings;

use auth::SessionStore;
use db::Db;

pub struct AppState {
  pub db: Db,
  pub sessions: SessionStore,
}
