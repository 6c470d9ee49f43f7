//! Gapfill · Exercise Generation Backend
//!
//! - Axum HTTP API
//! - Multi-model text-generation gateway (via environment variables)
//! - Deterministic parsing/validation of generated fill-in-the-blank batches
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   OPENAI_API_KEY    : enables the model gateway if present
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   GAPFILL_CONFIG_PATH  : path to TOML config (model ranking, budgets, scoring URL)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod prompt;
mod parser;
mod validator;
mod gateway;
mod generator;
mod scoring;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (config, model gateway, scoring client).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "gapfill_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
