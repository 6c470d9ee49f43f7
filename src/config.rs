//! Loading service configuration (model ranking, retry budget, scoring
//! oracle address) from TOML.
//!
//! See `AppConfig` for the expected schema. Every field has a default so an
//! empty file (or no file at all) yields a working configuration.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub models: ModelsConfig,
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub scoring: ScoringConfig,
}

/// Which models to call and in what order. `fallback` is the fixed ranking
/// tried after the preferred model, weakest/cheapest first; duplicates of
/// the preferred entry are skipped at call time.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelsConfig {
  #[serde(default = "default_model")]
  pub default: String,
  #[serde(default = "default_fallback")]
  pub fallback: Vec<String>,
  /// Successful calls allowed per model per process lifetime ("day" in the
  /// deployed cadence; the counter is in-memory and resets on restart).
  #[serde(default = "default_ceiling")]
  pub daily_ceiling: u32,
}

impl Default for ModelsConfig {
  fn default() -> Self {
    Self {
      default: default_model(),
      fallback: default_fallback(),
      daily_ceiling: default_ceiling(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenerationConfig {
  /// Retry budget for a single external request. Each attempt uses a fresh
  /// randomization seed.
  #[serde(default = "default_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_timeout")]
  pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self { max_attempts: default_attempts(), request_timeout_secs: default_timeout() }
  }
}

/// Remote grading oracle. Consumed as an opaque request/response dependency;
/// only the wire contract matters here.
#[derive(Clone, Debug, Deserialize)]
pub struct ScoringConfig {
  #[serde(default = "default_scoring_url")]
  pub base_url: String,
  #[serde(default = "default_scoring_max_len")]
  pub max_length: u32,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self { base_url: default_scoring_url(), max_length: default_scoring_max_len() }
  }
}

fn default_model() -> String { "gpt-4o-mini".into() }
fn default_fallback() -> Vec<String> {
  vec!["gpt-4o-mini".into(), "gpt-3.5-turbo".into(), "gpt-4o".into()]
}
fn default_ceiling() -> u32 { 19 }
fn default_attempts() -> u32 { 10 }
fn default_timeout() -> u64 { 20 }
fn default_scoring_url() -> String { "http://localhost:8000".into() }
fn default_scoring_max_len() -> u32 { 256 }

/// Attempt to load `AppConfig` from GAPFILL_CONFIG_PATH. On any parsing/IO
/// error, returns None and the caller falls back to defaults.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("GAPFILL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "gapfill_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "gapfill_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "gapfill_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
