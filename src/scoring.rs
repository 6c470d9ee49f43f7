//! Thin client for the remote grading/correction oracle.
//!
//! The oracle corrects free-text learner writing and reports per-change
//! feedback. We consume it as an opaque request/response dependency: only
//! the wire contract matters here, never its internals. Failures are
//! reported to the caller; nothing is retried.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::ScoringConfig;

#[derive(Clone)]
pub struct ScoringClient {
  client: reqwest::Client,
  base_url: String,
  max_length: u32,
}

#[derive(Serialize)]
struct CorrectionRequest<'a> {
  student_input: &'a str,
  prompt: &'a str,
  max_length: u32,
}

/// Oracle verdict. `changes` stays opaque JSON: its shape belongs to the
/// oracle, and we forward it untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrectionOutcome {
  pub original: String,
  pub corrected: String,
  #[serde(default)]
  pub prompt: String,
  pub num_errors: u32,
  pub score: i32,
  #[serde(default)]
  pub changes: Vec<serde_json::Value>,
  pub has_errors: bool,
}

impl ScoringClient {
  pub fn new(cfg: &ScoringConfig, timeout_secs: u64) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .unwrap_or_default();
    Self { client, base_url: cfg.base_url.clone(), max_length: cfg.max_length }
  }

  #[instrument(level = "info", skip(self, student_input, prompt), fields(input_len = student_input.len()))]
  pub async fn correct(
    &self,
    student_input: &str,
    prompt: &str,
  ) -> Result<CorrectionOutcome, String> {
    let url = format!("{}/correct", self.base_url);
    let req = CorrectionRequest { student_input, prompt, max_length: self.max_length };

    let res = self.client.post(&url).json(&req).send().await.map_err(|e| e.to_string())?;
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("scoring oracle HTTP {status}: {body}"));
    }

    let outcome: CorrectionOutcome = res.json().await.map_err(|e| e.to_string())?;
    info!(target: "gapfill_backend", num_errors = outcome.num_errors, score = outcome.score, "Scoring oracle verdict received");
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn forwards_the_oracle_verdict_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/correct"))
      .and(body_partial_json(serde_json::json!({ "student_input": "She go to school." })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "original": "She go to school.",
        "corrected": "She goes to school.",
        "prompt": "",
        "num_errors": 1,
        "score": 9,
        "changes": [{ "type": "replaced", "from": "go", "to": "goes" }],
        "has_errors": true
      })))
      .mount(&server)
      .await;

    let client = ScoringClient::new(
      &ScoringConfig { base_url: server.uri(), max_length: 256 },
      5,
    );
    let out = client.correct("She go to school.", "").await.expect("verdict");
    assert_eq!(out.corrected, "She goes to school.");
    assert_eq!(out.num_errors, 1);
    assert!(out.has_errors);
    assert_eq!(out.changes.len(), 1);
  }

  #[tokio::test]
  async fn oracle_failure_surfaces_as_an_error_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/correct"))
      .respond_with(ResponseTemplate::new(503).set_body_string("model not loaded"))
      .mount(&server)
      .await;

    let client = ScoringClient::new(
      &ScoringConfig { base_url: server.uri(), max_length: 256 },
      5,
    );
    let err = client.correct("text", "").await.expect_err("must fail");
    assert!(err.contains("503"));
  }
}
