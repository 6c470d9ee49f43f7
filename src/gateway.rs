//! Model gateway: one prompt in, raw text out, across a ranked list of
//! candidate models.
//!
//! Candidates are tried in order (preferred/default first, then the fixed
//! fallback ranking, weakest first). A model at its daily quota ceiling is
//! skipped without a network call; a rate-limited or otherwise failing
//! model is logged and the next candidate is tried. The first success wins
//! outright. When every candidate is skipped or fails the whole call fails;
//! retrying with a fresh prompt is the orchestrator's job, not ours.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::ModelsConfig;
use crate::domain::RawModelResponse;

const GATEWAY_SYSTEM_PROMPT: &str =
  "You write English learning exercises. Follow the user's instructions exactly \
   and output nothing beyond what they ask for.";

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("model {model} is rate limited")]
  RateLimited { model: String },
  #[error("model {model} call failed: {message}")]
  Call { model: String, message: String },
  #[error("every candidate model was skipped or failed")]
  AllModelsExhausted,
}

/// Process-wide, in-memory quota book-keeping: model name -> successful
/// calls so far. Increment-and-read is atomic under one lock; the
/// read-then-skip decision in the gateway is deliberately best-effort (a
/// small overshoot under heavy concurrency is acceptable). Nothing is
/// persisted; a restart resets every counter.
#[derive(Default)]
pub struct QuotaRegistry {
  used: Mutex<HashMap<String, u32>>,
}

impl QuotaRegistry {
  pub async fn used(&self, model: &str) -> u32 {
    *self.used.lock().await.get(model).unwrap_or(&0)
  }

  /// Increment the model's counter and return the new value.
  pub async fn record_success(&self, model: &str) -> u32 {
    let mut used = self.used.lock().await;
    let count = used.entry(model.to_string()).or_insert(0);
    *count += 1;
    *count
  }
}

#[derive(Clone)]
pub struct ModelGateway {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
  default_model: String,
  fallback: Vec<String>,
  daily_ceiling: u32,
  quota: Arc<QuotaRegistry>,
}

impl ModelGateway {
  /// Construct the gateway if we find OPENAI_API_KEY; otherwise return None
  /// and the service runs with generation disabled.
  pub fn from_env(models: &ModelsConfig, timeout_secs: u64) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    Some(Self::new(api_key, base_url, models, timeout_secs))
  }

  pub fn new(api_key: String, base_url: String, models: &ModelsConfig, timeout_secs: u64) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .unwrap_or_default();

    Self {
      client,
      api_key,
      base_url,
      default_model: models.default.clone(),
      fallback: models.fallback.clone(),
      daily_ceiling: models.daily_ceiling,
      quota: Arc::new(QuotaRegistry::default()),
    }
  }

  pub fn quota(&self) -> &QuotaRegistry {
    &self.quota
  }

  /// Candidate order: preferred (or configured default) first, then the
  /// fixed fallback ranking with the leader deduplicated out.
  fn candidates(&self, preferred: Option<&str>) -> Vec<String> {
    let lead = preferred.unwrap_or(&self.default_model).to_string();
    let mut out = vec![lead.clone()];
    for m in &self.fallback {
      if *m != lead && !out.contains(m) {
        out.push(m.clone());
      }
    }
    out
  }

  /// Send the prompt to the first available candidate model.
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
  pub async fn generate(
    &self,
    prompt: &str,
    preferred: Option<&str>,
  ) -> Result<RawModelResponse, GatewayError> {
    for model in self.candidates(preferred) {
      let used = self.quota.used(&model).await;
      if used >= self.daily_ceiling {
        warn!(target: "exercise", %model, used, ceiling = self.daily_ceiling, "Model at quota ceiling; skipping");
        continue;
      }

      match self.call_model(&model, prompt).await {
        Ok(text) => {
          let used_now = self.quota.record_success(&model).await;
          info!(target: "exercise", %model, used = used_now, response_len = text.len(), "Model call succeeded");
          return Ok(RawModelResponse { text, model_used: model });
        }
        Err(GatewayError::RateLimited { .. }) => {
          warn!(target: "exercise", %model, "Model rate limited; falling back to next candidate");
        }
        Err(e) => {
          warn!(target: "exercise", %model, error = %e, "Model call failed; falling back to next candidate");
        }
      }
    }

    Err(GatewayError::AllModelsExhausted)
  }

  async fn call_model(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: GATEWAY_SYSTEM_PROMPT.into() },
        ChatMessageReq { role: "user".into(), content: prompt.into() },
      ],
      temperature: 0.9,
      max_tokens: None,
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "gapfill-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| GatewayError::Call { model: model.to_string(), message: e.to_string() })?;

    if res.status() == StatusCode::TOO_MANY_REQUESTS {
      return Err(GatewayError::RateLimited { model: model.to_string() });
    }
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(GatewayError::Call {
        model: model.to_string(),
        message: format!("HTTP {status}: {msg}"),
      });
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| GatewayError::Call { model: model.to_string(), message: e.to_string() })?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }

    Ok(
      body
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default()
        .trim()
        .to_string(),
    )
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
