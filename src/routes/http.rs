//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! generation engine and the scoring client.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument, warn};

use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(category = body.category.label(), age = body.age, level = body.level.label()))]
pub async fn http_post_exercises(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> impl IntoResponse {
  let result = match &state.generator {
    Some(generator) => {
      generator
        .generate(body.category, &body.first_language, body.age, body.level)
        .await
    }
    None => {
      warn!(target: "exercise", "Generation requested but the model gateway is disabled");
      None
    }
  };

  info!(target: "exercise", category = body.category.label(), produced = result.is_some(), "HTTP exercises served");
  Json(to_generate_out(result))
}

#[instrument(level = "info", skip(state, body), fields(input_len = body.student_input.len()))]
pub async fn http_post_correct(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CorrectIn>,
) -> impl IntoResponse {
  if body.student_input.trim().is_empty() {
    return (
      StatusCode::BAD_REQUEST,
      Json(ErrorOut { message: "studentInput cannot be empty".into() }),
    )
      .into_response();
  }

  match state.scorer.correct(&body.student_input, &body.prompt).await {
    Ok(outcome) => Json(outcome).into_response(),
    Err(e) => {
      warn!(target: "gapfill_backend", error = %e, "Scoring oracle call failed");
      (StatusCode::BAD_GATEWAY, Json(ErrorOut { message: e })).into_response()
    }
  }
}
