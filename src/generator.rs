//! The generation loop: compose a prompt, call the gateway, parse, validate,
//! and retry with a fresh seed until a valid batch lands or the budget runs
//! out.
//!
//! Every failure mode (gateway exhaustion, parse failure, the model's own
//! INVALID refusal, semantic rejection) is the same soft outcome: reroll
//! the seed, try again. Nothing is ever retried with the seed that already
//! failed; identical randomization would just reproduce the same bad batch.

use std::collections::HashSet;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{CefrLevel, ErrorCategory, GeneratedExercises, GenerationRequest};
use crate::gateway::ModelGateway;
use crate::parser::{parse_batch, ParseError};
use crate::prompt::compose;
use crate::util::{fresh_seed_token, trunc_for_log};
use crate::validator::validate_batch;

pub struct ExerciseGenerator {
  gateway: ModelGateway,
  max_attempts: u32,
}

impl ExerciseGenerator {
  pub fn new(gateway: ModelGateway, max_attempts: u32) -> Self {
    Self { gateway, max_attempts }
  }

  /// Run up to `max_attempts` sequential generation attempts. Returns the
  /// first batch that parses and validates, or None with a diagnostic log
  /// entry once the budget is exhausted. None is a defined outcome ("could
  /// not generate this time"), not an error.
  #[instrument(level = "info", skip(self, first_language), fields(category = category.label(), level = level.label()))]
  pub async fn generate(
    &self,
    category: ErrorCategory,
    first_language: &str,
    age: u8,
    level: CefrLevel,
  ) -> Option<GeneratedExercises> {
    let request_id = Uuid::new_v4();
    let mut seen_seeds = HashSet::new();
    let mut request = GenerationRequest {
      category,
      first_language: first_language.to_string(),
      age,
      level,
      seed: next_seed(&mut seen_seeds),
    };

    let mut last_raw = String::new();
    let mut last_model = String::new();

    for attempt in 1..=self.max_attempts {
      let prompt = compose(&request);

      match self.gateway.generate(&prompt, None).await {
        Ok(raw) => {
          last_raw = raw.text.clone();
          last_model = raw.model_used.clone();

          match parse_batch(&raw.text) {
            Ok(batch) => {
              if validate_batch(&batch, category, level) {
                info!(target: "exercise", request_id = %request_id, attempt, model = %raw.model_used, "Generated valid exercise batch");
                return Some(GeneratedExercises { batch, model_used: raw.model_used });
              }
              warn!(target: "exercise", attempt, "Batch failed semantic validation; rerolling seed");
            }
            Err(ParseError::Refused) => {
              info!(target: "exercise", attempt, "Model declined to generate; rerolling seed");
            }
            Err(e) => {
              warn!(target: "exercise", attempt, error = %e, "Batch failed structural parse; rerolling seed");
            }
          }
        }
        Err(e) => {
          warn!(target: "exercise", attempt, error = %e, "Gateway produced no output; rerolling seed");
        }
      }

      request.seed = next_seed(&mut seen_seeds);
    }

    error!(
      target: "exercise",
      request_id = %request_id,
      category = category.label(),
      last_model = %last_model,
      last_output = %trunc_for_log(&last_raw, 400),
      "Exhausted retry budget without a valid batch"
    );
    None
  }
}

/// Fresh seed, guaranteed distinct from every seed already used in this
/// request.
fn next_seed(seen: &mut HashSet<String>) -> String {
  loop {
    let token = fresh_seed_token();
    if seen.insert(token.clone()) {
      return token;
    }
  }
}
