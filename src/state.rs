//! Application state: configuration, the exercise generator, and the
//! scoring-oracle client.
//!
//! The generator is optional: without OPENAI_API_KEY the service still
//! starts, serves health checks and scoring proxying, and answers every
//! generation request with an empty batch.

use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig};
use crate::gateway::ModelGateway;
use crate::generator::ExerciseGenerator;
use crate::scoring::ScoringClient;

pub struct AppState {
    pub config: AppConfig,
    pub generator: Option<ExerciseGenerator>,
    pub scorer: ScoringClient,
}

impl AppState {
    /// Build state from env: load config, init the model gateway and the
    /// scoring client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_app_config_from_env().unwrap_or_default();

        let generator = match ModelGateway::from_env(
            &config.models,
            config.generation.request_timeout_secs,
        ) {
            Some(gw) => {
                info!(
                    target: "gapfill_backend",
                    default_model = %config.models.default,
                    fallback = ?config.models.fallback,
                    ceiling = config.models.daily_ceiling,
                    "Model gateway enabled."
                );
                Some(ExerciseGenerator::new(gw, config.generation.max_attempts))
            }
            None => {
                info!(target: "gapfill_backend", "Model gateway disabled (no OPENAI_API_KEY). Generation returns empty batches.");
                None
            }
        };

        let scorer = ScoringClient::new(&config.scoring, config.generation.request_timeout_secs);
        info!(target: "gapfill_backend", scoring_url = %config.scoring.base_url, "Scoring oracle client ready.");

        Self { config, generator, scorer }
    }
}
