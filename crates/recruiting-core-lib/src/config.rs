//! Layered configuration: built-in defaults, overlaid by an optional TOML
//! file, overlaid by `RC_`-prefixed environment variables.
//!
//! Every field here corresponds to a named option in the external-interfaces
//! configuration table; nothing reads a value out of a hidden global.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::scoring::exceptional_talent::ExceptionalThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vector_dim: usize,
    pub similarity_threshold: f32,
    pub confidence_threshold: f32,
    pub must_have_strictness: f32,
    pub clusterer_k_min: usize,
    pub clusterer_k_max: usize,
    pub clusterer_n_init: usize,
    pub clusterer_seed: u64,
    pub hybrid_search_deadline_ms: u64,
    pub bandit_warm_scale: f32,
    pub bandit_rng_seed: u64,
    /// Feel-Good Thompson Sampling optimism scale `lambda_fg`. Zero (the
    /// default) recovers plain Thompson sampling; see `bandit::Bandit::select`.
    pub bandit_fg_lambda: f32,
    pub exceptional_thresholds: ExceptionalThresholds,
    pub relational_store_path: String,
    pub embedding_service_url: Option<String>,
    pub embedding_service_timeout_ms: u64,
    pub llm_feedback_url: Option<String>,
    pub llm_feedback_timeout_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_dim: 768,
            similarity_threshold: 0.65,
            confidence_threshold: 0.70,
            must_have_strictness: 1.0,
            clusterer_k_min: 5,
            clusterer_k_max: 10,
            clusterer_n_init: 10,
            clusterer_seed: 42,
            hybrid_search_deadline_ms: 3000,
            bandit_warm_scale: 8.0,
            bandit_rng_seed: 1337,
            bandit_fg_lambda: 0.0,
            exceptional_thresholds: ExceptionalThresholds::default(),
            relational_store_path: ":memory:".to_string(),
            embedding_service_url: None,
            embedding_service_timeout_ms: 2000,
            llm_feedback_url: None,
            llm_feedback_timeout_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, overlay an optional TOML file, overlay `RC_*` env vars.
    pub fn load(toml_path: Option<&Path>) -> CoreResult<Self> {
        let mut cfg = Config::default();

        if let Some(path) = toml_path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::ValidationError(format!("reading config {path:?}: {e}"))
                })?;
                cfg = toml::from_str(&text)
                    .map_err(|e| CoreError::ValidationError(format!("parsing config: {e}")))?;
            }
        }

        cfg.apply_env_overlay(&env_overlay_from_process());
        Ok(cfg)
    }

    /// Apply an `RC_`-prefixed overlay map on top of the current values.
    /// Split out from [`Config::load`] so tests can exercise it without
    /// touching real process environment variables.
    pub fn apply_env_overlay(&mut self, overlay: &HashMap<String, String>) {
        macro_rules! overlay_parsed {
            ($key:literal, $field:expr) => {
                if let Some(v) = overlay.get($key) {
                    if let Ok(parsed) = v.parse() {
                        $field = parsed;
                    }
                }
            };
        }

        overlay_parsed!("VECTOR_DIM", self.vector_dim);
        overlay_parsed!("SIMILARITY_THRESHOLD", self.similarity_threshold);
        overlay_parsed!("CONFIDENCE_THRESHOLD", self.confidence_threshold);
        overlay_parsed!("MUST_HAVE_STRICTNESS", self.must_have_strictness);
        overlay_parsed!("CLUSTERER_K_MIN", self.clusterer_k_min);
        overlay_parsed!("CLUSTERER_K_MAX", self.clusterer_k_max);
        overlay_parsed!("CLUSTERER_N_INIT", self.clusterer_n_init);
        overlay_parsed!("CLUSTERER_SEED", self.clusterer_seed);
        overlay_parsed!("HYBRID_SEARCH_DEADLINE_MS", self.hybrid_search_deadline_ms);
        overlay_parsed!("BANDIT_WARM_SCALE", self.bandit_warm_scale);
        overlay_parsed!("BANDIT_RNG_SEED", self.bandit_rng_seed);
        overlay_parsed!("BANDIT_FG_LAMBDA", self.bandit_fg_lambda);
        overlay_parsed!(
            "EMBEDDING_SERVICE_TIMEOUT_MS",
            self.embedding_service_timeout_ms
        );
        overlay_parsed!("LLM_FEEDBACK_TIMEOUT_MS", self.llm_feedback_timeout_ms);

        if let Some(v) = overlay.get("RELATIONAL_STORE_PATH") {
            self.relational_store_path = v.clone();
        }
        if let Some(v) = overlay.get("EMBEDDING_SERVICE_URL") {
            self.embedding_service_url = Some(v.clone());
        }
        if let Some(v) = overlay.get("LLM_FEEDBACK_URL") {
            self.llm_feedback_url = Some(v.clone());
        }
        if let Some(v) = overlay.get("LOG_LEVEL") {
            self.log_level = v.clone();
        }
    }
}

fn env_overlay_from_process() -> HashMap<String, String> {
    env::vars()
        .filter_map(|(k, v)| k.strip_prefix("RC_").map(|stripped| (stripped.to_string(), v)))
        .collect()
}
