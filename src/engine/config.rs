use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyParams {
    pub base: f64,
    pub pace_step: f64,
    pub mastery_step: f64,
    pub strong_mastery: f64,
    pub weak_mastery: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self {
            base: 0.5,
            pace_step: 0.2,
            mastery_step: 0.2,
            strong_mastery: 80.0,
            weak_mastery: 50.0,
            min: 0.1,
            max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub passing_threshold: f64,
    pub bonus_threshold: f64,
    pub reinforcement_threshold: f64,
    pub reinforcement_min_attempts: usize,
    pub trend_delta: f64,
    pub cross_subject_min_attempts: usize,
    pub cross_subject_high_gap: f64,
    pub max_suggestions_per_subject: usize,
    pub cache_ttl_secs: u64,
    pub difficulty: DifficultyParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passing_threshold: 60.0,
            bonus_threshold: 85.0,
            reinforcement_threshold: 70.0,
            reinforcement_min_attempts: 2,
            trend_delta: 10.0,
            cross_subject_min_attempts: 3,
            cross_subject_high_gap: 50.0,
            max_suggestions_per_subject: 3,
            cache_ttl_secs: 5 * 60,
            difficulty: DifficultyParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse("ENGINE_PASSING_THRESHOLD") {
            config.passing_threshold = val;
        }
        if let Some(val) = env_parse("ENGINE_BONUS_THRESHOLD") {
            config.bonus_threshold = val;
        }
        if let Some(val) = env_parse("ENGINE_REINFORCEMENT_THRESHOLD") {
            config.reinforcement_threshold = val;
        }
        if let Some(val) = env_parse("ENGINE_REINFORCEMENT_MIN_ATTEMPTS") {
            config.reinforcement_min_attempts = val;
        }
        if let Some(val) = env_parse("ENGINE_TREND_DELTA") {
            config.trend_delta = val;
        }
        if let Some(val) = env_parse("ENGINE_CROSS_SUBJECT_MIN_ATTEMPTS") {
            config.cross_subject_min_attempts = val;
        }
        if let Some(val) = env_parse("ENGINE_CROSS_SUBJECT_HIGH_GAP") {
            config.cross_subject_high_gap = val;
        }
        if let Some(val) = env_parse("ENGINE_MAX_SUGGESTIONS") {
            config.max_suggestions_per_subject = val;
        }
        if let Some(val) = env_parse("ENGINE_CACHE_TTL_SECS") {
            config.cache_ttl_secs = val;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable engine setting");
            None
        }
    }
}
