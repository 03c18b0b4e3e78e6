use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub similarity: SimilarityConfig,
    pub recommendation: RecommendationConfig,
    pub vectors: VectorConfig,
    pub context: ContextConfig,
    pub scheduler: SchedulerConfig,
    pub weather: WeatherConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

impl DatabaseConfig {
    /// Local file database with default pragmas.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            url: format!("file:{}", path.into()),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

/// Bookmark co-occurrence similarity and Top-K cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    pub same_mbti_weight: f64,
    pub diff_mbti_weight: f64,
    pub pair_decay_tau_days: f64,
    /// Co-bookmark evidence younger than this many days is not decayed.
    pub pair_decay_window_days: f64,
    pub top_k: usize,
    pub jaccard_weight: f64,
    pub cosine_weight: f64,
    pub batch_size: usize,
    pub refresh_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    pub mbti_boost: f64,
    /// Freshness decay for Top-K rows, independent from the pair decay.
    pub freshness_tau_days: f64,
    pub popularity_penalty_weight: f64,
    pub diversity_enabled: bool,
    pub max_per_category: usize,
    pub max_per_area: usize,
    pub candidate_multiplier: usize,
    pub popular_min_rating: f64,
    pub vector_blend_weight: f64,
    pub default_limit: usize,
}

/// Keyword vector extraction and user/place vector similarity settings
#[derive(Debug, Clone, Deserialize)]
pub struct VectorConfig {
    pub required_keywords: usize,
    pub min_confidence: f64,
    pub user_ttl_days: i64,
    pub place_ttl_days: i64,
    pub similarity_ttl_hours: i64,
    pub mbti_boost_factor: f64,
    pub max_weighted_similarity: f64,
    pub jaccard_confidence_threshold: f64,
    pub cleanup_after_days: i64,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    pub default_max_distance_km: f64,
    pub candidate_cap: usize,
    pub utc_offset_hours: i32,
    pub weather_timeout_secs: u64,
    pub keyword_timeout_secs: u64,
    /// Candidates whose stored vector scores at or below this against the query are dropped.
    pub vector_min_similarity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub full_recalc_interval_secs: u64,
    pub top_k_refresh_interval_secs: u64,
    pub vector_batch_interval_secs: u64,
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_size: usize,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            same_mbti_weight: 2.0,
            diff_mbti_weight: 1.0,
            pair_decay_tau_days: 30.0,
            pair_decay_window_days: 90.0,
            top_k: 100,
            jaccard_weight: 0.7,
            cosine_weight: 0.3,
            batch_size: 1000,
            refresh_concurrency: 8,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            mbti_boost: 0.3,
            freshness_tau_days: 7.0,
            popularity_penalty_weight: 0.1,
            diversity_enabled: true,
            max_per_category: 3,
            max_per_area: 2,
            candidate_multiplier: 3,
            popular_min_rating: 4.0,
            vector_blend_weight: 0.25,
            default_limit: 15,
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            required_keywords: 15,
            min_confidence: 0.1,
            user_ttl_days: 7,
            place_ttl_days: 30,
            similarity_ttl_hours: 24,
            mbti_boost_factor: 1.2,
            max_weighted_similarity: 1.5,
            jaccard_confidence_threshold: 0.3,
            cleanup_after_days: 30,
            batch_size: 1000,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_max_distance_km: 10.0,
            candidate_cap: 50,
            utc_offset_hours: 9,
            weather_timeout_secs: 3,
            keyword_timeout_secs: 3,
            vector_min_similarity: 0.0,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: "openweathermap".to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 10,
            cache_ttl_secs: 600,
            cache_size: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let similarity = SimilarityConfig::default();
        let recommendation = RecommendationConfig::default();
        let vectors = VectorConfig::default();
        let context = ContextConfig::default();
        let weather = WeatherConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("MOHE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MOHE_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:mohe.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE").unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            similarity: SimilarityConfig {
                same_mbti_weight: parse_env_or("SIMILARITY_SAME_MBTI_WEIGHT", similarity.same_mbti_weight),
                diff_mbti_weight: parse_env_or("SIMILARITY_DIFF_MBTI_WEIGHT", similarity.diff_mbti_weight),
                pair_decay_tau_days: parse_env_or("SIMILARITY_DECAY_TAU_DAYS", similarity.pair_decay_tau_days),
                pair_decay_window_days: parse_env_opt("SIMILARITY_DECAY_WINDOW_DAYS").unwrap_or_else(
                    || 3.0 * parse_env_or("SIMILARITY_DECAY_TAU_DAYS", similarity.pair_decay_tau_days),
                ),
                top_k: parse_env_or("SIMILARITY_TOP_K", similarity.top_k),
                jaccard_weight: parse_env_or("SIMILARITY_JACCARD_WEIGHT", similarity.jaccard_weight),
                cosine_weight: parse_env_or("SIMILARITY_COSINE_WEIGHT", similarity.cosine_weight),
                batch_size: parse_env_or("SIMILARITY_BATCH_SIZE", similarity.batch_size),
                refresh_concurrency: parse_env_or(
                    "SIMILARITY_REFRESH_CONCURRENCY",
                    similarity.refresh_concurrency,
                ),
            },
            recommendation: RecommendationConfig {
                mbti_boost: parse_env_or("RECOMMEND_MBTI_BOOST", recommendation.mbti_boost),
                freshness_tau_days: parse_env_or(
                    "RECOMMEND_FRESHNESS_TAU_DAYS",
                    recommendation.freshness_tau_days,
                ),
                popularity_penalty_weight: parse_env_or(
                    "RECOMMEND_POPULARITY_PENALTY",
                    recommendation.popularity_penalty_weight,
                ),
                diversity_enabled: parse_env_or(
                    "RECOMMEND_DIVERSITY_ENABLED",
                    recommendation.diversity_enabled,
                ),
                max_per_category: parse_env_or(
                    "RECOMMEND_MAX_PER_CATEGORY",
                    recommendation.max_per_category,
                ),
                max_per_area: parse_env_or("RECOMMEND_MAX_PER_AREA", recommendation.max_per_area),
                candidate_multiplier: parse_env_or(
                    "RECOMMEND_CANDIDATE_MULTIPLIER",
                    recommendation.candidate_multiplier,
                ),
                popular_min_rating: parse_env_or(
                    "RECOMMEND_POPULAR_MIN_RATING",
                    recommendation.popular_min_rating,
                ),
                vector_blend_weight: parse_env_or(
                    "RECOMMEND_VECTOR_BLEND_WEIGHT",
                    recommendation.vector_blend_weight,
                ),
                default_limit: parse_env_or("RECOMMEND_DEFAULT_LIMIT", recommendation.default_limit),
            },
            vectors: VectorConfig {
                required_keywords: parse_env_or("VECTOR_REQUIRED_KEYWORDS", vectors.required_keywords),
                min_confidence: parse_env_or("VECTOR_MIN_CONFIDENCE", vectors.min_confidence),
                user_ttl_days: parse_env_or("VECTOR_USER_TTL_DAYS", vectors.user_ttl_days),
                place_ttl_days: parse_env_or("VECTOR_PLACE_TTL_DAYS", vectors.place_ttl_days),
                similarity_ttl_hours: parse_env_or(
                    "VECTOR_SIMILARITY_TTL_HOURS",
                    vectors.similarity_ttl_hours,
                ),
                mbti_boost_factor: parse_env_or("VECTOR_MBTI_BOOST", vectors.mbti_boost_factor),
                max_weighted_similarity: parse_env_or(
                    "VECTOR_MAX_WEIGHTED_SIMILARITY",
                    vectors.max_weighted_similarity,
                ),
                jaccard_confidence_threshold: parse_env_or(
                    "VECTOR_JACCARD_THRESHOLD",
                    vectors.jaccard_confidence_threshold,
                ),
                cleanup_after_days: parse_env_or("VECTOR_CLEANUP_AFTER_DAYS", vectors.cleanup_after_days),
                batch_size: parse_env_or("VECTOR_BATCH_SIZE", vectors.batch_size),
            },
            context: ContextConfig {
                default_max_distance_km: parse_env_or(
                    "CONTEXT_MAX_DISTANCE_KM",
                    context.default_max_distance_km,
                ),
                candidate_cap: parse_env_or("CONTEXT_CANDIDATE_CAP", context.candidate_cap),
                utc_offset_hours: parse_env_or("CONTEXT_UTC_OFFSET_HOURS", context.utc_offset_hours),
                weather_timeout_secs: parse_env_or(
                    "CONTEXT_WEATHER_TIMEOUT_SECS",
                    context.weather_timeout_secs,
                ),
                keyword_timeout_secs: parse_env_or(
                    "CONTEXT_KEYWORD_TIMEOUT_SECS",
                    context.keyword_timeout_secs,
                ),
                vector_min_similarity: parse_env_or(
                    "CONTEXT_VECTOR_MIN_SIMILARITY",
                    context.vector_min_similarity,
                ),
            },
            scheduler: SchedulerConfig {
                enabled: parse_env_or("SIMILARITY_SCHEDULING_ENABLED", true),
                full_recalc_interval_secs: parse_env_or("SIMILARITY_FULL_RECALC_INTERVAL_SECS", 14400),
                top_k_refresh_interval_secs: parse_env_or("SIMILARITY_TOPK_REFRESH_INTERVAL_SECS", 1800),
                vector_batch_interval_secs: parse_env_or("VECTOR_BATCH_INTERVAL_SECS", 86400),
                cleanup_interval_secs: parse_env_or("VECTOR_CLEANUP_INTERVAL_SECS", 86400),
            },
            weather: WeatherConfig {
                provider: env::var("WEATHER_PROVIDER").unwrap_or(weather.provider),
                api_key: env::var("OPENWEATHERMAP_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                base_url: env::var("WEATHER_BASE_URL").ok(),
                timeout_secs: parse_env_or("WEATHER_TIMEOUT", weather.timeout_secs),
                cache_ttl_secs: parse_env_or("WEATHER_CACHE_TTL_SECS", weather.cache_ttl_secs),
                cache_size: parse_env_or("WEATHER_CACHE_SIZE", weather.cache_size),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_similarity_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("SIMILARITY_TOP_K");
        std::env::remove_var("SIMILARITY_DECAY_TAU_DAYS");
        std::env::remove_var("SIMILARITY_DECAY_WINDOW_DAYS");

        let config = Config::default();
        assert_eq!(config.similarity.top_k, 100);
        assert_eq!(config.similarity.same_mbti_weight, 2.0);
        assert_eq!(config.similarity.diff_mbti_weight, 1.0);
        assert_eq!(config.similarity.pair_decay_tau_days, 30.0);
        assert_eq!(config.similarity.pair_decay_window_days, 90.0);
        assert_eq!(config.similarity.jaccard_weight, 0.7);
        assert_eq!(config.similarity.cosine_weight, 0.3);
    }

    #[test]
    fn test_decay_window_follows_tau_unless_set() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("SIMILARITY_DECAY_TAU_DAYS", "10");
        std::env::remove_var("SIMILARITY_DECAY_WINDOW_DAYS");

        let config = Config::default();
        assert_eq!(config.similarity.pair_decay_window_days, 30.0);

        std::env::set_var("SIMILARITY_DECAY_WINDOW_DAYS", "14");
        let config = Config::default();
        assert_eq!(config.similarity.pair_decay_window_days, 14.0);

        std::env::remove_var("SIMILARITY_DECAY_TAU_DAYS");
        std::env::remove_var("SIMILARITY_DECAY_WINDOW_DAYS");
    }

    #[test]
    fn test_freshness_tau_is_independent_of_pair_tau() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("SIMILARITY_DECAY_TAU_DAYS", "45");
        std::env::remove_var("RECOMMEND_FRESHNESS_TAU_DAYS");

        let config = Config::default();
        assert_eq!(config.similarity.pair_decay_tau_days, 45.0);
        assert_eq!(config.recommendation.freshness_tau_days, 7.0);

        std::env::remove_var("SIMILARITY_DECAY_TAU_DAYS");
    }

    #[test]
    fn test_vector_config_defaults() {
        let defaults = VectorConfig::default();
        assert_eq!(defaults.required_keywords, 15);
        assert_eq!(defaults.user_ttl_days, 7);
        assert_eq!(defaults.place_ttl_days, 30);
        assert_eq!(defaults.similarity_ttl_hours, 24);
        assert_eq!(defaults.max_weighted_similarity, 1.5);
    }

    #[test]
    fn test_scheduler_intervals_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("SIMILARITY_FULL_RECALC_INTERVAL_SECS", "60");
        std::env::set_var("SIMILARITY_TOPK_REFRESH_INTERVAL_SECS", "not-a-number");

        let config = Config::default();
        assert_eq!(config.scheduler.full_recalc_interval_secs, 60);
        assert_eq!(config.scheduler.top_k_refresh_interval_secs, 1800);

        std::env::remove_var("SIMILARITY_FULL_RECALC_INTERVAL_SECS");
        std::env::remove_var("SIMILARITY_TOPK_REFRESH_INTERVAL_SECS");
    }

    #[test]
    fn test_llm_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::remove_var("LLM_MODEL");

        let config = Config::default();
        assert!(config.llm.is_none());

        std::env::set_var("LLM_MODEL", "ollama/llama3");
        let config = Config::default();
        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "ollama/llama3");
        assert_eq!(llm.timeout_secs, 30);
        assert_eq!(llm.max_retries, 3);

        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    fn test_blank_weather_key_is_ignored() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("OPENWEATHERMAP_API_KEY", "  ");

        let config = Config::default();
        assert!(config.weather.api_key.is_none());

        std::env::remove_var("OPENWEATHERMAP_API_KEY");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(parse_llm_provider_model("openai/gpt-4o-mini"), ("openai", "gpt-4o-mini"));
        assert_eq!(parse_llm_provider_model("Ollama/llama3"), ("Ollama", "llama3"));
        assert_eq!(parse_llm_provider_model("qwen2.5"), ("local", "qwen2.5"));
        assert_eq!(parse_llm_provider_model("unknown/model"), ("local", "unknown/model"));
    }

    #[test]
    fn test_parse_env_or_valid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }
}
