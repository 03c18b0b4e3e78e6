use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::config::VectorConfig;
use crate::error::{MoheError, Result};
use crate::keywords::catalog::{KeywordCatalog, KeywordDefinition};
use crate::keywords::text::{preprocess, prompt_hash};
use crate::llm::prompts::{keyword_extraction_prompt, query_keywords_prompt, KEYWORD_SYSTEM_PROMPT};
use crate::llm::{CompletionOptions, LlmProvider};
use crate::models::{ExtractionSource, SelectedKeyword};

/// Confidence given to keywords added only to reach the required count.
pub const PADDING_CONFIDENCE: f64 = 0.2;

const DIRECT_MATCH_SCORE: f64 = 0.8;
const MAX_QUERY_KEYWORDS: usize = 5;
const MAX_FALLBACK_QUERY_WORDS: usize = 3;

static FALLBACK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\w+(?:_\w+)*)\s*[:\-]\s*(0\.\d+|\d\.\d+)",
        r"(\w+(?:_\w+)*)\s*\(([0-9.]+)\)",
        r#""(\w+(?:_\w+)*)"\s*:\s*([0-9.]+)"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("keyword fallback regex must compile"))
    .collect()
});

const QUERY_FALLBACKS: &[(&str, &[&str])] = &[
    ("카페", &["cafe", "coffee", "study", "quiet"]),
    ("레스토랑", &["restaurant", "food", "dining", "meal"]),
    ("음식", &["food", "eat", "taste", "meal"]),
    ("공원", &["park", "outdoor", "nature", "walk"]),
    ("박물관", &["museum", "culture", "art", "indoor"]),
    ("쇼핑", &["shopping", "store", "mall", "buy"]),
];

/// Result of selecting catalog keywords for one owner text.
#[derive(Debug, Clone)]
pub struct KeywordExtraction {
    pub normalized_text: String,
    pub selected_keywords: Vec<SelectedKeyword>,
    pub raw_response: Option<String>,
    pub extraction_source: ExtractionSource,
    pub model_name: Option<String>,
    pub prompt_hash: String,
    /// Mean confidence of the selected keywords.
    pub confidence: f64,
    /// How many keywords had to be padded in.
    pub padded: usize,
}

/// Selects exactly `required_keywords` catalog keywords for a text.
///
/// The LLM is tried first. Its answer is parsed leniently; anything that
/// cannot be parsed at all falls back to rule-based matching over the
/// catalog. Shortfalls are padded deterministically.
#[derive(Clone)]
pub struct KeywordExtractor {
    llm: LlmProvider,
    catalog: &'static KeywordCatalog,
    required: usize,
    min_confidence: f64,
}

impl KeywordExtractor {
    pub fn new(llm: LlmProvider, config: &VectorConfig) -> Self {
        Self {
            llm,
            catalog: KeywordCatalog::builtin(),
            required: config.required_keywords,
            min_confidence: config.min_confidence,
        }
    }

    pub fn catalog(&self) -> &'static KeywordCatalog {
        self.catalog
    }

    pub fn is_llm_available(&self) -> bool {
        self.llm.is_available()
    }

    /// Extract keywords for `text`. `category` picks the padding list.
    pub async fn extract(
        &self,
        text: &str,
        category: Option<&str>,
        mbti: Option<&str>,
    ) -> KeywordExtraction {
        let normalized_text = preprocess(text);
        let prompt = keyword_extraction_prompt(&normalized_text, self.catalog, mbti, self.required);
        let hash = prompt_hash(&prompt);
        let rule_matches = self.rule_based(&normalized_text);

        let mut raw_response = None;
        let mut from_llm = Vec::new();

        if self.llm.is_available() {
            let options = CompletionOptions {
                temperature: Some(0.3),
                top_p: Some(0.8),
                max_tokens: Some(800),
                stop: None,
            };
            match self
                .llm
                .complete(&prompt, Some(KEYWORD_SYSTEM_PROMPT), Some(&options))
                .await
            {
                Ok(raw) => {
                    from_llm = self.parse_response(&raw);
                    if from_llm.is_empty() {
                        tracing::warn!("Keyword extraction response could not be parsed, using rule-based fallback");
                    }
                    raw_response = Some(raw);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Keyword extraction failed, using rule-based fallback");
                }
            }
        }

        let (extraction_source, model_name, selected) = if from_llm.is_empty() {
            (ExtractionSource::RuleBasedFallback, Some("internal".to_string()), rule_matches.clone())
        } else {
            (
                ExtractionSource::Llm,
                self.llm.model_name().map(String::from),
                from_llm,
            )
        };

        let before = selected.len();
        let selected_keywords = self.pad(selected, &rule_matches, category);
        let padded = selected_keywords.len().saturating_sub(before);
        if padded > 0 {
            tracing::warn!(
                valid = before,
                padded,
                required = self.required,
                source = %extraction_source,
                "Keyword extraction returned too few keywords, padded with fallbacks"
            );
        }

        let confidence = mean_confidence(&selected_keywords);

        KeywordExtraction {
            normalized_text,
            selected_keywords,
            raw_response,
            extraction_source,
            model_name,
            prompt_hash: hash,
            confidence,
            padded,
        }
    }

    /// Parse an extraction answer. Unknown keywords and low confidences are dropped.
    pub fn parse_response(&self, raw: &str) -> Vec<SelectedKeyword> {
        let from_json = self.parse_json_array(raw).unwrap_or_default();
        let parsed = if from_json.is_empty() {
            self.parse_with_patterns(raw)
        } else {
            from_json
        };
        self.finalize(parsed)
    }

    fn parse_json_array(&self, raw: &str) -> Option<Vec<SelectedKeyword>> {
        let start = raw.find('[')?;
        let end = raw.rfind(']')?;
        if end <= start {
            return None;
        }

        let entries: Vec<Value> = match serde_json::from_str(&raw[start..=end]) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(error = %e, "Keyword response is not a JSON array");
                return None;
            }
        };

        let keywords = entries
            .iter()
            .filter_map(|entry| {
                let keyword = entry.get("keyword")?.as_str()?;
                let confidence = entry.get("confidence").and_then(|c| {
                    c.as_f64()
                        .or_else(|| c.as_str().and_then(|s| s.trim().parse().ok()))
                })?;
                let reasoning = entry
                    .get("reasoning")
                    .and_then(Value::as_str)
                    .map(String::from);
                self.accept(keyword, confidence, reasoning)
            })
            .collect();

        Some(keywords)
    }

    fn parse_with_patterns(&self, raw: &str) -> Vec<SelectedKeyword> {
        let lower = raw.to_lowercase();
        let mut keywords = Vec::new();

        for pattern in FALLBACK_PATTERNS.iter() {
            for captures in pattern.captures_iter(&lower) {
                let confidence = captures[2].parse::<f64>().unwrap_or(0.0);
                if let Some(keyword) = self.accept(&captures[1], confidence, None) {
                    keywords.push(keyword);
                }
            }
        }

        keywords
    }

    fn accept(&self, name: &str, confidence: f64, reasoning: Option<String>) -> Option<SelectedKeyword> {
        let definition = self.catalog.find(name)?;
        if !confidence.is_finite() || confidence < self.min_confidence {
            return None;
        }
        Some(SelectedKeyword {
            keyword_id: definition.id,
            keyword: definition.keyword.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning,
        })
    }

    /// Deduplicate by id keeping the most confident entry, then cut to the required count.
    fn finalize(&self, keywords: Vec<SelectedKeyword>) -> Vec<SelectedKeyword> {
        let mut unique: Vec<SelectedKeyword> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            match unique.iter_mut().find(|k| k.keyword_id == keyword.keyword_id) {
                Some(existing) if existing.confidence < keyword.confidence => *existing = keyword,
                Some(_) => {}
                None => unique.push(keyword),
            }
        }
        unique.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.keyword_id.cmp(&b.keyword_id))
        });
        unique.truncate(self.required);
        unique
    }

    /// Score every catalog keyword against the text by direct mention and synonyms.
    pub fn rule_based(&self, normalized_text: &str) -> Vec<SelectedKeyword> {
        let matches = self.rule_matches(&normalized_text.to_lowercase());
        self.finalize(matches)
    }

    fn rule_matches(&self, lower_text: &str) -> Vec<SelectedKeyword> {
        self.catalog
            .iter()
            .filter_map(|definition| {
                let score = self.match_score(lower_text, definition);
                (score >= self.min_confidence).then(|| SelectedKeyword {
                    keyword_id: definition.id,
                    keyword: definition.keyword.to_string(),
                    confidence: score,
                    reasoning: Some("matched in text".to_string()),
                })
            })
            .collect()
    }

    /// Catalog-space vector for a search query and its extracted keywords.
    ///
    /// Only keywords the text actually mentions are set; there is no padding.
    /// Returns `None` when the text mentions no catalog keyword.
    pub fn query_vector(&self, query: &str, keywords: &[String]) -> Result<Option<Vec<f64>>> {
        let text = preprocess(&format!("{query} {}", keywords.join(" "))).to_lowercase();
        let matches = self.finalize(self.rule_matches(&text));
        if matches.is_empty() {
            return Ok(None);
        }
        self.build_vector(&matches).map(Some)
    }

    fn match_score(&self, lower_text: &str, definition: &KeywordDefinition) -> f64 {
        let mut score = 0.0;
        if lower_text.contains(&definition.keyword.replace('_', " ")) {
            score += DIRECT_MATCH_SCORE;
        }
        if let Some((synonym_score, phrases)) = self.catalog.synonyms(definition.keyword) {
            if phrases.iter().any(|phrase| lower_text.contains(phrase)) {
                score += synonym_score;
            }
        }
        (score * definition.weight_boost).min(1.0)
    }

    fn pad(
        &self,
        mut selected: Vec<SelectedKeyword>,
        rule_matches: &[SelectedKeyword],
        category: Option<&str>,
    ) -> Vec<SelectedKeyword> {
        if selected.len() >= self.required {
            selected.truncate(self.required);
            return selected;
        }

        let from_rules = rule_matches
            .iter()
            .filter_map(|k| self.catalog.get(k.keyword_id));
        let candidates = from_rules
            .chain(self.catalog.category_defaults(category))
            .chain(self.catalog.iter());

        for definition in candidates {
            if selected.len() >= self.required {
                break;
            }
            if selected.iter().any(|k| k.keyword_id == definition.id) {
                continue;
            }
            selected.push(SelectedKeyword {
                keyword_id: definition.id,
                keyword: definition.keyword.to_string(),
                confidence: PADDING_CONFIDENCE,
                reasoning: Some("fallback padding".to_string()),
            });
        }

        selected
    }

    /// Dense, L2-normalised vector with one position per catalog keyword.
    pub fn build_vector(&self, keywords: &[SelectedKeyword]) -> Result<Vec<f64>> {
        let mut vector = vec![0.0; self.catalog.len()];

        for keyword in keywords {
            let definition = self.catalog.get(keyword.keyword_id).ok_or_else(|| {
                MoheError::InvariantViolation(format!(
                    "Keyword id {} is not in the catalog",
                    keyword.keyword_id
                ))
            })?;
            vector[definition.id as usize - 1] =
                (keyword.confidence * definition.weight_boost).min(1.0);
        }

        let magnitude = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if magnitude > 0.0 {
            vector.iter_mut().for_each(|v| *v /= magnitude);
        }

        self.check_vector(&vector)?;
        Ok(vector)
    }

    /// A vector must match the catalog dimension and contain only finite values.
    pub fn check_vector(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.catalog.len() {
            return Err(MoheError::InvariantViolation(format!(
                "Vector dimension {} does not match catalog size {}",
                vector.len(),
                self.catalog.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(MoheError::InvariantViolation(
                "Vector contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Short search keywords for a free-form query, bounded by `timeout`.
    pub async fn extract_query_keywords(&self, query: &str, timeout: Duration) -> Vec<String> {
        if self.llm.is_available() {
            let options = CompletionOptions {
                temperature: Some(0.3),
                top_p: Some(0.9),
                max_tokens: Some(100),
                stop: None,
            };
            let prompt = query_keywords_prompt(query);
            match tokio::time::timeout(timeout, self.llm.complete(&prompt, None, Some(&options))).await {
                Ok(Ok(raw)) => {
                    let keywords = parse_query_keywords(&raw);
                    if !keywords.is_empty() {
                        return keywords;
                    }
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "Query keyword extraction failed"),
                Err(_) => tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Query keyword extraction timed out"
                ),
            }
        }

        fallback_query_keywords(query)
    }
}

/// Split a comma-separated keyword answer into at most five distinct keywords.
pub fn parse_query_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for part in raw.split([',', ';', '\n']) {
        let keyword = part
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '-' || c == '*' || c == '.')
            .trim()
            .to_lowercase();
        if keyword.chars().count() > 2 && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
        if keywords.len() >= MAX_QUERY_KEYWORDS {
            break;
        }
    }
    keywords
}

/// Keywords derived from the query alone.
pub fn fallback_query_keywords(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    for (term, expansions) in QUERY_FALLBACKS {
        if lower.contains(term) {
            for expansion in expansions.iter() {
                if !keywords.iter().any(|k| k == expansion) {
                    keywords.push(expansion.to_string());
                }
            }
        }
    }
    if !keywords.is_empty() {
        keywords.truncate(MAX_QUERY_KEYWORDS);
        return keywords;
    }

    let mut words: Vec<String> = Vec::new();
    for word in lower.split([' ', ',', '.', '!']).map(str::trim) {
        if word.chars().count() > 2 && !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
        if words.len() >= MAX_FALLBACK_QUERY_WORDS {
            break;
        }
    }
    words
}

fn mean_confidence(keywords: &[SelectedKeyword]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    keywords.iter().map(|k| k.confidence).sum::<f64>() / keywords.len() as f64
}
