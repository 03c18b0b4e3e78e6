mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{place, seed_places, temp_db};
use mohe::config::{LlmConfig, VectorConfig};
use mohe::keywords::{KeywordExtractor, PADDING_CONFIDENCE};
use mohe::llm::LlmProvider;
use mohe::models::ExtractionSource;
use mohe::services::VectorService;

const TEN_KEYWORDS: [&str; 10] = [
    "specialty_coffee",
    "dessert_bakery",
    "quiet_space",
    "cozy",
    "free_wifi",
    "power_outlets",
    "study_work",
    "reading",
    "photo_spot",
    "calm_healing",
];

fn llm_config(base_url: String) -> LlmConfig {
    LlmConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

fn keyword_answer(keywords: &[&str]) -> String {
    let entries: Vec<serde_json::Value> = keywords
        .iter()
        .enumerate()
        .map(|(i, keyword)| {
            json!({
                "keyword": keyword,
                "confidence": 0.95 - i as f64 * 0.05,
                "reasoning": "mentioned in the description"
            })
        })
        .collect();
    format!("Here are the keywords:\n{}", serde_json::Value::Array(entries))
}

async fn mount_extraction(server: &MockServer, content: String, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Select exactly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&content)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn short_llm_answer_is_padded_to_required_count() {
    // Given: the model returns 10 valid keywords
    let server = MockServer::start().await;
    mount_extraction(&server, keyword_answer(&TEN_KEYWORDS), 1).await;
    let llm = LlmProvider::new(Some(&llm_config(server.uri())));
    let extractor = KeywordExtractor::new(llm, &VectorConfig::default());

    // When
    let extraction = extractor
        .extract("조용한 스페셜티 커피 카페, 공부하기 좋아요", Some("카페"), None)
        .await;

    // Then: 10 model keywords plus 5 padded ones
    assert_eq!(extraction.extraction_source, ExtractionSource::Llm);
    assert_eq!(extraction.model_name.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(extraction.selected_keywords.len(), 15);
    assert_eq!(extraction.padded, 5);
    assert_eq!(extraction.selected_keywords[0].keyword, "specialty_coffee");

    let padded: Vec<_> = extraction
        .selected_keywords
        .iter()
        .filter(|k| k.confidence == PADDING_CONFIDENCE)
        .collect();
    assert_eq!(padded.len(), 5);
    assert!(padded
        .iter()
        .all(|k| !TEN_KEYWORDS.contains(&k.keyword.as_str())));
}

#[tokio::test]
async fn unknown_keywords_in_answer_are_dropped() {
    let server = MockServer::start().await;
    let mut keywords: Vec<&str> = TEN_KEYWORDS.to_vec();
    keywords.push("not_a_catalog_keyword");
    mount_extraction(&server, keyword_answer(&keywords), 1).await;
    let llm = LlmProvider::new(Some(&llm_config(server.uri())));
    let extractor = KeywordExtractor::new(llm, &VectorConfig::default());

    let extraction = extractor.extract("a quiet cafe", None, None).await;

    assert_eq!(extraction.selected_keywords.len(), 15);
    assert!(extraction
        .selected_keywords
        .iter()
        .all(|k| k.keyword != "not_a_catalog_keyword"));
}

#[tokio::test]
async fn llm_failure_falls_back_to_rule_based_matching() {
    // Given: the provider answers with a server error
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "boom", "type": "server_error", "param": null, "code": "internal"}
        })))
        .mount(&server)
        .await;
    let llm = LlmProvider::new(Some(&llm_config(server.uri())));
    let extractor = KeywordExtractor::new(llm, &VectorConfig::default());

    // When
    let extraction = extractor
        .extract("specialty coffee with free wifi and power outlets", Some("카페"), None)
        .await;

    // Then
    assert_eq!(extraction.extraction_source, ExtractionSource::RuleBasedFallback);
    assert_eq!(extraction.model_name.as_deref(), Some("internal"));
    assert_eq!(extraction.selected_keywords.len(), 15);
    assert!(extraction
        .selected_keywords
        .iter()
        .any(|k| k.keyword == "specialty_coffee"));
}

#[tokio::test]
async fn place_vector_is_reused_until_forced() {
    // Given: one place and a model that must be called exactly twice
    let server = MockServer::start().await;
    mount_extraction(&server, keyword_answer(&TEN_KEYWORDS), 2).await;
    let (db, _tmp) = temp_db().await;
    let mut cafe = place(7, "카페", 4.5, 80);
    cafe.description = Some("Hand-drip coffee and a quiet reading corner".to_string());
    seed_places(&db, &[cafe]).await;

    let config = VectorConfig::default();
    let llm = LlmProvider::new(Some(&llm_config(server.uri())));
    let vectors = VectorService::new(db.clone(), KeywordExtractor::new(llm, &config), config);

    // When
    let first = vectors.generate_place_vector(7, false).await.unwrap();
    let cached = vectors.generate_place_vector(7, false).await.unwrap();
    let forced = vectors.generate_place_vector(7, true).await.unwrap();

    // Then
    assert_eq!(first.version, 1);
    assert_eq!(cached.version, 1);
    assert_eq!(forced.version, 2);
    assert_eq!(first.selected_keywords.len(), 15);
    let norm: f64 = first.vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-9, "vector should be unit length, got {norm}");
}

#[tokio::test]
async fn query_keywords_come_from_the_model_when_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("search keywords"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("rainy day, cafe, quiet, cafe")),
        )
        .mount(&server)
        .await;
    let llm = LlmProvider::new(Some(&llm_config(server.uri())));
    let extractor = KeywordExtractor::new(llm, &VectorConfig::default());

    let keywords = extractor
        .extract_query_keywords("비 오는 날 갈만한 카페", std::time::Duration::from_secs(2))
        .await;

    assert_eq!(keywords, vec!["rainy day", "cafe", "quiet"]);
}

#[tokio::test]
async fn query_keywords_fall_back_without_a_model() {
    let extractor = KeywordExtractor::new(LlmProvider::new(None), &VectorConfig::default());

    let keywords = extractor
        .extract_query_keywords("조용한 카페", std::time::Duration::from_secs(1))
        .await;

    assert!(keywords.contains(&"cafe".to_string()));
}
