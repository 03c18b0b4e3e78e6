//! Prompt templates for keyword extraction.
//!
//! Templates use plain `format!()` interpolation.

use crate::keywords::KeywordCatalog;

/// System message for catalog keyword selection.
pub const KEYWORD_SYSTEM_PROMPT: &str = "You are an expert at characterising places and people \
with a fixed keyword catalog. You only ever answer with the JSON requested.";

/// Build the prompt asking the model to pick exactly `required` catalog keywords for `text`.
///
/// # Example
/// ```
/// use mohe::keywords::KeywordCatalog;
/// use mohe::llm::prompts::keyword_extraction_prompt;
///
/// let prompt = keyword_extraction_prompt("quiet cafe with good coffee", KeywordCatalog::builtin(), Some("INFJ"), 15);
/// assert!(prompt.contains("1. specialty_coffee - "));
/// assert!(prompt.contains("User MBTI Type: INFJ"));
/// ```
pub fn keyword_extraction_prompt(
    text: &str,
    catalog: &KeywordCatalog,
    mbti: Option<&str>,
    required: usize,
) -> String {
    let keyword_list = catalog
        .iter()
        .map(|k| format!("{}. {} - {}", k.id, k.keyword, k.definition))
        .collect::<Vec<_>>()
        .join("\n");

    let mbti_line = mbti
        .map(|m| format!("\nUser MBTI Type: {m} (consider MBTI-specific preferences in keyword selection)"))
        .unwrap_or_default();

    format!(
        r#"Select exactly {required} keywords from the catalog below that best describe the following text.
Use the keyword names exactly as written in the catalog.

Keyword catalog:
{keyword_list}

Text:
{text}{mbti_line}

Respond with a JSON array only, ordered by confidence. Example format:
[
  {{"keyword": "specialty_coffee", "confidence": 0.92, "reasoning": "mentions hand drip coffee"}},
  {{"keyword": "quiet_space", "confidence": 0.81, "reasoning": "described as calm"}}
]"#
    )
}

/// Build the prompt extracting 3-5 search keywords from a free-form place query.
pub fn query_keywords_prompt(query: &str) -> String {
    format!(
        r#"Extract 3 to 5 short search keywords from the following place search query.
Answer with the keywords separated by commas and nothing else.

Query: {query}"#
    )
}
