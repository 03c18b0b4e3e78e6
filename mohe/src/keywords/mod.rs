pub mod catalog;
mod extractor;
pub mod text;

pub use catalog::{KeywordCatalog, KeywordCategory, KeywordDefinition};
pub use extractor::{
    fallback_query_keywords, parse_query_keywords, KeywordExtraction, KeywordExtractor,
    PADDING_CONFIDENCE,
};
