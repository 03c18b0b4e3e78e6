use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::keywords::KeywordExtractor;
use crate::llm::LlmProvider;
use crate::services::{
    ContextualService, RecommendationService, SimilarityScheduler, SimilarityService,
    TopKService, VectorService,
};
use crate::weather::WeatherProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub llm: LlmProvider,
    pub weather: WeatherProvider,
    pub similarity: SimilarityService,
    pub top_k: TopKService,
    pub vectors: VectorService,
    pub recommendations: RecommendationService,
    pub contextual: ContextualService,
    pub scheduler: SimilarityScheduler,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        llm: LlmProvider,
        weather: WeatherProvider,
        cancel: CancellationToken,
    ) -> Self {
        let config = Arc::new(config);
        let similarity = SimilarityService::new(db.clone(), config.similarity.clone());
        let top_k = TopKService::new(db.clone(), config.similarity.clone());
        let extractor = KeywordExtractor::new(llm.clone(), &config.vectors);
        let vectors = VectorService::new(db.clone(), extractor.clone(), config.vectors.clone());
        let recommendations = RecommendationService::new(
            db.clone(),
            config.recommendation.clone(),
            &config.similarity,
            config.vectors.similarity_ttl_hours,
        );
        let contextual = ContextualService::new(
            db.clone(),
            weather.clone(),
            extractor,
            config.context.clone(),
        );
        let scheduler =
            SimilarityScheduler::new(db.clone(), similarity.clone(), top_k.clone(), cancel);

        Self {
            config,
            db,
            llm,
            weather,
            similarity,
            top_k,
            vectors,
            recommendations,
            contextual,
            scheduler,
        }
    }
}
