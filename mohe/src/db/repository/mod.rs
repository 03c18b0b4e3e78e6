mod bookmarks;
mod places;
mod similarities;
mod top_k;
mod users;
mod vector_similarities;
mod vectors;

pub use bookmarks::{BookmarkRepository, MbtiWeights};
pub use places::{GeoBounds, PlaceRepository};
pub use similarities::SimilarityRepository;
pub use top_k::TopKRepository;
pub use users::UserRepository;
pub use vector_similarities::VectorSimilarityRepository;
pub use vectors::VectorRepository;
