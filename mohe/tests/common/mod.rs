#![allow(dead_code)]

use std::sync::Arc;

use mohe::config::DatabaseConfig;
use mohe::db::{Database, DatabaseBackend, LibSqlBackend};
use mohe::models::{Bookmark, Place, User};
use tempfile::TempDir;

/// Fresh database in a temp dir. Keep the dir alive for the test.
pub async fn temp_db() -> (Arc<dyn DatabaseBackend>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("mohe_test.db");
    let config = DatabaseConfig::local(db_path.to_str().unwrap());
    let db = Database::new(&config).await.expect("Failed to open database");
    let backend: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(db));
    (backend, temp_dir)
}

const DISTRICTS: [&str; 5] = ["마포구", "용산구", "종로구", "강남구", "성동구"];

pub fn place(id: i64, category: &str, rating: f64, review_count: i64) -> Place {
    let mut place = Place::new(id, format!("{category} {id}"));
    place.category = Some(category.to_string());
    place.location = Some(format!("서울특별시 {}", DISTRICTS[id.rem_euclid(5) as usize]));
    place.rating = rating;
    place.review_count = review_count;
    place
}

pub async fn seed_users(db: &Arc<dyn DatabaseBackend>, users: &[(i64, &str)]) {
    for (id, mbti) in users {
        db.upsert_user(&User::new(*id).with_mbti(*mbti)).await.unwrap();
    }
}

pub async fn seed_places(db: &Arc<dyn DatabaseBackend>, places: &[Place]) {
    for place in places {
        db.upsert_place(place).await.unwrap();
    }
}

/// Bookmark each (user, place), stamping the user's MBTI.
pub async fn seed_bookmarks(db: &Arc<dyn DatabaseBackend>, pairs: &[(i64, i64)]) {
    for (user_id, place_id) in pairs {
        let mbti = db
            .get_user(*user_id)
            .await
            .unwrap()
            .and_then(|u| u.mbti_code());
        db.add_bookmark(&Bookmark::new(*user_id, *place_id, mbti))
            .await
            .unwrap();
    }
}
