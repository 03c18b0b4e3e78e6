mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use common::{place, seed_bookmarks, seed_places, seed_users, temp_db};
use mohe::config::SimilarityConfig;
use mohe::db::DatabaseBackend;
use mohe::services::{
    FullRecalculationManager, RecalculationOutcome, SimilarityScheduler, SimilarityService,
    TopKRefreshManager, TopKService,
};

fn scheduler(db: &Arc<dyn DatabaseBackend>, cancel: CancellationToken) -> SimilarityScheduler {
    let config = SimilarityConfig::default();
    SimilarityScheduler::new(
        db.clone(),
        SimilarityService::new(db.clone(), config.clone()),
        TopKService::new(db.clone(), config),
        cancel,
    )
}

async fn seed(db: &Arc<dyn DatabaseBackend>) {
    seed_users(db, &[(1, "INFP"), (2, "ENTJ")]).await;
    seed_places(
        db,
        &[place(1, "카페", 4.0, 10), place(2, "카페", 4.1, 10), place(3, "공원", 4.2, 10)],
    )
    .await;
    seed_bookmarks(db, &[(1, 1), (1, 2), (2, 2), (2, 3)]).await;
}

#[tokio::test]
#[serial]
async fn full_pass_fills_similarities_and_neighbor_lists() {
    // Given
    let (db, _tmp) = temp_db().await;
    seed(&db).await;
    let scheduler = scheduler(&db, CancellationToken::new());

    // When
    let outcome = scheduler.run_full_recalculation().await.unwrap();

    // Then: pairs (1,2) and (2,3) exist, both directions are cached
    let RecalculationOutcome::Completed(report) = outcome else {
        panic!("expected a completed pass");
    };
    assert_eq!(report.pairs_written, 2);
    assert!(!report.cancelled);
    assert_eq!(db.count_similarities().await.unwrap(), 2);
    assert_eq!(db.count_top_k().await.unwrap(), 4);

    let neighbors: Vec<i64> = db
        .get_top_k(2, 10)
        .await
        .unwrap()
        .iter()
        .map(|e| e.neighbor_place_id)
        .collect();
    assert_eq!(neighbors.len(), 2);
    assert!(neighbors.contains(&1) && neighbors.contains(&3));
    assert!(!scheduler.is_calculation_running());
}

#[tokio::test]
#[serial]
async fn second_pass_reports_already_running() {
    // Given: a pass holds the flag
    let (db, _tmp) = temp_db().await;
    seed(&db).await;
    let scheduler = scheduler(&db, CancellationToken::new());
    let guard = scheduler.flag().acquire().expect("flag should be free");

    // When
    let outcome = scheduler.run_full_recalculation().await.unwrap();
    let triggered = scheduler.trigger_full_recalculation();
    let manager_pairs = FullRecalculationManager::new(scheduler.clone(), 60)
        .run_once()
        .await
        .unwrap();

    // Then
    assert_eq!(outcome, RecalculationOutcome::AlreadyRunning);
    assert!(!triggered);
    assert_eq!(manager_pairs, 0);
    assert_eq!(db.count_similarities().await.unwrap(), 0);

    drop(guard);
    assert!(!scheduler.is_calculation_running());
}

#[tokio::test]
#[serial]
async fn cancelled_pass_removes_nothing() {
    let (db, _tmp) = temp_db().await;
    seed(&db).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let scheduler = scheduler(&db, cancel);

    let outcome = scheduler.run_full_recalculation().await.unwrap();

    let RecalculationOutcome::Completed(report) = outcome else {
        panic!("expected a completed outcome");
    };
    assert!(report.cancelled);
    assert_eq!(report.pairs_removed, 0);
    assert!(!scheduler.is_calculation_running());
}

#[tokio::test]
#[serial]
async fn dirty_places_are_refreshed_incrementally() {
    // Given: no similarities yet, place 2 marked dirty
    let (db, _tmp) = temp_db().await;
    seed(&db).await;
    let scheduler = scheduler(&db, CancellationToken::new());
    scheduler.mark_dirty([2]);
    assert_eq!(scheduler.dirty_count(), 1);

    // When
    let refreshed = TopKRefreshManager::new(scheduler.clone(), 60)
        .run_once()
        .await
        .unwrap();

    // Then: place 2 and its neighbors got neighbor lists
    assert!(refreshed >= 1);
    assert_eq!(scheduler.dirty_count(), 0);
    assert_eq!(db.count_similarities().await.unwrap(), 2);
    assert_eq!(db.get_top_k(2, 10).await.unwrap().len(), 2);
}
