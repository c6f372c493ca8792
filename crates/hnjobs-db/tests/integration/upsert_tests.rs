use chrono::{DateTime, TimeZone, Utc};
use hnjobs_core::models::{JobFields, UpsertOutcome};
use hnjobs_core::traits::JobStore;
use hnjobs_db::{Database, JobRepository};

use crate::integration::common::setup_test_db;

fn fields(company: &str, role: Option<&str>) -> JobFields {
    JobFields {
        company: Some(company.into()),
        role: role.map(Into::into),
        description: Some("Build things".into()),
        ..Default::default()
    }
}

fn at(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[tokio::test]
async fn insert_then_get() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let outcome = repo
        .upsert(43_858_554, &fields("Acme", Some("Engineer")), at(1_746_108_000))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);

    let row = repo
        .get(43_858_554)
        .await
        .unwrap()
        .expect("Should find the posting");
    assert_eq!(row.external_id, 43_858_554);
    assert_eq!(row.fields.company.as_deref(), Some("Acme"));
    assert_eq!(row.fields.role.as_deref(), Some("Engineer"));
    assert_eq!(row.fields.location, None);
    assert_eq!(row.posted_at, at(1_746_108_000));
}

#[tokio::test]
async fn second_upsert_overwrites_in_place() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    repo.upsert(7, &fields("Acme", Some("Engineer")), at(1_746_108_000))
        .await
        .unwrap();
    let first = repo.get(7).await.unwrap().unwrap();

    // Small delay to ensure different timestamps
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let outcome = repo
        .upsert(7, &fields("Acme Corp", None), at(1_746_108_000))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let second = repo.get(7).await.unwrap().unwrap();
    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(second.fields.company.as_deref(), Some("Acme Corp"));
    // Overwritten, not merged.
    assert_eq!(second.fields.role, None);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn empty_record_writes_nothing() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let blank = JobFields {
        description: Some("   ".into()),
        ..JobFields::empty()
    };
    assert_eq!(
        repo.upsert(1, &JobFields::empty(), at(0)).await.unwrap(),
        UpsertOutcome::Skipped
    );
    assert_eq!(repo.upsert(2, &blank, at(0)).await.unwrap(), UpsertOutcome::Skipped);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_posted_at_keeps_stored_value() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    repo.upsert(9, &fields("Acme", None), at(1_746_108_000))
        .await
        .unwrap();
    repo.upsert(9, &fields("Acme", Some("Engineer")), None)
        .await
        .unwrap();

    let row = repo.get(9).await.unwrap().unwrap();
    assert_eq!(row.posted_at, at(1_746_108_000));
    assert_eq!(row.fields.role.as_deref(), Some("Engineer"));

    repo.upsert(9, &fields("Acme", None), at(1_746_200_000))
        .await
        .unwrap();
    let row = repo.get(9).await.unwrap().unwrap();
    assert_eq!(row.posted_at, at(1_746_200_000));
}

#[tokio::test]
async fn export_orders_newest_first_nulls_last() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    repo.upsert(1, &fields("Old", None), at(1_700_000_000)).await.unwrap();
    repo.upsert(2, &fields("Undated", None), None).await.unwrap();
    repo.upsert(3, &fields("New", None), at(1_750_000_000)).await.unwrap();

    let ids: Vec<i64> = repo
        .list_for_export()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.external_id)
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn job_store_trait_delegates_to_repository() {
    let (pool, _container) = setup_test_db().await;
    let store = JobRepository::new(pool);

    let outcome = JobStore::upsert(&store, 11, &fields("Acme", None), None)
        .await
        .unwrap();
    assert!(outcome.is_write());
    assert!(store.get(11).await.unwrap().is_some());
}

#[tokio::test]
async fn migrations_apply_and_repo_is_healthy() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);

    db.migrate().await.unwrap();
    let repo = db.job_repo();
    repo.health_check().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 0);
}
