//! Unit tests for the in-memory token store

use chrono::{Duration, Utc};

use crate::domain::entities::{PrincipalId, TokenRecord};
use crate::errors::DomainError;
use crate::repositories::token::{InMemoryTokenStore, TokenStore};

fn record(principal: &str, refresh: &str) -> TokenRecord {
    TokenRecord::issue(
        PrincipalId::from(principal),
        refresh.to_string(),
        format!("access-for-{}", refresh),
        Utc::now(),
        Duration::days(1),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_and_find() {
    let store = InMemoryTokenStore::new();
    let saved = store.create(record("user-a", "r1")).await.unwrap();

    let by_value = store.find_by_refresh_value("r1").await.unwrap().unwrap();
    assert_eq!(by_value, saved);

    let by_principal = store
        .find_by_principal(&PrincipalId::from("user-a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_principal.id, saved.id);

    assert!(store.find_by_refresh_value("missing").await.unwrap().is_none());
    assert!(store
        .find_by_principal(&PrincipalId::from("user-b"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_refresh_value_conflicts() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "same")).await.unwrap();

    let result = store.create(record("user-b", "same")).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn test_refresh_value_is_never_accepted_twice_even_after_delete() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "once")).await.unwrap();
    assert!(store.delete("once").await.unwrap());

    let result = store.create(record("user-a", "once")).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn test_second_record_for_principal_conflicts() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "r1")).await.unwrap();

    let result = store.create(record("user-a", "r2")).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));
    assert_eq!(store.len().await, 1);

    // The rejected value was never accepted, so it stays usable.
    store.delete("r1").await.unwrap();
    store.create(record("user-a", "r2")).await.unwrap();
}

#[tokio::test]
async fn test_delete_is_delete_if_present() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "r1")).await.unwrap();

    assert!(store.delete("r1").await.unwrap());
    assert!(!store.delete("r1").await.unwrap());
    assert!(!store.contains("r1").await.unwrap());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_update_flips_revoked() {
    let store = InMemoryTokenStore::new();
    let mut saved = store.create(record("user-a", "r1")).await.unwrap();

    saved.revoke();
    assert!(store.update(saved).await.unwrap());

    let found = store.find_by_refresh_value("r1").await.unwrap().unwrap();
    assert!(found.revoked);
}

#[tokio::test]
async fn test_update_missing_record_returns_false() {
    let store = InMemoryTokenStore::new();
    assert!(!store.update(record("user-a", "ghost")).await.unwrap());
}

#[tokio::test]
async fn test_rotate_swaps_records() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "old")).await.unwrap();

    assert!(store.rotate("old", record("user-a", "new")).await.unwrap());

    assert!(store.find_by_refresh_value("old").await.unwrap().is_none());
    let current = store
        .find_by_principal(&PrincipalId::from("user-a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.refresh_value, "new");
}

#[tokio::test]
async fn test_rotate_consumed_value_only_once() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "old")).await.unwrap();

    assert!(store.rotate("old", record("user-a", "new-1")).await.unwrap());
    assert!(!store.rotate("old", record("user-a", "new-2")).await.unwrap());

    assert_eq!(store.len().await, 1);
    assert!(store.find_by_refresh_value("new-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rotate_refuses_revoked_record() {
    let store = InMemoryTokenStore::new();
    let mut saved = store.create(record("user-a", "old")).await.unwrap();
    saved.revoke();
    store.update(saved).await.unwrap();

    assert!(!store.rotate("old", record("user-a", "new")).await.unwrap());
    assert!(store.find_by_refresh_value("new").await.unwrap().is_none());
    assert!(store.contains("old").await.unwrap());
}

#[tokio::test]
async fn test_rotate_conflict_keeps_old_record() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "old")).await.unwrap();

    let result = store.rotate("old", record("user-a", "old")).await;

    assert!(matches!(result, Err(DomainError::Conflict { .. })));
    assert!(store.find_by_refresh_value("old").await.unwrap().is_some());
}

#[tokio::test]
async fn test_rotate_rejects_foreign_principal() {
    let store = InMemoryTokenStore::new();
    store.create(record("user-a", "old")).await.unwrap();

    let result = store.rotate("old", record("user-b", "new")).await;

    assert!(matches!(result, Err(DomainError::Internal { .. })));
    assert!(store.contains("old").await.unwrap());
}

#[tokio::test]
async fn test_purge_removes_expired_and_revoked() {
    let store = InMemoryTokenStore::new();
    let now = Utc::now();

    let mut expired = record("user-a", "expired");
    expired.expires_at = now - Duration::seconds(1);
    let mut boundary = record("user-b", "boundary");
    boundary.expires_at = now;
    let mut revoked = record("user-c", "revoked");
    revoked.revoke();
    let live = record("user-d", "live");

    for r in [expired, boundary, revoked, live] {
        store.create(r).await.unwrap();
    }

    let purged = store.purge(now).await.unwrap();

    assert_eq!(purged, 3);
    assert_eq!(store.len().await, 1);
    assert!(store.contains("live").await.unwrap());
    // Purged principals can be issued again.
    store.create(record("user-a", "fresh")).await.unwrap();
}

#[tokio::test]
async fn test_find_by_principal_follows_index_through_lifecycle() {
    let store = InMemoryTokenStore::new();
    let principal = PrincipalId::from("user-a");
    for i in 0..50 {
        store
            .create(record(&format!("other-{}", i), &format!("other-value-{}", i)))
            .await
            .unwrap();
    }
    store.create(record("user-a", "first")).await.unwrap();

    store.rotate("first", record("user-a", "second")).await.unwrap();
    let current = store.find_by_principal(&principal).await.unwrap().unwrap();
    assert_eq!(current.refresh_value, "second");

    store.delete("second").await.unwrap();
    assert!(store.find_by_principal(&principal).await.unwrap().is_none());

    store.purge(Utc::now() + Duration::days(2)).await.unwrap();
    assert!(store
        .find_by_principal(&PrincipalId::from("other-7"))
        .await
        .unwrap()
        .is_none());
}
