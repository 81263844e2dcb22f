use std::sync::Arc;

use crate::domain::entities::PrincipalId;
use crate::repositories::{InMemoryPrincipalRepository, TokenStore};
use crate::services::token::PrincipalDeletionListener;

use super::support::{fixture, fixture_with};

#[tokio::test]
async fn test_deletion_notice_cascades_to_tokens() {
    let fx = fixture().await;
    let user_a = PrincipalId::from("user-a");
    let issued = fx.manager.issue(&user_a).await.unwrap();
    let other = fx.manager.issue(&PrincipalId::from("user-b")).await.unwrap();

    let mut listener = PrincipalDeletionListener::new(fx.manager.clone());
    fx.principals.delete(&user_a).await.unwrap();

    assert_eq!(listener.process_next().await, Some(user_a));
    assert!(!fx.store.contains(&issued.refresh_value).await.unwrap());
    assert!(fx.store.contains(&other.refresh_value).await.unwrap());
}

#[tokio::test]
async fn test_lagged_listener_skips_to_newest_notice() {
    let fx = fixture_with(InMemoryPrincipalRepository::with_capacity(1)).await;
    let a = fx.manager.issue(&PrincipalId::from("user-a")).await.unwrap();
    let b = fx.manager.issue(&PrincipalId::from("user-b")).await.unwrap();

    let mut listener = PrincipalDeletionListener::new(fx.manager.clone());
    fx.principals.delete(&PrincipalId::from("user-a")).await.unwrap();
    fx.principals.delete(&PrincipalId::from("user-b")).await.unwrap();

    // The notice for user-a was overwritten before it was read.
    assert_eq!(listener.process_next().await, Some(PrincipalId::from("user-b")));
    assert!(!fx.store.contains(&b.refresh_value).await.unwrap());
    assert!(fx.store.contains(&a.refresh_value).await.unwrap());

    // Refresh still refuses the orphaned record and removes it.
    assert!(fx.manager.refresh(&a.refresh_value).await.unwrap().is_none());
    assert!(fx.store.is_empty().await);
}

#[tokio::test]
async fn test_spawned_listener_handles_deletions() {
    let fx = fixture().await;
    let user_a = PrincipalId::from("user-a");
    fx.manager.issue(&user_a).await.unwrap();

    let handle = PrincipalDeletionListener::new(Arc::clone(&fx.manager)).spawn();
    fx.principals.delete(&user_a).await.unwrap();

    for _ in 0..50 {
        if fx.store.is_empty().await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    handle.abort();

    assert!(fx.store.is_empty().await);
}
