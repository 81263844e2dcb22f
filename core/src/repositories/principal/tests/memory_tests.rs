//! Unit tests for the in-memory principal repository

use crate::domain::entities::PrincipalId;
use crate::errors::DomainError;
use crate::repositories::principal::{InMemoryPrincipalRepository, PrincipalRepository};

#[tokio::test]
async fn test_create_and_exists() {
    let repo = InMemoryPrincipalRepository::new();
    let id = PrincipalId::from("user-a");

    assert!(!repo.exists(&id).await.unwrap());
    repo.create(id.clone()).await.unwrap();
    assert!(repo.exists(&id).await.unwrap());
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn test_duplicate_create_conflicts() {
    let repo = InMemoryPrincipalRepository::new();
    repo.create(PrincipalId::from("user-a")).await.unwrap();

    let result = repo.create(PrincipalId::from("user-a")).await;
    assert!(matches!(result, Err(DomainError::Conflict { .. })));
}

#[tokio::test]
async fn test_delete_notifies_subscribers() {
    let repo = InMemoryPrincipalRepository::new();
    let id = PrincipalId::from("user-a");
    repo.create(id.clone()).await.unwrap();

    let mut first = repo.subscribe_deletions();
    let mut second = repo.subscribe_deletions();

    assert!(repo.delete(&id).await.unwrap());

    assert_eq!(first.recv().await.unwrap(), id);
    assert_eq!(second.recv().await.unwrap(), id);
    assert!(!repo.exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_delete_unknown_principal_publishes_nothing() {
    let repo = InMemoryPrincipalRepository::new();
    let mut receiver = repo.subscribe_deletions();

    assert!(!repo.delete(&PrincipalId::from("ghost")).await.unwrap());
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_delete_without_subscribers_succeeds() {
    let repo = InMemoryPrincipalRepository::new();
    let id = PrincipalId::from("user-a");
    repo.create(id.clone()).await.unwrap();

    assert!(repo.delete(&id).await.unwrap());
    assert!(repo.is_empty().await);
}
