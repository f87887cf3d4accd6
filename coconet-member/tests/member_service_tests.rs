//! Integration tests for member role/stack reconciliation
//!
//! Tests cover:
//! - Adding, removing and replacing tags
//! - Repeating an identical update writes nothing
//! - Unknown tags fail the whole update
//! - A member can never be left without roles or stacks

use coconet_common::catalog::ProfileResolver;
use coconet_common::db::{init_in_memory_database, SqliteTagCatalog};
use coconet_common::{Error, TagKind};
use coconet_member::MemberService;
use sqlx::SqlitePool;
use uuid::Uuid;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Test helper: in-memory database with a small catalog
async fn setup() -> (SqlitePool, MemberService) {
    let pool = init_in_memory_database().await.expect("in-memory database");
    let catalog = SqliteTagCatalog::new(pool.clone());
    catalog
        .seed_tags(TagKind::Role, &names(&["Backend", "Frontend", "Designer"]))
        .await
        .unwrap();
    catalog
        .seed_tags(TagKind::TechStack, &names(&["Java", "Spring", "React", "Rust"]))
        .await
        .unwrap();

    let service = MemberService::new(pool.clone());
    (pool, service)
}

/// Test helper: member with roles {Backend}, stacks {Java, Spring}
async fn backend_member(service: &MemberService) -> Uuid {
    let member = service.create_member("alice").await.unwrap();
    service
        .update_tags(member.guid, &names(&["Backend"]), &names(&["Java", "Spring"]))
        .await
        .unwrap();
    member.guid
}

async fn link_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Row ids change if a link is deleted and re-inserted
async fn link_rowids(pool: &SqlitePool) -> Vec<i64> {
    sqlx::query_scalar("SELECT rowid FROM member_stacks ORDER BY rowid")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_initial_tags_assigned() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    assert_eq!(service.roles(member).await.unwrap(), names(&["Backend"]));
    assert_eq!(service.stacks(member).await.unwrap(), names(&["Java", "Spring"]));
}

#[tokio::test]
async fn test_replace_roles() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let mut roles = service
        .update_roles(member, &names(&["Frontend", "Designer"]))
        .await
        .unwrap();
    roles.sort();

    assert_eq!(roles, names(&["Designer", "Frontend"]));
}

#[tokio::test]
async fn test_identical_update_is_noop() {
    let (pool, service) = setup().await;
    let member = backend_member(&service).await;

    let before = link_rowids(&pool).await;

    let stacks = service
        .update_stacks(member, &names(&["Spring", "Java"]))
        .await
        .unwrap();

    assert_eq!(stacks.len(), 2);
    assert_eq!(link_count(&pool, "member_stacks").await, 2);

    assert_eq!(link_rowids(&pool).await, before);
}

#[tokio::test]
async fn test_duplicate_names_stored_once() {
    let (pool, service) = setup().await;
    let member = backend_member(&service).await;

    let stacks = service
        .update_stacks(member, &names(&["Rust", "Rust", "Java"]))
        .await
        .unwrap();

    assert_eq!(stacks.len(), 2);
    assert_eq!(link_count(&pool, "member_stacks").await, 2);
}

#[tokio::test]
async fn test_empty_roles_rejected_and_unchanged() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let err = service.update_roles(member, &[]).await.unwrap_err();

    assert!(matches!(err, Error::DomainInvariant(_)));
    assert_eq!(service.roles(member).await.unwrap(), names(&["Backend"]));
}

#[tokio::test]
async fn test_empty_stacks_rejected() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let err = service.update_stacks(member, &[]).await.unwrap_err();

    assert!(matches!(err, Error::DomainInvariant(_)));
    assert_eq!(service.stacks(member).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_tag_fails_without_writes() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let err = service
        .update_roles(member, &names(&["Frontend", "Astronaut"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("Astronaut"));
    assert_eq!(service.roles(member).await.unwrap(), names(&["Backend"]));
}

#[tokio::test]
async fn test_update_tags_validates_both_before_writing() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let err = service
        .update_tags(member, &names(&["Designer"]), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DomainInvariant(_)));
    assert_eq!(service.roles(member).await.unwrap(), names(&["Backend"]));
}

#[tokio::test]
async fn test_update_tags_commits_both_or_neither() {
    let (pool, service) = setup().await;
    let member = backend_member(&service).await;

    // Any stack insert now fails after the role changes are already written
    sqlx::query(
        "CREATE TRIGGER reject_stack_links BEFORE INSERT ON member_stacks \
         BEGIN SELECT RAISE(ABORT, 'stack write rejected'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = service
        .update_tags(member, &names(&["Frontend"]), &names(&["Rust"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Database(_)));
    assert_eq!(service.roles(member).await.unwrap(), names(&["Backend"]));
    assert_eq!(service.stacks(member).await.unwrap(), names(&["Java", "Spring"]));
}

#[tokio::test]
async fn test_first_assignment_requires_tags() {
    let (_pool, service) = setup().await;
    let member = service.create_member("bob").await.unwrap();

    let err = service
        .update_tags(member.guid, &[], &names(&["Java"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DomainInvariant(_)));
}

#[tokio::test]
async fn test_unknown_member() {
    let (_pool, service) = setup().await;

    let err = service
        .update_roles(Uuid::new_v4(), &names(&["Backend"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_member_name_rules() {
    let (_pool, service) = setup().await;

    assert!(matches!(
        service.create_member("a").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        service.create_member("much-too-long").await,
        Err(Error::InvalidInput(_))
    ));

    service.create_member("carol").await.unwrap();
    let err = service.create_member("carol").await.unwrap_err();
    assert!(err.to_string().contains("already in use"));
}

#[tokio::test]
async fn test_profile_resolution() {
    let (_pool, service) = setup().await;
    let member = backend_member(&service).await;

    let profile = service.member_profile(member).await.unwrap();

    assert!(profile.roles.contains("Backend"));
    assert_eq!(profile.stacks.len(), 2);
    assert!(profile.stacks.contains("Spring"));
}
