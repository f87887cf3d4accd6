//! Integration tests for ranked suggestions
//!
//! The member used throughout has role {Backend} and stacks {Java, Spring}.

use coconet_article::{ArticleDraft, ArticleService, SuggestionService};
use coconet_common::db::{init_in_memory_database, SqliteTagCatalog};
use coconet_common::TagKind;
use coconet_member::MemberService;
use std::sync::Arc;
use uuid::Uuid;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct Fixture {
    articles: ArticleService,
    suggestions: SuggestionService,
    members: MemberService,
    author: Uuid,
    reader: Uuid,
}

async fn setup() -> Fixture {
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

    let members = MemberService::new(pool.clone());
    let author = members.create_member("author").await.unwrap().guid;
    let reader = members.create_member("reader").await.unwrap().guid;
    members
        .update_tags(reader, &names(&["Backend"]), &names(&["Java", "Spring"]))
        .await
        .unwrap();

    let articles = ArticleService::new(pool);
    let suggestions = SuggestionService::new(articles.clone(), Arc::new(members.clone()));
    Fixture {
        articles,
        suggestions,
        members,
        author,
        reader,
    }
}

async fn post(fixture: &Fixture, title: &str, role: &str, stacks: &[&str]) -> Uuid {
    let mut draft = ArticleDraft::new(fixture.author, title).with_role(role, 1);
    for stack in stacks {
        draft = draft.with_stack(*stack);
    }
    fixture.articles.create_article(draft).await.unwrap().guid
}

fn titles(summaries: &[coconet_article::ArticleSummary]) -> Vec<&str> {
    summaries.iter().map(|s| s.title.as_str()).collect()
}

#[tokio::test]
async fn test_suggestions_follow_tier_order() {
    let fixture = setup().await;
    post(&fixture, "A", "Backend", &["Java", "Spring"]).await;
    post(&fixture, "B", "Frontend", &["Java", "Spring"]).await;
    post(&fixture, "C", "Backend", &["React"]).await;
    post(&fixture, "D", "Designer", &["Java"]).await;

    let suggestions = fixture.suggestions.suggestions(fixture.reader).await.unwrap();

    // Rank 0 sorts ahead of the strongest match
    assert_eq!(titles(&suggestions), vec!["D", "A", "B", "C"]);
}

#[tokio::test]
async fn test_unrelated_and_deleted_articles_excluded() {
    let fixture = setup().await;
    post(&fixture, "related", "Backend", &["Java", "Spring"]).await;
    post(&fixture, "unrelated", "Designer", &["Rust"]).await;
    let gone = post(&fixture, "deleted", "Backend", &["Java"]).await;
    fixture
        .articles
        .delete_article(gone, fixture.author)
        .await
        .unwrap();

    let suggestions = fixture.suggestions.suggestions(fixture.reader).await.unwrap();

    assert_eq!(titles(&suggestions), vec!["related"]);
}

#[tokio::test]
async fn test_equal_ranks_keep_newest_first() {
    let fixture = setup().await;
    post(&fixture, "older", "Backend", &["Java", "Spring"]).await;
    post(&fixture, "newer", "Backend", &["Java", "Spring"]).await;

    let ranked = fixture
        .suggestions
        .suggestions_with_relevance(fixture.reader)
        .await
        .unwrap();

    let order: Vec<&str> = ranked.iter().map(|(a, _)| a.title.as_str()).collect();
    assert_eq!(order, vec!["newer", "older"]);
    assert!(ranked.iter().all(|(_, relevance)| relevance.rank == 1));
    assert_eq!(ranked[0].1.stack_overlap, 2);
}

#[tokio::test]
async fn test_member_without_tags_gets_nothing() {
    let fixture = setup().await;
    post(&fixture, "A", "Backend", &["Java", "Spring"]).await;
    let newcomer = fixture.members.create_member("newbie").await.unwrap().guid;

    let suggestions = fixture.suggestions.suggestions(newcomer).await.unwrap();

    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn test_unknown_member_fails() {
    let fixture = setup().await;

    let result = fixture.suggestions.suggestions(Uuid::new_v4()).await;

    assert!(matches!(result, Err(coconet_common::Error::NotFound(_))));
}
