//! LinkRepository 集成测试

mod common;

use std::sync::Arc;

use linkmap::auth::Identity;
use linkmap::errors::LinkmapError;
use linkmap::services::{LinkRepository, RedirectOutcome, RedirectResolver};
use linkmap::storage::{KvStore, LinkEntry, MemoryKvStore};

fn identity(email: &str) -> Identity {
    Identity {
        email: email.to_string(),
        subject: format!("sub-{}", email),
        issued_at: None,
        expires_at: None,
    }
}

fn setup() -> (Arc<MemoryKvStore>, LinkRepository, RedirectResolver) {
    let store = Arc::new(MemoryKvStore::new());
    let repo = LinkRepository::new(store.clone());
    let resolver = RedirectResolver::new(store.clone());
    (store, repo, resolver)
}

#[tokio::test]
async fn test_create_then_resolve() {
    let (_, repo, resolver) = setup();
    let pairs = [
        ("github", "https://github.com"),
        ("docs", "https://docs.rs/actix-web/latest/actix_web/"),
        ("q", "https://example.com/search?q=a%20b&x=1#frag"),
        ("Case", "http://localhost:3000"),
    ];

    for (key, url) in pairs {
        let entry = repo.create(key, url, &identity("alice@example.com")).await.unwrap();
        assert_eq!(entry.key, key);
        assert_eq!(entry.target_url, url);
        assert_eq!(entry.created_by, "alice@example.com");
        assert_eq!(
            resolver.resolve(&format!("/{}", key)).await,
            RedirectOutcome::Found(url.to_string())
        );
    }

    // keys are case-sensitive
    assert_eq!(
        resolver.resolve("/case").await,
        RedirectOutcome::NotFound("case".into())
    );
}

#[tokio::test]
async fn test_create_existing_key_conflicts() {
    let (store, repo, _) = setup();
    repo.create("gh", "https://github.com", &identity("alice@example.com"))
        .await
        .unwrap();

    let err = repo
        .create("gh", "https://gitlab.com", &identity("bob@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkmapError::Conflict(_)));
    assert_eq!(err.message(), "Key already exists");

    // a legacy primary slot also counts as taken
    store.put("old", "https://old.example").await.unwrap();
    assert!(matches!(
        repo.create("old", "https://new.example", &identity("a@b.c")).await,
        Err(LinkmapError::Conflict(_))
    ));

    assert_eq!(store.get("gh").await.unwrap().as_deref(), Some("https://github.com"));
}

#[tokio::test]
async fn test_invalid_input_writes_nothing() {
    let (store, repo, _) = setup();
    let who = identity("alice@example.com");

    for (key, url) in [
        ("", "https://github.com"),
        ("gh", ""),
        ("gh", "not a url"),
        ("gh", "github.com"),
        ("a/b", "https://github.com"),
        ("meta:gh", "https://github.com"),
    ] {
        let err = repo.create(key, url, &who).await.unwrap_err();
        assert!(
            matches!(err, LinkmapError::InvalidInput(_)),
            "{:?} / {:?} gave {:?}",
            key,
            url,
            err
        );
    }
    assert!(store.is_empty());

    let err = repo.create("gh", "", &who).await.unwrap_err();
    assert_eq!(err.message(), "Missing required fields: key and url");
    let err = repo.create("gh", "nope", &who).await.unwrap_err();
    assert_eq!(err.message(), "Invalid URL format");

    repo.create("gh", "https://github.com", &who).await.unwrap();
    assert!(matches!(
        repo.update("gh", "nope", &who).await,
        Err(LinkmapError::InvalidInput(_))
    ));
    assert_eq!(store.get("gh").await.unwrap().as_deref(), Some("https://github.com"));
}

#[tokio::test]
async fn test_delete_then_resolve_not_found() {
    let (store, repo, resolver) = setup();
    repo.create("gh", "https://github.com", &identity("alice@example.com"))
        .await
        .unwrap();

    repo.delete("gh").await.unwrap();
    assert_eq!(
        resolver.resolve("/gh").await,
        RedirectOutcome::NotFound("gh".into())
    );
    assert!(!store.contains_key("meta:gh"));
}

#[tokio::test]
async fn test_delete_legacy_entry() {
    let (store, repo, _) = setup();
    store.put("old", "https://old.example").await.unwrap();

    let removed = repo.delete("old").await.unwrap();
    assert_eq!(removed.created_by, "unknown");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_update_resets_authorship() {
    let (_, repo, resolver) = setup();
    let created = repo
        .create("gh", "https://github.com", &identity("alice@example.com"))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let updated = repo
        .update("gh", "https://github.com/aaanh", &identity("bob@example.com"))
        .await
        .unwrap();

    assert_eq!(updated.key, "gh");
    assert_eq!(updated.target_url, "https://github.com/aaanh");
    assert_eq!(updated.created_by, "bob@example.com");
    assert!(updated.created_at > created.created_at);
    assert_eq!(
        resolver.resolve("/gh").await,
        RedirectOutcome::Found("https://github.com/aaanh".into())
    );
}

#[tokio::test]
async fn test_update_missing_key() {
    let (store, repo, _) = setup();
    let err = repo
        .update("ghost", "https://example.com", &identity("a@b.c"))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkmapError::NotFound(_)));
    assert_eq!(err.message(), "Key not found");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_list_includes_legacy_entries_in_store_order() {
    let (store, repo, _) = setup();
    repo.create("first", "https://one.example", &identity("alice@example.com"))
        .await
        .unwrap();
    store.put("legacy", "https://legacy.example").await.unwrap();
    repo.create("third", "https://three.example", &identity("bob@example.com"))
        .await
        .unwrap();

    let links = repo.list().await.unwrap();
    let keys: Vec<&str> = links.iter().map(|l| l.key.as_str()).collect();
    assert_eq!(keys, vec!["first", "legacy", "third"]);

    let legacy = &links[1];
    assert_eq!(legacy.target_url, "https://legacy.example");
    assert_eq!(legacy.created_by, "unknown");
}

#[tokio::test]
async fn test_list_treats_corrupt_metadata_as_legacy() {
    let (store, repo, _) = setup();
    store.put("broken", "https://broken.example").await.unwrap();
    store.put("meta:broken", "{not json").await.unwrap();
    store.put("mismatch", "https://m.example").await.unwrap();
    store
        .put(
            "meta:mismatch",
            &serde_json::to_string(&LinkEntry::new("other", "https://m.example", "x")).unwrap(),
        )
        .await
        .unwrap();

    let links = repo.list().await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| l.created_by == "unknown"));
}

#[tokio::test]
async fn test_list_walks_every_page() {
    let store = Arc::new(MemoryKvStore::with_page_size(3));
    let repo = LinkRepository::new(store.clone());
    for i in 0..10 {
        repo.create(&format!("k{}", i), "https://example.com", &identity("a@b.c"))
            .await
            .unwrap();
    }

    let links = repo.list().await.unwrap();
    assert_eq!(links.len(), 10);
    assert_eq!(links[9].key, "k9");
}

#[tokio::test]
async fn test_metadata_slot_format() {
    let (store, repo, _) = setup();
    repo.create("gh", "https://github.com", &identity("alice@example.com"))
        .await
        .unwrap();

    let raw = store.get_json("meta:gh").await.unwrap().unwrap();
    assert_eq!(raw["key"], "gh");
    assert_eq!(raw["url"], "https://github.com");
    assert_eq!(raw["createdBy"], "alice@example.com");
    let created_at = raw["createdAt"].as_str().unwrap();
    assert!(created_at.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[tokio::test]
async fn test_reads_metadata_written_by_older_deployments() {
    let (store, repo, _) = setup();
    store.put("gh", "https://github.com").await.unwrap();
    store
        .put(
            "meta:gh",
            r#"{"key":"gh","url":"https://github.com","createdAt":"2024-03-01T10:20:30.123Z","createdBy":"alice@example.com"}"#,
        )
        .await
        .unwrap();

    let links = repo.list().await.unwrap();
    assert_eq!(links[0].created_by, "alice@example.com");
    assert_eq!(
        links[0].created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "2024-03-01T10:20:30.123Z"
    );
}

#[tokio::test]
async fn test_store_calls_counted() {
    let store = Arc::new(common::CountingStore::new());
    let repo = LinkRepository::new(store.clone());
    repo.create("gh", "https://github.com", &identity("a@b.c")).await.unwrap();

    // existence check + primary + metadata
    assert_eq!(store.calls(), 3);
    assert!(store.inner().contains_key("meta:gh"));
}
