use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use snaplink_core::{ClickContext, ClickEvent, OwnerId, PasswordDigest, ShortCode, UrlEntity, UrlPatch};
use snaplink_storage::{MySqlRepository, ReadRepository, Repository, StorageError};
use snaplink_test_infra::mysql::{MySqlServer, MysqlConfig};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    /// Returns `None` when no container runtime is reachable.
    async fn start() -> Option<Self> {
        let mysql = match MySqlServer::new(MysqlConfig::builder().build()).await {
            Ok(mysql) => mysql,
            Err(err) => {
                eprintln!("skipping: docker unavailable ({err})");
                return None;
            }
        };
        let url = mysql.database_url().await.expect("mysql url");
        let pool = connect_with_retry(&url).await;

        let repo = MySqlRepository::new(pool);
        repo.ensure_schema().await.expect("create schema");

        Some(Self {
            _mysql: mysql,
            repo,
        })
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn at(second: i64) -> Timestamp {
    Timestamp::from_second(second).unwrap()
}

fn entity(value: &str, owner: &str, created: i64) -> UrlEntity {
    UrlEntity::builder()
        .code(code(value))
        .long_url(format!("https://example.com/{value}"))
        .owner_id(OwnerId::new(owner))
        .created_at(at(created))
        .updated_at(at(created))
        .build()
}

fn click(second: i64) -> ClickEvent {
    ClickEvent::new(
        at(second),
        ClickContext {
            ip: "203.0.113.7".to_string(),
            referrer: "https://news.example".to_string(),
            browser: "Firefox".to_string(),
            os: "Linux".to_string(),
            device: "desktop".to_string(),
        },
    )
}

#[tokio::test]
async fn insert_and_get_round_trips_every_field() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };

    let mut stored = entity("abc123", "alice", 1_700_000_000);
    stored.title = "Launch".to_string();
    stored.description = "Launch day notes".to_string();
    stored.expires_at = Some(at(1_800_000_000));
    stored.is_public = true;
    stored.password = Some(PasswordDigest::hash("abc123").unwrap());
    stored.tags = ["news".to_string(), "launch".to_string()].into();
    stored.record_click(click(1_700_000_100));

    fixture.repo.insert(stored.clone()).await.unwrap();

    let got = fixture.repo.get(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got, stored);
    assert!(got.password.unwrap().verify("abc123"));
}

#[tokio::test]
async fn insert_conflicts_when_code_already_exists() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };

    fixture
        .repo
        .insert(entity("abc123", "alice", 100))
        .await
        .unwrap();

    let err = fixture
        .repo
        .insert(entity("abc123", "bob", 200))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn expired_row_is_still_returned() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };
    let mut expired = entity("expired", "alice", 100);
    expired.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(1));

    fixture.repo.insert(expired).await.unwrap();

    let got = fixture.repo.get(&code("expired")).await.unwrap();
    assert!(got.is_some());
    assert!(fixture.repo.exists(&code("expired")).await.unwrap());
}

#[tokio::test]
async fn delete_frees_the_code() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };

    fixture
        .repo
        .insert(entity("to-delete", "alice", 100))
        .await
        .unwrap();

    let alice = OwnerId::new("alice");
    assert!(fixture
        .repo
        .delete(&code("to-delete"), Some(&alice))
        .await
        .unwrap());
    assert!(fixture.repo.get(&code("to-delete")).await.unwrap().is_none());
    assert!(!fixture
        .repo
        .delete(&code("to-delete"), Some(&alice))
        .await
        .unwrap());

    fixture
        .repo
        .insert(entity("to-delete", "bob", 200))
        .await
        .unwrap();
}

#[tokio::test]
async fn apply_patch_keeps_click_state() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };
    fixture
        .repo
        .insert(entity("abc123", "alice", 100))
        .await
        .unwrap();
    fixture
        .repo
        .record_click(&code("abc123"), click(101))
        .await
        .unwrap();

    let updated = fixture
        .repo
        .apply_patch(
            &code("abc123"),
            Some(&OwnerId::new("alice")),
            UrlPatch {
                long_url: Some("https://example.org".to_string()),
                password: Some(None),
                updated_at: Some(at(150)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.long_url, "https://example.org");
    assert_eq!(updated.click_count, 1);

    let reloaded = fixture.repo.get(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
}

#[tokio::test]
async fn concurrent_clicks_are_not_lost() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };
    fixture
        .repo
        .insert(entity("hot", "alice", 0))
        .await
        .unwrap();

    let repo = Arc::new(fixture.repo.clone());
    let mut handles = vec![];
    for worker in 0..8i64 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            for i in 0..25i64 {
                repo.record_click(&code("hot"), click(worker * 100 + i))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let got = fixture.repo.get(&code("hot")).await.unwrap().unwrap();
    assert_eq!(got.click_count, 200);
    assert_eq!(got.click_history.len(), 200);
}

#[tokio::test]
async fn clicks_do_not_disturb_a_concurrent_edit() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };
    fixture
        .repo
        .insert(entity("busy", "alice", 0))
        .await
        .unwrap();

    let repo = fixture.repo.clone();
    let clicks = tokio::spawn(async move {
        for i in 0..50i64 {
            repo.record_click(&code("busy"), click(i)).await.unwrap();
        }
    });

    let patched = fixture
        .repo
        .apply_patch(
            &code("busy"),
            Some(&OwnerId::new("alice")),
            UrlPatch {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    clicks.await.unwrap();

    assert!(patched.is_some());
    let got = fixture.repo.get(&code("busy")).await.unwrap().unwrap();
    assert_eq!(got.title, "Renamed");
    assert_eq!(got.click_count, 50);
}

#[tokio::test]
async fn guarded_writes_skip_a_different_owner() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };
    fixture
        .repo
        .insert(entity("promo", "bob", 100))
        .await
        .unwrap();
    let alice = OwnerId::new("alice");

    let patched = fixture
        .repo
        .apply_patch(
            &code("promo"),
            Some(&alice),
            UrlPatch {
                long_url: Some("https://evil.example".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(patched.is_none());
    assert!(!fixture.repo.delete(&code("promo"), Some(&alice)).await.unwrap());
    assert!(!fixture.repo.delete(&code("promo"), None).await.unwrap());

    let got = fixture.repo.get(&code("promo")).await.unwrap().unwrap();
    assert_eq!(got.long_url, "https://example.com/promo");
}

#[tokio::test]
async fn listings_filter_and_order() {
    let Some(fixture) = Fixture::start().await else {
        return;
    };

    let mut first = entity("first", "alice", 100);
    first.is_public = true;
    let mut second = entity("second", "alice", 200);
    second.is_public = true;
    let mut inactive = entity("inactive", "bob", 300);
    inactive.is_public = true;
    inactive.is_active = false;

    for e in [first, second, inactive] {
        fixture.repo.insert(e).await.unwrap();
    }

    let public = fixture.repo.list_public(10).await.unwrap();
    let codes: Vec<&str> = public.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["second", "first"]);

    let bobs = fixture.repo.list_by_owner(&OwnerId::new("bob")).await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert!(!bobs[0].is_active);
}
