use crate::cache::{content_digest, ContentStore, PageCache, RenderGate};
use crate::database::sqlite::SqliteRepository;
use crate::database::EntryRepository;
use crate::domain::EntryDraft;
use crate::features::entries::entries_router;
use crate::render::MarkdownRenderer;
use crate::services::EntryAssembler;
use crate::AppState;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct ApiFixture {
    state: AppState,
    repo: SqliteRepository,
    store: Arc<ContentStore>,
    _asset_dir: TempDir,
}

// the real router with real collaborators behind it: in-memory sqlite, a
// temp-dir store, the pulldown renderer
async fn setup_api() -> ApiFixture {
    let asset_dir = TempDir::new().unwrap();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(ContentStore::new(asset_dir.path()).unwrap());
    let cache = PageCache::new(store.clone(), 8);
    let gate = Arc::new(RenderGate::new(
        cache,
        Arc::new(MarkdownRenderer::new()),
        Duration::from_secs(5),
    ));
    let assembler = Arc::new(EntryAssembler::new(
        Box::new(SqliteRepository::new(pool.clone())),
        gate,
    ));

    ApiFixture {
        state: AppState { assembler },
        repo: SqliteRepository::new(pool),
        store,
        _asset_dir: asset_dir,
    }
}

async fn seed_entry(fixture: &ApiFixture, filename: &str, markdown: &[u8], key: Option<&str>) {
    let key = match key {
        Some(k) => k.to_string(),
        None => {
            let digest = content_digest(markdown);
            fixture.store.put(&digest, markdown).unwrap();
            digest
        }
    };

    fixture
        .repo
        .save_entry(&EntryDraft {
            filename: filename.to_string(),
            title: "Api Test".to_string(),
            body: key,
            posted: NaiveDate::from_ymd_opt(2023, 6, 25)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            visible: true,
            tags: vec!["api".to_string()],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_entries_success() {
    let fixture = setup_api().await;
    seed_entry(&fixture, "api-test.md", b"# API Test Content\n", None).await;

    let app = entries_router().with_state(fixture.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/entries").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["title"], "Api Test");
    assert_eq!(json[0]["tags"][0], "api");
    // the body field left the db as a hash key and arrives as HTML
    assert!(json[0]["body"]
        .as_str()
        .unwrap()
        .contains("<h1>API Test Content</h1>"));
    assert!(json[0]["uniqueId"].is_i64());
}

#[tokio::test]
async fn test_get_entry_not_found() {
    let fixture = setup_api().await;
    let app = entries_router().with_state(fixture.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/entries/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// a single unresolvable body turns the whole list into a server error
#[tokio::test]
async fn test_unresolvable_entry_is_server_error() {
    let fixture = setup_api().await;
    seed_entry(&fixture, "good.md", b"fine\n", None).await;
    seed_entry(&fixture, "broken.md", b"", Some("deadbeefdeadbeef")).await;

    let app = entries_router().with_state(fixture.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/entries").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_get_single_entry() {
    let fixture = setup_api().await;
    seed_entry(&fixture, "api-test.md", b"single\n", None).await;
    let id = fixture.repo.get_visible_entries().await.unwrap()[0].id;

    let app = entries_router().with_state(fixture.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/entries/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["body"].as_str().unwrap().contains("single"));
}
