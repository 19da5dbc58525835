use crate::cache::{content_digest, ContentStore, PageCache, RenderGate};
use crate::database::sqlite::SqliteRepository;
use crate::database::EntryRepository;
use crate::domain::EntryDraft;
use crate::render::{MarkdownRenderer, Renderer};
use crate::services::EntryAssembler;
use crate::tests::unit_render_gate::CountingRenderer;
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn setup_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

struct AssemblerFixture {
    assembler: EntryAssembler,
    repo: SqliteRepository,
    store: Arc<ContentStore>,
    _asset_dir: TempDir,
}

async fn setup_assembler(renderer: Arc<dyn Renderer>) -> AssemblerFixture {
    let asset_dir = TempDir::new().unwrap();
    let pool = setup_pool().await;
    let store = Arc::new(ContentStore::new(asset_dir.path()).unwrap());

    let cache = PageCache::new(store.clone(), 8);
    let gate = Arc::new(RenderGate::new(cache, renderer, Duration::from_secs(5)));
    let assembler = EntryAssembler::new(Box::new(SqliteRepository::new(pool.clone())), gate);

    AssemblerFixture {
        assembler,
        repo: SqliteRepository::new(pool),
        store,
        _asset_dir: asset_dir,
    }
}

// store a markdown body under its digest and point an entry row at it
async fn seed_entry(fixture: &AssemblerFixture, filename: &str, markdown: &[u8]) -> String {
    let key = content_digest(markdown);
    fixture.store.put(&key, markdown).unwrap();

    fixture
        .repo
        .save_entry(&EntryDraft {
            filename: filename.to_string(),
            title: filename.to_string(),
            body: key.clone(),
            posted: NaiveDate::from_ymd_opt(2023, 6, 25)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            visible: true,
            tags: vec![],
        })
        .await
        .unwrap();

    key
}

// the served body is the renderer's output for the stored markdown, and a
// second request does not re-invoke the renderer
#[tokio::test]
async fn test_assembled_body_is_rendered_once() {
    let renderer = Arc::new(CountingRenderer::new());
    let fixture = setup_assembler(renderer.clone()).await;
    seed_entry(&fixture, "title.md", b"# Title\n").await;

    let entries = fixture.assembler.assemble_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].body, "<rendered># Title\n</rendered>");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    // second request serves the promoted bytes
    let entries = fixture.assembler.assemble_entries().await.unwrap();
    assert_eq!(entries[0].body, "<rendered># Title\n</rendered>");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
}

// same path with the real markdown renderer
#[tokio::test]
async fn test_assembled_body_with_real_renderer() {
    let fixture = setup_assembler(Arc::new(MarkdownRenderer::new())).await;
    seed_entry(&fixture, "title.md", b"# Title\n").await;

    let entries = fixture.assembler.assemble_entries().await.unwrap();
    assert!(entries[0].body.contains("<h1>Title</h1>"));
}

// one unresolvable entry fails the whole batch, no partial results
#[tokio::test]
async fn test_missing_blob_fails_the_batch() {
    let renderer = Arc::new(CountingRenderer::new());
    let fixture = setup_assembler(renderer.clone()).await;

    seed_entry(&fixture, "good.md", b"fine\n").await;
    fixture
        .repo
        .save_entry(&EntryDraft {
            filename: "broken.md".to_string(),
            title: "broken".to_string(),
            body: "deadbeefdeadbeef".to_string(),
            posted: NaiveDate::from_ymd_opt(2023, 6, 26)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            visible: true,
            tags: vec![],
        })
        .await
        .unwrap();

    assert!(fixture.assembler.assemble_entries().await.is_err());
}

#[tokio::test]
async fn test_assemble_single_entry() {
    let renderer = Arc::new(CountingRenderer::new());
    let fixture = setup_assembler(renderer.clone()).await;
    seed_entry(&fixture, "one.md", b"only\n").await;

    let id = fixture.repo.get_visible_entries().await.unwrap()[0].id;

    let entry = fixture.assembler.assemble_entry(id).await.unwrap().unwrap();
    assert_eq!(entry.body, "<rendered>only\n</rendered>");

    assert!(fixture
        .assembler
        .assemble_entry(id + 999)
        .await
        .unwrap()
        .is_none());
}
