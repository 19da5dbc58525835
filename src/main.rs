use crate::cache::{ContentStore, PageCache, RenderGate};
use crate::config::TintaConfig;
use crate::database::sqlite::SqliteRepository;
use crate::render::{MarkdownRenderer, Renderer};
use crate::services::{EntryAssembler, SyncService};
use crate::watcher::start_directory_watcher;
use axum::Router;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Sqlite;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

mod cache;
pub mod config;
mod database;
mod domain;
mod features;
mod render;
mod services;
mod watcher;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<EntryAssembler>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // determine environment variables
    dotenv::dotenv().ok();

    // load centralized config
    let config = TintaConfig::from_env();
    let shared_config = Arc::new(config.clone());

    // verify db exists
    if !Sqlite::database_exists(&config.database_url)
        .await
        .unwrap_or(false)
    {
        println!(
            "Unable to connect to database at {}, creating...",
            config.database_url
        );
        match Sqlite::create_database(&config.database_url).await {
            Ok(_) => println!("Successfully created database at {}.", &config.database_url),
            Err(e) => panic!(
                "Unable to create database at {}. Error details: {}",
                &config.database_url, e
            ),
        };
    }

    // connect to our db
    let pool = match SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            panic!("Failed to create pool on {}: {}", config.database_url, e);
        }
    };

    // run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    // the asset pipeline: one store on disk, one bounded cache in memory,
    // one gate deciding when markdown actually gets rendered
    let store = Arc::new(ContentStore::new(&config.asset_path)?);
    let page_cache = PageCache::new(store.clone(), config.cache_size);
    let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer::new());
    let gate = Arc::new(RenderGate::new(page_cache, renderer, config.render_timeout));

    // sync markdown files into the store and db
    let sync_service = Arc::new(SyncService::new(
        Box::new(SqliteRepository::new(pool.clone())),
        store.clone(),
        shared_config.clone(),
    ));
    let synced = sync_service.full_sync().await?;
    println!("Sync complete ({} entries).", synced);

    // start background file watcher
    start_directory_watcher(sync_service.clone(), shared_config.clone());

    println!("Starting server...");

    let assembler = Arc::new(EntryAssembler::new(
        Box::new(SqliteRepository::new(pool.clone())),
        gate,
    ));
    let app_state = AppState { assembler };

    // api router, where features are composed
    let api_router = Router::new().merge(features::entries::entries_router());

    // the original frontend is served from elsewhere, hence the open CORS
    let app = Router::new()
        .nest("/api", api_router)
        .nest_service("/assets", ServeDir::new(&config.asset_path))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    println!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
