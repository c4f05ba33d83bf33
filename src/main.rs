use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_progress::catalog::{CourseCatalog, EnrollmentDirectory, MemoryCatalog, PgCatalog};
use course_progress::config::{Config, StorageBackend};
use course_progress::render::{CertificateRenderer, FsCertificateRenderer, HttpCertificateRenderer};
use course_progress::store::{MemoryStore, PgStore, ProgressStore};
use course_progress::{db, routes, ProgressionEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (store, catalog, enrollment): (
        Arc<dyn ProgressStore>,
        Arc<dyn CourseCatalog>,
        Arc<dyn EnrollmentDirectory>,
    ) = match config.backend {
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let pool = db::connect(url, config.max_connections).await?;
            db::migrate(&pool).await?;
            let catalog = Arc::new(PgCatalog::new(pool.clone()));
            let store: Arc<dyn ProgressStore> = Arc::new(PgStore::new(pool));
            (store, catalog.clone() as Arc<dyn CourseCatalog>, catalog as Arc<dyn EnrollmentDirectory>)
        }
        StorageBackend::Memory => {
            let catalog = match &config.catalog_file {
                Some(path) => MemoryCatalog::load(path).await?,
                None => MemoryCatalog::new(),
            };
            tracing::warn!("using in-memory storage; progress is lost on restart");
            let catalog = Arc::new(catalog);
            let store: Arc<dyn ProgressStore> = Arc::new(MemoryStore::new());
            (store, catalog.clone() as Arc<dyn CourseCatalog>, catalog as Arc<dyn EnrollmentDirectory>)
        }
    };

    let renderer: Arc<dyn CertificateRenderer> = match &config.renderer_url {
        Some(url) => Arc::new(HttpCertificateRenderer::new(url.clone())),
        None => Arc::new(FsCertificateRenderer::new(config.data_dir.clone())),
    };

    let engine = ProgressionEngine::new(store, catalog, enrollment, renderer, config.engine.clone());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(engine, config.data_dir.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(backend = ?config.backend, "listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
