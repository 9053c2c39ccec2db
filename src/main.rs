use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use mosaic::config::Config;
use mosaic::index::InvertedIndex;
use mosaic::server::routes::build_router;
use mosaic::server::AppState;
use mosaic::storage::MosaicStore;
use mosaic::vocabulary::VisualVocabulary;

#[tokio::main]
async fn main() {
    // Load .env
    let _ = dotenvy::dotenv();

    // Load config first (needed for logging setup)
    let config = Config::load(None).expect("failed to load config");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    tracing::info!("mosaic starting");
    mosaic::metrics::init();

    let store = MosaicStore::from_config(&config.storage).expect("failed to initialize storage");
    let config = Arc::new(config);

    let vocabulary = VisualVocabulary::load(&store, &config.index.vocabulary)
        .await
        .expect("failed to load vocabulary");

    let state = match vocabulary {
        Some(vocabulary) => {
            tracing::info!(
                vocabulary = vocabulary.name(),
                words = vocabulary.len(),
                "loaded vocabulary"
            );
            let index = InvertedIndex::open(&config.index.path, Arc::new(vocabulary))
                .expect("failed to open inverted index");
            match index.document_count() {
                Ok(count) => tracing::info!(count, "opened inverted index"),
                Err(e) => tracing::warn!(error = %e, "failed to count indexed documents"),
            }
            AppState::new(config.clone(), index)
        }
        None => {
            tracing::warn!(
                vocabulary = %config.index.vocabulary,
                "no trained vocabulary found; indexing and queries are unavailable"
            );
            AppState::unfitted(config.clone())
        }
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "listening");

    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    axum::serve(listener, app).await.expect("server error");
}
