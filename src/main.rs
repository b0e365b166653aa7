mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::{Config, StoreBackendKind};
use db::{
    backend::{KeyValueBackend, MemoryBackend, PgBackend, RedisBackend},
    db::DBClient,
    store::RecordStore,
};
use dotenv::dotenv;
use routes::create_router;
use service::{payment_service::PaymentService, session::SessionManager};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub session: Arc<SessionManager>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(db_client: Arc<DBClient>, config: Config) -> Self {
        let session = Arc::new(SessionManager::new(db_client.clone()));
        let payments = Arc::new(PaymentService::new(
            db_client.clone(),
            config.siwes_fee,
            config.payment_delay,
        ));

        Self {
            env: config,
            db_client,
            session,
            payments,
        }
    }
}

async fn connect_backend(config: &Config) -> Arc<dyn KeyValueBackend> {
    match config.store_backend {
        StoreBackendKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryBackend::new())
        }
        StoreBackendKind::Postgres => {
            let Some(database_url) = config.database_url.as_deref() else {
                tracing::error!("🔥 STORE_BACKEND=postgres needs DATABASE_URL");
                std::process::exit(1);
            };

            let pool = match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    tracing::info!("✅ Connection to the database is successful!");
                    pool
                }
                Err(err) => {
                    tracing::error!("🔥 Failed to connect to the database: {:?}", err);
                    std::process::exit(1);
                }
            };

            let backend = PgBackend::new(pool);
            if let Err(err) = backend.ensure_schema().await {
                tracing::error!("🔥 Failed to prepare the record_store table: {}", err);
                std::process::exit(1);
            }
            Arc::new(backend)
        }
        StoreBackendKind::Redis => {
            let Some(redis_url) = config.redis_url.as_deref() else {
                tracing::error!("🔥 STORE_BACKEND=redis needs REDIS_URL");
                std::process::exit(1);
            };

            match RedisBackend::connect(redis_url).await {
                Ok(backend) => Arc::new(backend),
                Err(err) => {
                    tracing::error!("🔥 Failed to connect to Redis: {}", err);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = Config::init();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let backend = connect_backend(&config).await;
    let store = RecordStore::new(backend, config.store_namespace.clone());

    match store.seed_if_empty().await {
        Ok(seeded) if seeded.is_empty() => tracing::info!("Record store already seeded"),
        Ok(seeded) => tracing::info!("Seeded fixture collections: {}", seeded.join(", ")),
        Err(err) => {
            tracing::error!("🔥 Failed to seed the record store: {}", err);
            std::process::exit(1);
        }
    }

    let db_client = Arc::new(DBClient::new(store));
    let app_state = Arc::new(AppState::new(db_client, config.clone()));
    app_state.session.restore().await;

    match app_state.payments.recover_unsettled_payments().await {
        Ok(0) => {}
        Ok(count) => tracing::warn!("Marked {} unsettled online payment(s) as failed", count),
        Err(err) => {
            tracing::error!("🔥 Failed to recover unsettled payments: {}", err);
            std::process::exit(1);
        }
    }

    let allowed_origins: Vec<HeaderValue> = ["http://localhost:5173", "http://localhost:8000"]
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server stopped: {}", err);
    }
}
