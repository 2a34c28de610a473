pub mod api;
pub mod caller;
pub mod config;
pub mod db;
pub mod error;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use northstar_core::memory::{
    MemoryAccessStore, MemoryCronStore, MemoryEventStore, MemoryInvocationStore,
    MemoryMappingStore, MemoryNotebookStore, MemorySnippetStore,
};
use northstar_core::scheduler::{
    CronStore, DeviceScheduler, EventStore, MappingStore, SchedulerRegistry, TimerScheduler,
};
use northstar_core::{
    AccessStore, ExecutionLimits, InvocationStore, NotebookService, NotebookStore, SnippetStore,
    TransformationService, DEVICE_EVENT, TIMER_EVENT,
};

use crate::config::Config;
use crate::db::Database;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub notebooks: Arc<NotebookService>,
    pub transformations: Arc<TransformationService>,
}

/// The stores behind the services
pub struct Stores {
    pub access: Arc<dyn AccessStore>,
    pub notebooks: Arc<dyn NotebookStore>,
    pub snippets: Arc<dyn SnippetStore>,
    pub invocations: Arc<dyn InvocationStore>,
    pub jobs: Arc<dyn CronStore>,
    pub events: Arc<dyn EventStore>,
    pub mappings: Arc<dyn MappingStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            access: Arc::new(MemoryAccessStore::new()),
            notebooks: Arc::new(MemoryNotebookStore::new()),
            snippets: Arc::new(MemorySnippetStore::new()),
            invocations: Arc::new(MemoryInvocationStore::new()),
            jobs: Arc::new(MemoryCronStore::new()),
            events: Arc::new(MemoryEventStore::new()),
            mappings: Arc::new(MemoryMappingStore::new()),
        }
    }

    pub fn database(db: Database) -> Self {
        let db = Arc::new(db);
        Self {
            access: db.clone(),
            notebooks: db.clone(),
            snippets: db.clone(),
            invocations: db.clone(),
            jobs: db.clone(),
            events: db.clone(),
            mappings: db,
        }
    }
}

impl AppState {
    pub fn new(stores: Stores, limits: ExecutionLimits) -> Self {
        let schedulers = SchedulerRegistry::new()
            .with(TIMER_EVENT, Arc::new(TimerScheduler::new(stores.jobs)))
            .with(
                DEVICE_EVENT,
                Arc::new(DeviceScheduler::new(stores.events, stores.mappings)),
            );
        tracing::debug!(?schedulers, "Scheduler registry built");

        Self {
            notebooks: Arc::new(NotebookService::new(stores.access, stores.notebooks, limits)),
            transformations: Arc::new(TransformationService::new(
                stores.snippets,
                stores.invocations,
                Arc::new(schedulers),
                limits,
            )),
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the server with the given configuration
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let stores = match &config.database_url {
        Some(url) => {
            // Initialize database
            let db = Database::connect(url).await?;

            // Run migrations
            db.migrate().await?;

            Stores::database(db)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using in-memory stores");
            Stores::memory()
        }
    };

    let state = AppState::new(stores, config.limits);
    let app = app(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
