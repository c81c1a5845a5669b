#![forbid(unsafe_code)]

//! **tenant-runtime** – Wiring and entry point for the Semptify core
//! runtime: explicit dependency-graph construction, configuration,
//! logging, and the HTTP/websocket edge in front of the event bus.
//!
//! Grounded on `toka-orchestration-service`'s `main.rs` (CLI → config →
//! component wiring → axum app → graceful shutdown), generalized from a
//! single orchestration engine to the full core crate graph.

mod config;
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_bus_core::Bus;
use tenant_classifier::RuleBasedClassifier;
use tenant_context::ContextLoop;
use tenant_intake::{DocIdGenerator, DocumentRegistry, IntakePipeline};
use tenant_laws::LawIndex;
use tenant_storage_core::StorageProvider;
use tenant_storage_fs::FsStorageProvider;
use tenant_storage_memory::MemoryStorageProvider;
use tenant_types::UserId;
use tenant_vault::{TrustingResolver, VaultAccessEngine};

use crate::config::{Cli, RuntimeConfig};

/// Everything an HTTP handler needs, cheaply cloneable.
#[derive(Clone)]
pub struct ServiceState {
    bus: Bus,
    context: Arc<ContextLoop>,
    intake: Arc<IntakePipeline>,
    started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: i64,
}

#[derive(Debug, Deserialize)]
struct IntakeQuery {
    user_id: String,
    filename: String,
    mime: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntakeResponse {
    doc_id: String,
    was_duplicate: bool,
    doc_type: Option<String>,
    confidence: Option<f64>,
    events_extracted: usize,
    matched_law_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StateQuery {
    user_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::load(&cli).context("loading runtime configuration")?;

    init_logging(&config.log_level)?;
    info!(port = config.port, "starting tenant-runtime");

    let bus = Bus::new(config.bus_config());

    let storage: Arc<dyn StorageProvider> = match config.storage.backend.as_str() {
        "fs" => Arc::new(FsStorageProvider::new(config.storage.root.clone())),
        _ => Arc::new(MemoryStorageProvider::new()),
    };

    let vault = Arc::new(VaultAccessEngine::new(
        storage,
        Arc::new(TrustingResolver),
        bus.clone(),
        config.audit.log_dir.clone(),
    ));
    let context = Arc::new(ContextLoop::new(bus.clone()));
    let registry = Arc::new(DocumentRegistry::new());
    let doc_ids = Arc::new(DocIdGenerator::new("SEM"));
    let classifier = Arc::new(RuleBasedClassifier);
    let classification_cache = Arc::new(tenant_cache::InMemoryCache::new(
        tenant_cache::CacheConfig::default(),
    ));
    let laws = Arc::new(LawIndex::with_base_laws());

    let intake = Arc::new(IntakePipeline::new(
        vault,
        registry,
        doc_ids,
        classifier,
        classification_cache,
        laws,
        context.clone(),
        bus.clone(),
    ));

    spawn_idle_eviction(context.clone(), config.idle_ttl());

    let state = ServiceState {
        bus: bus.clone(),
        context,
        intake,
        started_at: chrono::Utc::now(),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind to port {}", config.port))?;

    info!(port = config.port, "HTTP/websocket edge listening");
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                tracing::error!(error = %err, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
    }

    info!(deadline_seconds = config.shutdown.deadline_seconds, "shutting down");
    bus.shutdown(config.shutdown_deadline()).await;
    info!("tenant-runtime stopped");

    Ok(())
}

fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(user_state))
        .route("/intake", post(intake))
        .route("/events", get(websocket::handler))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let uptime_seconds = (chrono::Utc::now() - state.started_at).num_seconds();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    })
}

async fn user_state(
    State(state): State<ServiceState>,
    Query(query): Query<StateQuery>,
) -> Result<Json<tenant_context::StateView>, StatusCode> {
    let user_id = UserId::new(query.user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(state.context.get_state(&user_id).await))
}

/// Drive one document through [`IntakePipeline::intake`]. The request body
/// is the document's extracted plain text; binary storage content is the
/// same bytes here since this edge does not perform its own text
/// extraction from arbitrary file formats.
async fn intake(
    State(state): State<ServiceState>,
    Query(query): Query<IntakeQuery>,
    body: String,
) -> Result<Json<IntakeResponse>, StatusCode> {
    let user_id = UserId::new(query.user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let result = state
        .intake
        .intake(
            user_id,
            body.as_bytes(),
            &query.filename,
            query.mime.as_deref(),
            &body,
            query.hint.as_deref(),
        )
        .await
        .map_err(|err| {
            warn!(error = %err, "intake pipeline failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(IntakeResponse {
        doc_id: result.document.doc_id.0.clone(),
        was_duplicate: result.was_duplicate,
        doc_type: result.classification.as_ref().map(|c| c.doc_type.clone()),
        confidence: result.classification.as_ref().map(|c| c.confidence),
        events_extracted: result.extracted_events.len(),
        matched_law_ids: result.matched_law_ids,
    }))
}

fn spawn_idle_eviction(context: Arc<ContextLoop>, idle_ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60).min(idle_ttl));
        loop {
            ticker.tick().await;
            context.evict_idle(idle_ttl);
        }
    });
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = format!("tenant_runtime={log_level},tenant_context={log_level},tenant_vault={log_level},tenant_intake={log_level}");
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
