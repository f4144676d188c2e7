//! quizroom-back binary entrypoint wiring the WebSocket channel, REST routes and collaborators.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizroom_back::{
    config::AppConfig,
    dao::{
        persistence::{DetachedBridge, PersistenceBridge},
        questions::{DisabledSource, QuestionSource},
    },
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let persistence = build_persistence()?;
    let questions = build_question_source()?;
    let app_state = AppState::new(config, questions, persistence);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the HTTP persistence bridge when `PERSISTENCE_BASE_URL` is set, run detached otherwise.
fn build_persistence() -> anyhow::Result<Arc<dyn PersistenceBridge>> {
    #[cfg(feature = "http-bridge")]
    {
        use quizroom_back::dao::persistence::http::{BridgeConfig, HttpPersistenceBridge};

        if let Ok(bridge_config) = BridgeConfig::from_env() {
            info!(base_url = %bridge_config.base_url, "persisting rooms over HTTP");
            let bridge = HttpPersistenceBridge::connect(bridge_config)
                .context("building persistence client")?;
            return Ok(Arc::new(bridge));
        }
    }

    info!("no persistence collaborator configured; running detached");
    Ok(Arc::new(DetachedBridge))
}

/// Install the generative question source when `QUESTION_API_KEY` is set, placeholders otherwise.
fn build_question_source() -> anyhow::Result<Arc<dyn QuestionSource>> {
    #[cfg(feature = "generated-questions")]
    {
        use quizroom_back::dao::questions::generated::{
            GeneratedQuestionSource, GeneratedSourceConfig,
        };

        if let Some(source_config) = GeneratedSourceConfig::from_env() {
            info!(models = ?source_config.models, "generating questions");
            let source = GeneratedQuestionSource::new(source_config)
                .context("building question source client")?;
            return Ok(Arc::new(source));
        }
    }

    info!("no question source configured; using placeholder questions");
    Ok(Arc::new(DisabledSource))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
