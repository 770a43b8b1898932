use crate::config::AppConfig;
use crate::counter::RequestCounter;
use crate::watchdog::{Action, Watchdog};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// How termination actually happens once the watchdog decides on it.
///
/// Production wiring installs `std::process::exit(0)`; tests install a flag.
pub type Terminator = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
struct AppState {
    counter: RequestCounter,
    watchdog: Arc<Watchdog>,
    terminate: Terminator,
}

/// Build the application router with the watchdog wrapped around every route,
/// matched or not.
pub fn router(counter: RequestCounter, watchdog: Arc<Watchdog>, terminate: Terminator) -> Router {
    let state = AppState {
        counter,
        watchdog,
        terminate,
    };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            watch_requests,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(
    config: &AppConfig,
    watchdog: Arc<Watchdog>,
    terminate: Terminator,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(RequestCounter::new(), watchdog, terminate);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Count the request and run the watchdog once the downstream handler is
/// done, whatever status it produced.
///
/// On a breach the terminator never returns control, so the response for the
/// breaching request is abandoned. That is the intended trade: a fast,
/// unconditional exit the supervisor can react to.
async fn watch_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let count = state.counter.increment();
    if state.watchdog.observe(count) == Action::Terminate {
        (state.terminate)();
    }

    response
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"ok": true}))
}

async fn stats(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "requests_handled": state.counter.current(),
        "watchdog_active": state.watchdog.is_active(),
    }))
}

/// Normal host shutdown on ctrl-c. Unrelated to watchdog termination, which
/// never drains.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
