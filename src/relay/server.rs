use anyhow::Context;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal, sync::RwLock};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{debug, error, info, warn};

use crate::config::RaceConfig;
use crate::relay::appstate::{outbound_queue, AppState};
use crate::relay::client::Client;

/// The body of the liveness route.
pub const GREETING: &str = "Hello from typerace!";

/// Start the game server.
///
/// Binds to the configured host and port, serves the WebSocket route and
/// the HTTP endpoints, and shuts down gracefully on Ctrl+C or SIGTERM.
///
/// # Arguments
///
/// * `config` - The resolved server configuration.
pub async fn start_ws(config: &RaceConfig) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    debug!("Server configured to listen on {addr}...");
    match config.app_environment.as_str() {
        "production" => debug!("Running in production mode"),
        _ => debug!("Running in development mode"),
    }

    let state = AppState::new(config.game_options());
    let app = router(state, &config.app_origin)?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to listen on: {addr}"))?;
    info!("Listening on: {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Build the application routes around `state`.
///
/// # Arguments
///
/// * `state` - The shared game state.
/// * `origin` - The allowed CORS origin, `*` for any.
pub fn router(state: Arc<RwLock<AppState>>, origin: &str) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(cors_layer(origin)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        ))
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {origin}"))?;
    Ok(layer.allow_origin(origin))
}

/// Handler for the WebSocket route.
///
/// # Arguments
///
/// * `ws` - The upgrade request.
/// * `state` - The shared game state.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    debug!("Upgrading Connection");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one WebSocket connection to completion.
///
/// Outbound packets are queued on a bounded channel and written by a
/// dedicated task, so game handlers never wait on a slow socket. When the
/// client goes away, or stops reading until its queue fills, its player is
/// removed, which closes the queue and ends the writer.
///
/// # Arguments
///
/// * `socket` - The upgraded WebSocket connection.
/// * `state` - The shared game state.
async fn handle_socket(socket: WebSocket, state: Arc<RwLock<AppState>>) {
    // Split the WebSocket into a sender and a receiver
    let (mut sink, mut stream) = socket.split();
    let (sender, receiver) = outbound_queue();

    // Register the player and queue its greeting
    let mut client = Client::connect(&state, sender).await;
    info!(player_id = %client.id(), "Player connected");

    // Forward queued packets to the socket until the queue is closed
    let writer = tokio::spawn(async move {
        while let Ok(message) = receiver.recv_async().await {
            if let Err(error) = sink.send(message).await {
                warn!("Failed to send message to the client: {}", error);
                return;
            }
        }
        if let Err(error) = sink.close().await {
            debug!("Failed to close the socket: {}", error);
        }
    });

    // Handle incoming messages until the client disconnects
    while let Some(message) = stream.next().await {
        match message {
            Ok(message) => client.handle_message(&state, message).await,
            Err(error) => {
                warn!("Failed to read message from client: {}", error);
                break;
            }
        }
    }

    // Handle the close event and wait for the writer to finish
    client.handle_close(&state).await;
    if let Err(error) = writer.await {
        error!("Writer task failed: {}", error);
    }
    info!(player_id = %client.id(), "Player disconnected");
}

async fn index() -> &'static str {
    GREETING
}

async fn status() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    let response = json!({
        "data": {
            "version": version,
        },
        "message": "Service is running..."
    });
    (StatusCode::OK, Json(response))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!("Failed to install signal handler: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
