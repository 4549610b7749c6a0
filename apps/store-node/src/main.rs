use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::{ErrorReply, KeyListing, KeyRecord, MessageReply, SetRequest};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

mod store;
mod wal;

use store::MemoryStore;
use wal::Wal;

const DEFAULT_CAPACITY: usize = 1024;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 2000;

#[derive(Clone)]
struct ServerState {
    store: Arc<Mutex<MemoryStore>>,
    wal: Arc<Wal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .compact()
        .init();

    let capacity = parse_capacity(std::env::var("KVDECK_STORE_CAPACITY").ok().as_deref());
    let sweep_interval =
        parse_sweep_interval(std::env::var("KVDECK_SWEEP_INTERVAL_MS").ok().as_deref());
    let data_dir = PathBuf::from(
        std::env::var("KVDECK_DATA_DIR").unwrap_or_else(|_| "./data/store-node".to_string()),
    );

    let wal = Arc::new(Wal::open(data_dir.join("store.wal")).await?);
    let mut store = MemoryStore::new(capacity);
    let replayed = wal.recover(&mut store).await?;
    info!(replayed, capacity, live_keys = store.len(), "store recovered from wal");

    let state = ServerState {
        store: Arc::new(Mutex::new(store)),
        wal,
    };

    spawn_ttl_sweeper(state.clone(), sweep_interval);

    let app = build_router(state);

    let bind_addr = std::env::var("KVDECK_STORE_BIND")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse::<SocketAddr>()?;
    info!(%bind_addr, "store node listening");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/set", post(set_key))
        .route("/get/{key}", get(get_key))
        .route("/delete/{key}", delete(delete_key))
        .route("/keys", get(list_keys))
        .route("/clear", delete(clear_all))
        .route("/stats", get(stats))
        .route("/compact", post(compact_wal))
        .with_state(state)
}

fn parse_capacity(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|capacity| *capacity > 0)
        .unwrap_or(DEFAULT_CAPACITY)
}

fn parse_sweep_interval(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);
    Duration::from_millis(millis)
}

fn spawn_ttl_sweeper(state: ServerState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = state.store.lock().await.sweep_expired();
            if expired > 0 {
                debug!(expired, "ttl sweep dropped expired keys");
            }
        }
    });
}

async fn set_key(
    State(state): State<ServerState>,
    Json(payload): Json<SetRequest>,
) -> impl IntoResponse {
    if payload.key.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorReply {
                detail: "key is required".to_string(),
            }),
        )
            .into_response();
    }

    state
        .store
        .lock()
        .await
        .set(payload.key.clone(), payload.value.clone(), payload.ttl);

    if let Err(err) = state
        .wal
        .append_set(&payload.key, &payload.value, payload.ttl)
        .await
    {
        warn!(error = %err, key = %payload.key, "failed to log set");
    }

    info!(key = %payload.key, ttl = ?payload.ttl, "set accepted");
    (
        StatusCode::OK,
        Json(MessageReply {
            message: "SET ok".to_string(),
            key: Some(payload.key),
        }),
    )
        .into_response()
}

async fn get_key(State(state): State<ServerState>, Path(key): Path<String>) -> impl IntoResponse {
    let mut store = state.store.lock().await;
    match store.get(&key) {
        Some(value) => {
            let ttl_remaining = store.ttl_remaining(&key);
            (
                StatusCode::OK,
                Json(KeyRecord {
                    key,
                    value,
                    ttl_remaining,
                }),
            )
                .into_response()
        }
        None => not_found_reply(),
    }
}

async fn delete_key(
    State(state): State<ServerState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let removed = state.store.lock().await.delete(&key);
    if !removed {
        return not_found_reply();
    }

    if let Err(err) = state.wal.append_delete(&key).await {
        warn!(error = %err, key = %key, "failed to log delete");
    }

    info!(key = %key, "delete accepted");
    (
        StatusCode::OK,
        Json(MessageReply {
            message: "DELETE ok".to_string(),
            key: Some(key),
        }),
    )
        .into_response()
}

async fn list_keys(State(state): State<ServerState>) -> Json<KeyListing> {
    let keys = state.store.lock().await.keys();
    let count = keys.len() as u64;
    Json(KeyListing { keys, count })
}

async fn clear_all(State(state): State<ServerState>) -> Json<MessageReply> {
    let removed = {
        let mut store = state.store.lock().await;
        let keys = store.keys();
        for key in &keys {
            store.delete(key);
        }
        keys
    };

    for key in &removed {
        if let Err(err) = state.wal.append_delete(key).await {
            warn!(error = %err, key = %key, "failed to log clear delete");
        }
    }

    info!(removed = removed.len(), "store cleared");
    Json(MessageReply {
        message: "All keys cleared".to_string(),
        key: None,
    })
}

async fn stats(State(state): State<ServerState>) -> impl IntoResponse {
    let wal_file_size = state.wal.size().await.unwrap_or(0);
    let snapshot = state.store.lock().await.stats(wal_file_size);
    Json(snapshot)
}

async fn compact_wal(State(state): State<ServerState>) -> impl IntoResponse {
    let result = {
        let store = state.store.lock().await;
        state.wal.compact(&store).await
    };

    match result {
        Ok(()) => {
            info!("wal compacted");
            (
                StatusCode::OK,
                Json(MessageReply {
                    message: "WAL compacted successfully".to_string(),
                    key: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "wal compaction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorReply {
                    detail: "compaction failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn not_found_reply() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorReply {
            detail: "Key not found".to_string(),
        }),
    )
        .into_response()
}
