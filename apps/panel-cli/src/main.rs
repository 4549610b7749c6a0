use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use client_sdk::StoreClient;
use panel_core::{PanelController, PanelState};
use serde::Deserialize;
use tracing::info;

#[derive(Clone)]
struct PanelWebState {
    controller: Arc<PanelController>,
}

#[derive(Debug, Parser)]
#[command(name = "kvdeck")]
#[command(about = "CLI and browser control panel for a kvdeck store node")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Set {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    Get {
        key: String,
    },
    Delete {
        key: String,
    },
    Keys,
    Clear,
    Stats,
    Compact,
    ServePanel {
        #[arg(long, default_value = "127.0.0.1:8081")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = StoreClient::new(&cli.server_url);

    match cli.command {
        Commands::Set { key, value, ttl } => {
            client.set(key.clone(), value, ttl).await?;
            match ttl {
                Some(secs) => println!("set '{key}' (expires in {secs}s)"),
                None => println!("set '{key}'"),
            }
        }
        Commands::Get { key } => {
            let record = client.get(&key).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Delete { key } => {
            client.delete(&key).await?;
            println!("deleted '{key}'");
        }
        Commands::Keys => {
            let listing = client.list_keys().await?;
            for key in &listing.keys {
                println!("{key}");
            }
            println!("{} keys", listing.count);
        }
        Commands::Clear => {
            let message = client.clear_all().await?;
            println!("{message}");
        }
        Commands::Stats => {
            let snapshot = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Compact => {
            let message = client.compact().await?;
            println!(
                "{}",
                message.unwrap_or_else(|| "compaction finished".to_string())
            );
        }
        Commands::ServePanel { bind } => {
            serve_panel(client, &bind).await?;
        }
    }

    Ok(())
}

async fn serve_panel(client: StoreClient, bind: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .compact()
        .init();

    let bind_addr: SocketAddr = bind.parse()?;
    let state = PanelWebState {
        controller: Arc::new(PanelController::new(client)),
    };

    let app = Router::new()
        .route("/", get(|| async { Html(panel_ui::app_html()) }))
        .route("/api/state", get(panel_state))
        .route("/api/op/set", post(op_set))
        .route("/api/op/lookup", post(op_lookup))
        .route("/api/op/delete", post(op_delete))
        .route("/api/op/refresh-keys", post(op_refresh_keys))
        .route("/api/op/clear", post(op_clear))
        .route("/api/op/compact", post(op_compact))
        .route("/api/op/refresh-stats", post(op_refresh_stats))
        .route("/api/op/ack", post(op_ack))
        .route(
            "/api/ping",
            get(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "service": "kvdeck-panel"
                }))
            }),
        )
        .with_state(state);

    info!(%bind_addr, "control panel listening");
    println!("control panel at http://{bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Body of the form-backed operations. The TTL arrives as the raw text of
/// the input field; the controller decides what it means.
#[derive(Debug, Deserialize)]
struct SetForm {
    key: String,
    value: String,
    #[serde(default)]
    ttl: String,
}

#[derive(Debug, Deserialize)]
struct KeyForm {
    key: String,
}

async fn panel_state(State(state): State<PanelWebState>) -> Json<PanelState> {
    Json(state.controller.snapshot().await)
}

async fn op_set(State(state): State<PanelWebState>, Json(form): Json<SetForm>) -> Json<PanelState> {
    state.controller.set(&form.key, &form.value, &form.ttl).await;
    Json(state.controller.snapshot().await)
}

async fn op_lookup(
    State(state): State<PanelWebState>,
    Json(form): Json<KeyForm>,
) -> Json<PanelState> {
    state.controller.lookup(&form.key).await;
    Json(state.controller.snapshot().await)
}

async fn op_delete(
    State(state): State<PanelWebState>,
    Json(form): Json<KeyForm>,
) -> Json<PanelState> {
    state.controller.delete(&form.key).await;
    Json(state.controller.snapshot().await)
}

async fn op_refresh_keys(State(state): State<PanelWebState>) -> Json<PanelState> {
    state.controller.refresh_keys().await;
    Json(state.controller.snapshot().await)
}

async fn op_clear(State(state): State<PanelWebState>) -> Json<PanelState> {
    state.controller.clear_all().await;
    Json(state.controller.snapshot().await)
}

async fn op_compact(State(state): State<PanelWebState>) -> Json<PanelState> {
    state.controller.compact().await;
    Json(state.controller.snapshot().await)
}

async fn op_refresh_stats(State(state): State<PanelWebState>) -> Json<PanelState> {
    state.controller.refresh_stats().await;
    Json(state.controller.snapshot().await)
}

async fn op_ack(State(state): State<PanelWebState>) -> Json<PanelState> {
    state.controller.dismiss_ack().await;
    Json(state.controller.snapshot().await)
}
