//! HTTP endpoints exposing the chain
//!
//! A thin axum router over read-only snapshots. The engine state lives only
//! in memory; these endpoints never mutate it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::consensus::Block;
use crate::storage::Blockchain;

pub fn router(chain: Arc<Blockchain>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chain", get(get_chain))
        .route("/height", get(get_height))
        .route("/blocks/:index", get(get_block))
        .layer(cors)
        .with_state(chain)
}

/// Serve the read-only API until the process exits.
pub async fn serve(chain: Arc<Blockchain>, port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, router(chain)).await
}

async fn get_chain(State(chain): State<Arc<Blockchain>>) -> Json<Vec<Block>> {
    Json(chain.blocks())
}

async fn get_height(State(chain): State<Arc<Blockchain>>) -> Json<usize> {
    Json(chain.len())
}

async fn get_block(
    State(chain): State<Arc<Blockchain>>,
    Path(index): Path<usize>,
) -> Result<Json<Block>, (StatusCode, String)> {
    chain
        .block_at(index)
        .map(Json)
        .map_err(|err| (StatusCode::NOT_FOUND, err.to_string()))
}
