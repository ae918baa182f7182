mod config;
mod engine;
mod error;
mod jobs;
mod logsink;
mod render;
mod service;
mod state;

use std::{net::SocketAddr, sync::Arc};

use tracing::info;

use crate::engine::CommandEngine;
use crate::jobs::JobRunner;
use crate::service::AppContext;
use crate::state::SessionState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    krmap_util::init_tracing()?;

    let addr_str = krmap_util::server_addr();
    let addr: SocketAddr = addr_str.parse()?;

    let paths = config::WorkPaths::resolve();
    let ctx = Arc::new(AppContext {
        session: Arc::new(SessionState::new()),
        runner: JobRunner::new(CommandEngine::from_env(), paths),
    });

    info!("krmap-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, service::router(ctx)).await?;

    Ok(())
}
