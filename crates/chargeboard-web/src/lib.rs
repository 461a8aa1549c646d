//! chargeboard-web - JSON API and SSE stream over the analytical cache

pub mod params;
pub mod router;
pub mod sse;

pub use router::{create_router, AppState};

use anyhow::{Context, Result};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Run the web server until `shutdown` resolves
pub async fn run(state: AppState, addr: &str, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let router = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr()?;

    info!(addr = %local, "Web server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server failed")?;

    Ok(())
}
