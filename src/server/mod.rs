//! HTTP API over the post resolver.
//!
//! Every handler shares one [`PostResolver`], and so one browser session.
//! Requests queue on the session lock and resolve one at a time.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::services::PostResolver;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PostResolver>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::from_resolver(settings.create_resolver()?))
    }

    pub fn from_resolver(resolver: PostResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

/// Start the web server and close the browser when it stops.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let resolver = state.resolver.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    resolver.session().shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
