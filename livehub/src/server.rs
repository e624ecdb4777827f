//! Process lifecycle: serve, wait for a stop signal, drain sockets, close the pool.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{error, info, warn};

use livehub_api::{create_router, AppState, LiveHub};
use livehub_core::Config;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct LiveHubServer {
    config: Config,
    hub: Arc<LiveHub>,
    pool: Option<PgPool>,
}

impl LiveHubServer {
    pub const fn new(config: Config, hub: Arc<LiveHub>, pool: Option<PgPool>) -> Self {
        Self { config, hub, pool }
    }

    /// Serve until a stop signal arrives or the listener exits on its own
    pub async fn start(self) -> anyhow::Result<()> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let listener_task = self.spawn_listener(stop_rx).await?;

        tokio::select! {
            _ = listener_task => error!("Listener exited before a stop signal"),
            signal = wait_for_stop_signal() => info!(signal, "Stopping livehub"),
        }

        // Open sockets observe the same flag and send their close frames
        let _ = stop_tx.send(true);
        self.drain_and_close().await;
        Ok(())
    }

    async fn drain_and_close(&self) {
        let stats = self.hub.connection_metrics();
        info!(
            active = stats.active_connections,
            total = stats.total_connections,
            messages = stats.total_messages,
            in_room = stats.in_room,
            "Connection statistics"
        );

        let budget = Duration::from_secs(self.config.hub.drain_timeout_seconds);
        let open = self.hub.connection_count();
        if open > 0 {
            info!(open, budget_secs = budget.as_secs(), "Draining connections");
            if timeout(budget, self.wait_until_drained()).await.is_err() {
                warn!(
                    remaining = self.hub.connection_count(),
                    "Connections still open after drain budget"
                );
            }
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Database pool closed");
        }
        info!("livehub stopped");
    }

    async fn wait_until_drained(&self) {
        let mut ticker = interval(DRAIN_POLL_INTERVAL);
        while self.hub.connection_count() > 0 {
            ticker.tick().await;
        }
    }

    async fn spawn_listener(&self, stop_rx: watch::Receiver<bool>) -> anyhow::Result<JoinHandle<()>> {
        let address = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|err| anyhow::anyhow!("Cannot listen on {address}: {err}"))?;
        info!(%address, "Accepting WebSocket connections");

        let state = AppState::new(self.hub.clone(), self.config.hub.max_message_bytes)
            .with_shutdown(stop_rx.clone());
        let router = create_router(state);

        let mut stop_rx = stop_rx;
        Ok(tokio::spawn(async move {
            let stopped = async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            };
            match axum::serve(listener, router)
                .with_graceful_shutdown(stopped)
                .await
            {
                Ok(()) => info!("Listener closed"),
                Err(err) => error!(error = %err, "Listener failed"),
            }
        }))
    }
}

/// Resolves with the name of the first stop signal received
async fn wait_for_stop_signal() -> &'static str {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Cannot watch for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Cannot watch for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    }
}
