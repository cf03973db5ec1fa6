//! Gateway session lifecycle.

use std::{sync::Arc, time::Duration};

use {
    serenity::{all::GatewayError, cache::Cache, gateway::ShardManager, http::Http, Client},
    tokio::sync::watch,
    tracing::{error, info},
};

use dcf_core::{session::SessionState, Error, Result};

use crate::handler::{intents, ReadyHandler};

/// Why the background receive loop stopped before the session became ready.
#[derive(Clone, Debug)]
enum StartFailure {
    Auth(String),
    Connection(String),
}

impl StartFailure {
    fn into_error(self) -> Error {
        match self {
            StartFailure::Auth(msg) => Error::Auth(msg),
            StartFailure::Connection(msg) => Error::Connection(msg),
        }
    }
}

/// One authenticated session to the Discord gateway.
///
/// Owns the background receive loop (serenity's shard runner) for the life of
/// the process. Entity resolution goes through the retained HTTP handle and
/// cache; see the `ChannelHost` impl in `host.rs`.
pub struct GatewayConnection {
    pub(crate) http: Arc<Http>,
    pub(crate) cache: Arc<Cache>,
    shard_manager: Arc<ShardManager>,
    session: Arc<SessionState>,
    failure_rx: watch::Receiver<Option<StartFailure>>,
}

impl GatewayConnection {
    /// Begins the asynchronous handshake and spawns the receive loop.
    ///
    /// An empty token is rejected before touching the network. A token the
    /// gateway rejects surfaces from [`Self::wait_ready`] as [`Error::Auth`].
    pub async fn connect(token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Auth("bot token cannot be empty".to_string()));
        }

        let session = Arc::new(SessionState::new());
        let handler = ReadyHandler {
            session: session.clone(),
        };

        info!("connecting to the gateway");
        let mut client = Client::builder(token, intents())
            .event_handler(handler)
            .await
            .map_err(|e| classify_start(e).into_error())?;

        let http = client.http.clone();
        let cache = client.cache.clone();
        let shard_manager = client.shard_manager.clone();

        let (failure_tx, failure_rx) = watch::channel(None);
        tokio::spawn(async move {
            // The receive loop runs until shutdown_all or a fatal error.
            if let Err(e) = client.start().await {
                let failure = classify_start(e);
                error!(?failure, "gateway receive loop stopped");
                let _ = failure_tx.send(Some(failure));
            }
        });

        Ok(Self {
            http,
            cache,
            shard_manager,
            session,
            failure_rx,
        })
    }

    /// Waits until the handshake completes, the receive loop fails, or
    /// `timeout` elapses, whichever comes first.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let failed = async {
            let mut rx = self.failure_rx.clone();
            loop {
                if let Some(failure) = rx.borrow_and_update().clone() {
                    return failure;
                }
                if rx.changed().await.is_err() {
                    // Sender gone without a failure; leave it to the timeout.
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = self.session.wait_ready() => Ok(()),
            failure = failed => Err(failure.into_error()),
            _ = tokio::time::sleep(timeout) => Err(Error::Connection(format!(
                "gateway not ready after {}s",
                timeout.as_secs()
            ))),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Gracefully tears down the session and cancels the receive loop.
    /// Idempotent; valid even if the handshake never completed.
    pub async fn shutdown(&self) {
        if !self.session.close() {
            return;
        }
        self.shard_manager.shutdown_all().await;
        info!("gateway session closed");
    }
}

fn classify_start(err: serenity::Error) -> StartFailure {
    match err {
        serenity::Error::Gateway(GatewayError::InvalidAuthentication) => {
            StartFailure::Auth("token rejected by the gateway".to_string())
        }
        serenity::Error::Gateway(other) => {
            StartFailure::Connection(format!("gateway error: {other}"))
        }
        other => StartFailure::Connection(format!("gateway start failed: {other}")),
    }
}
