//! Service façade
//!
//! Wires the classifier cascade, session registry, event sink, transport
//! backend and HTTP endpoints together, and owns the shutdown signal.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::http::{self, HttpState};
use gesture_classifier::{ClassifierCascade, GestureClassifier, ModelState};
use gesture_session::SessionRegistry;
use gesture_transport::{
    build_transport, shutdown_requested, BroadcastEventSink, ConnectionContext, RunningTransport,
    Transport,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Buffered gesture events per subscriber before the oldest are dropped
pub const EVENT_CAPACITY: usize = 256;

/// The assembled gateway
pub struct GestureService {
    config: ServiceConfig,
    registry: Arc<SessionRegistry>,
    events: BroadcastEventSink,
    transport: Arc<dyn Transport>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for GestureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureService")
            .field("backend", &self.transport.kind())
            .field("model_state", &self.model_state())
            .field("connections", &self.transport.connection_count())
            .finish_non_exhaustive()
    }
}

/// Addresses and tasks of a started service
#[derive(Debug)]
pub struct RunningService {
    pub ws_addr: SocketAddr,
    pub http_addr: SocketAddr,
    transport: RunningTransport,
    http: JoinHandle<()>,
}

impl RunningService {
    /// Wait for the transport and HTTP server to stop
    pub async fn wait(self) {
        self.transport.join().await;
        if let Err(e) = self.http.await {
            error!("HTTP server task failed: {}", e);
        }
    }
}

impl GestureService {
    /// Initialize the classifier cascade and assemble the service
    ///
    /// # Errors
    /// Returns `ServiceError::Config` for an invalid configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let cascade = ClassifierCascade::initialize(&config.cascade_config());
        Self::with_classifier(config, Arc::new(cascade))
    }

    /// Assemble the service around an existing classifier
    ///
    /// # Errors
    /// Returns `ServiceError::Config` for an invalid configuration.
    pub fn with_classifier(
        config: ServiceConfig,
        classifier: Arc<dyn GestureClassifier>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let registry = Arc::new(SessionRegistry::new(classifier, config.session_config()));
        let events = BroadcastEventSink::new(EVENT_CAPACITY);
        let ctx = Arc::new(ConnectionContext::new(
            Arc::clone(&registry),
            Arc::new(events.clone()),
            config.transport_config(),
        ));
        let transport = build_transport(config.backend, ctx);
        let (shutdown, _) = watch::channel(false);

        info!(
            "Gesture service assembled: backend={}, model={}, heartbeat={} ms",
            config.backend,
            registry.model_state(),
            config.heartbeat_interval_ms
        );

        Ok(Self {
            config,
            registry,
            events,
            transport,
            shutdown,
        })
    }

    /// Bind the streaming and HTTP endpoints
    ///
    /// # Errors
    /// Returns a bind error for either endpoint; nothing is left listening.
    pub async fn start(&self) -> Result<RunningService, ServiceError> {
        if self.is_shutting_down() {
            return Err(ServiceError::ShutDown);
        }

        let transport = self
            .transport
            .start(self.config.ws_addr(), self.shutdown.subscribe())
            .await?;

        let state = Arc::new(HttpState::new(
            Arc::clone(&self.registry),
            Arc::clone(self.transport.hub()),
        ));
        let http_addr = self.config.http_addr();
        let mut http_shutdown = self.shutdown.subscribe();
        let bound = warp::serve(http::routes(state)).try_bind_with_graceful_shutdown(
            http_addr,
            async move { shutdown_requested(&mut http_shutdown).await },
        );
        let (http_addr, server) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                self.shutdown();
                transport.join().await;
                return Err(ServiceError::HttpBind {
                    addr: http_addr,
                    reason: e.to_string(),
                });
            }
        };
        let http = tokio::spawn(server);

        info!(
            "Gesture service ready: ws://{} ({}), http://{}",
            transport.local_addr, transport.kind, http_addr
        );
        Ok(RunningService {
            ws_addr: transport.local_addr,
            http_addr,
            transport,
            http,
        })
    }

    /// Start, serve until `signal` resolves, then shut down gracefully
    ///
    /// # Errors
    /// Returns startup errors; once serving, shutdown always succeeds.
    pub async fn run_until<F>(&self, signal: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()>,
    {
        let running = self.start().await?;
        signal.await;
        self.shutdown();
        running.wait().await;
        self.drain(self.config.heartbeat_interval()).await;
        Ok(())
    }

    /// Signal every component to stop; idempotent
    ///
    /// Transports stop accepting and live connections are closed with 1001.
    pub fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        info!(
            "Shutting down, closing {} live connections",
            self.transport.connection_count()
        );
    }

    #[inline]
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Wait for live connections to finish closing, up to `limit`
    async fn drain(&self, limit: Duration) {
        let drained = tokio::time::timeout(limit, async {
            while self.transport.connection_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                "{} connections still open after {:?}",
                self.transport.connection_count(),
                limit
            );
        }
        let stats = self.registry.aggregate_stats();
        info!(
            "Service stopped: {} sessions closed, {} gestures in live sessions at exit",
            self.registry.closed_count(),
            stats.total_gestures
        );
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Gesture events for downstream consumers
    #[inline]
    #[must_use]
    pub fn events(&self) -> &BroadcastEventSink {
        &self.events
    }

    #[must_use]
    pub fn model_state(&self) -> ModelState {
        self.registry.model_state()
    }
}
