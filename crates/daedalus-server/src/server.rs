//! HTTP server.
//!
//! The server binds a TCP listener, serves every connection with hyper's
//! HTTP/1 implementation and hands each request to [`App::handle`]. It
//! stops accepting on shutdown and waits for open connections to drain.
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus_server::{App, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::builder().build()?;
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use daedalus_core::{ConnectionTracker, ShutdownSignal};
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::error::{ServerError, ServerResult};
use crate::writer::{fallback, HttpResponse};

/// The Daedalus HTTP server.
#[derive(Debug, Clone)]
pub struct Server {
    app: App,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
}

impl Server {
    /// Creates a server for `app` using its `server` configuration.
    pub fn new(app: App) -> Self {
        let config = &app.config().server;
        Self {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            max_body_bytes: config.max_body_bytes,
            app,
        }
    }

    /// The served application.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Runs until SIGINT or SIGTERM.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr: SocketAddr = self.app.config().server.http_addr.parse().map_err(|e| {
            ServerError::bind(format!(
                "invalid address '{}': {e}",
                self.app.config().server.http_addr
            ))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(format!("failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        info!(addr = %listener.local_addr()?, "server listening");

        let background = self.app.spawn_background(&shutdown);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = self.clone();
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    debug!(%remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                () = shutdown.recv() => {
                    info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!(
            timeout_secs = self.shutdown_timeout.as_secs(),
            active = tracker.active_connections(),
            "waiting for connections to close"
        );
        tokio::select! {
            () = tracker.wait_for_drain() => info!("all connections closed"),
            () = tokio::time::sleep(self.shutdown_timeout) => {
                warn!(active = tracker.active_connections(), "shutdown timeout reached");
            }
        }

        for task in background {
            if let Err(e) = task.await {
                warn!(error = %e, "background task failed");
            }
        }

        info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = self.clone();
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let connection = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(connection);

        tokio::select! {
            result = connection.as_mut() => result,
            () = shutdown.recv() => {
                debug!(%remote_addr, "closing connection for shutdown");
                connection.as_mut().graceful_shutdown();
                connection.await
            }
        }
    }

    async fn handle_request(&self, request: Request<Incoming>) -> HttpResponse {
        let (parts, body) = request.into_parts();

        let collected = tokio::time::timeout(
            self.request_timeout,
            Limited::new(body, self.max_body_bytes).collect(),
        )
        .await;

        let body: Bytes = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                    warn!(limit = self.max_body_bytes, "request body too large");
                    return fallback(StatusCode::PAYLOAD_TOO_LARGE);
                }
                warn!(error = %e, "failed to read request body");
                return fallback(StatusCode::BAD_REQUEST);
            }
            Err(_) => {
                warn!("request body read timed out");
                return fallback(StatusCode::REQUEST_TIMEOUT);
            }
        };

        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let request = Request::from_parts(parts, body);

        match tokio::time::timeout(self.request_timeout, self.app.handle(request)).await {
            Ok(response) => response,
            Err(_) => {
                warn!(%method, %path, "request timed out");
                fallback(StatusCode::GATEWAY_TIMEOUT)
            }
        }
    }
}
