use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::Service;
use tracing::{error, info, warn};

/// How long in-flight connections get to finish after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Accept HTTP/1 connections on `listener` until `shutdown` resolves, then
/// stop accepting and let open connections finish their current request
/// (bounded by `grace`).
pub async fn serve<S, F>(
    listener: TcpListener,
    service: S,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, Infallible>>>
        + Clone
        + Send
        + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    S::Future: Send + 'static,
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let hyper_service = TowerToHyperService::new(service.clone());
                let conn = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .serve_connection(TokioIo::new(stream), hyper_service);
                let conn = graceful.watch(conn);

                tokio::task::spawn(async move {
                    if let Err(err) = conn.await {
                        error!("Error serving connection from {}: {:?}", peer, err);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);

    tokio::select! {
        _ = graceful.shutdown() => info!("All connections closed"),
        _ = tokio::time::sleep(grace) => {
            warn!("Connections still open after {:?}, closing anyway", grace)
        }
    }

    Ok(())
}
