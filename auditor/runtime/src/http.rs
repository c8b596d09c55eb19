//! Serves scan reports over HTTP.
//!
//! - `GET /` describes the service.
//! - `GET /health` checks that the cluster's API server is reachable.
//! - `GET /scan` runs a scan and returns the report.

use crate::{
    k8s::{self, ClusterApi, ErrorKind},
    scan::Scanner,
};
use anyhow::Result;
use futures::future;
use hyper::{http, Request, Response};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, trace, warn, Instrument};


type Body = http_body_util::Full<bytes::Bytes>;

/// Routes requests to the cluster scanner.
#[derive(Debug)]
pub struct ReportService<C> {
    scanner: Arc<Scanner<C>>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Route {
    Root,
    Health,
    Scan,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
    timestamp: String,
}

// === impl ReportService ===

impl<C> ReportService<C> {
    pub fn new(scanner: Arc<Scanner<C>>) -> Self {
        Self { scanner }
    }
}

impl<C> Clone for ReportService<C> {
    fn clone(&self) -> Self {
        Self {
            scanner: self.scanner.clone(),
        }
    }
}

impl<C, B> tower::Service<Request<B>> for ReportService<C>
where
    C: ClusterApi + 'static,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), path = %req.uri().path());
        let Some(route) = Route::from_path(req.uri().path()) else {
            let detail = format!("no such path: {}", req.uri().path());
            return Box::pin(future::ready(error_response(
                http::StatusCode::NOT_FOUND,
                "not_found",
                detail,
            )));
        };

        if !matches!(*req.method(), http::Method::GET | http::Method::HEAD) {
            let detail = format!("method {} is not allowed", req.method());
            return Box::pin(future::ready(
                error_response(
                    http::StatusCode::METHOD_NOT_ALLOWED,
                    "method_not_allowed",
                    detail,
                )
                .map(|mut rsp| {
                    rsp.headers_mut().insert(
                        http::header::ALLOW,
                        http::HeaderValue::from_static("GET, HEAD"),
                    );
                    rsp
                }),
            ));
        }

        let scanner = self.scanner.clone();
        Box::pin(async move {
            match route {
                Route::Root => json_response(
                    http::StatusCode::OK,
                    &serde_json::json!({
                        "status": "healthy",
                        "service": "kube-auditor",
                        "version": env!("CARGO_PKG_VERSION"),
                    }),
                ),
                Route::Health => health(&scanner).await,
                Route::Scan => scan(&scanner).await,
            }
        })
    }
}

async fn health<C: ClusterApi>(scanner: &Scanner<C>) -> Result<Response<Body>, Error> {
    match scanner.cluster().version().await {
        Ok(version) => json_response(
            http::StatusCode::OK,
            &serde_json::json!({
                "status": "healthy",
                "service": "kube-auditor",
                "kubernetes": "connected",
                "kubernetesVersion": version,
            }),
        ),
        Err(error) => {
            warn!(%error, "Cluster health check failed");
            json_response(
                http::StatusCode::SERVICE_UNAVAILABLE,
                &serde_json::json!({
                    "status": "unhealthy",
                    "kubernetes": "disconnected",
                    "reason": format!("Kubernetes connectivity error: {error}"),
                }),
            )
        }
    }
}

async fn scan<C: ClusterApi>(scanner: &Scanner<C>) -> Result<Response<Body>, Error> {
    match scanner.scan().await {
        Ok(report) => json_response(http::StatusCode::OK, &report),
        Err(error) => {
            warn!(%error, "Scan failed");
            let kind = error.kind();
            let (status, detail) = scan_failure(kind, &error);
            error_response(status, kind.as_str(), detail)
        }
    }
}

fn scan_failure(kind: ErrorKind, error: &k8s::Error) -> (http::StatusCode, String) {
    match kind {
        ErrorKind::Unauthorized => (
            http::StatusCode::UNAUTHORIZED,
            format!("Authentication failed: {error}"),
        ),
        ErrorKind::Forbidden => (
            http::StatusCode::FORBIDDEN,
            format!("Insufficient permissions to scan cluster: {error}"),
        ),
        ErrorKind::Unavailable => (
            http::StatusCode::SERVICE_UNAVAILABLE,
            format!("Cluster connectivity error: {error}"),
        ),
        ErrorKind::Other => (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal scan error: {error}"),
        ),
    }
}

fn error_response(
    status: http::StatusCode,
    error: &'static str,
    detail: String,
) -> Result<Response<Body>, Error> {
    json_response(
        status,
        &ErrorResponse {
            error,
            detail,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

fn json_response(
    status: http::StatusCode,
    body: &impl Serialize,
) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(body)?;
    let rsp = Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))?;
    Ok(rsp)
}

// === impl Route ===

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Self::Root),
            "/health" => Some(Self::Health),
            "/scan" => Some(Self::Scan),
            _ => None,
        }
    }
}

/// Serves reports on `addr` until the runtime begins shutting down.
///
/// In-flight connections are shut down gracefully before the drain handle is released.
#[instrument(skip_all, fields(port = %addr.port()))]
pub async fn serve<C>(addr: SocketAddr, svc: ReportService<C>, drain: drain::Watch) -> Result<()>
where
    C: ClusterApi + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "report server listening");

    let signaled = drain.clone().signaled();
    tokio::pin!(signaled);

    loop {
        let (io, client_addr) = tokio::select! {
            res = listener.accept() => match res {
                Ok(conn) => conn,
                Err(error) => {
                    warn!(%error, "Failed to accept connection");
                    continue;
                }
            },
            _ = &mut signaled => {
                debug!("Shutting down report server");
                return Ok(());
            }
        };

        let svc = TowerToHyperService::new(svc.clone());
        let drain = drain.clone();
        tokio::spawn(
            async move {
                let builder = auto::Builder::new(TokioExecutor::new());
                let conn = builder.serve_connection(TokioIo::new(io), svc);
                tokio::pin!(conn);
                tokio::select! {
                    res = &mut conn => {
                        if let Err(error) = res {
                            debug!(%error, "Connection failed");
                        }
                    }
                    handle = drain.signaled() => {
                        conn.as_mut().graceful_shutdown();
                        if let Err(error) = handle.release_after(conn).await {
                            debug!(%error, "Connection failed during shutdown");
                        }
                    }
                }
            }
            .instrument(tracing::debug_span!("conn", client.addr = %client_addr)),
        );
    }
}
