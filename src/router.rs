//! Single-page application asset routing.
//!
//! [`route`] asks an [`AssetFetcher`] for the requested asset. When the
//! fetcher answers `404 Not Found` to a `GET`, the router instead returns the
//! fetcher's answer for `GET /index.html` on the same origin, carrying the
//! original request headers, so client-side routes resolve to the app shell.
//! Every other response, and every non-`GET` request, passes through
//! untouched.
//!
//! # Example
//!
//! ```no_run
//! use lastframe::router::{StaticAssets, app};
//!
//! # async fn example() -> std::io::Result<()> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
//! axum::serve(listener, app(StaticAssets::new("dist"))).await?;
//! # Ok(())
//! # }
//! ```

use std::{future::Future, path::Path, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode, Uri, uri::PathAndQuery},
    response::Response,
};
use tower::ServiceExt;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Path of the document served for unresolved `GET` requests.
pub const FALLBACK_DOCUMENT: &str = "/index.html";

/// The static-asset resolver capability the router is handed.
pub trait AssetFetcher: Send + Sync + 'static {
    /// Resolve `request` to a response. A missing asset is a `404`.
    fn fetch(&self, request: Request) -> impl Future<Output = Response> + Send;
}

/// Serve `request` from `assets`, falling back to [`FALLBACK_DOCUMENT`] for
/// unresolved `GET`s.
pub async fn route<A: AssetFetcher + ?Sized>(request: Request, assets: &A) -> Response {
    let is_get = request.method() == Method::GET;
    let fallback = if is_get {
        Some(fallback_request(&request))
    } else {
        None
    };

    let response = assets.fetch(request).await;
    match fallback {
        Some(fallback) if response.status() == StatusCode::NOT_FOUND => {
            log::debug!("Asset not found, serving {}", fallback.uri());
            assets.fetch(fallback).await
        }
        _ => response,
    }
}

/// Build `GET /index.html` on the origin of `original`, with its headers.
fn fallback_request(original: &Request) -> Request {
    let mut request = Request::new(Body::empty());
    *request.method_mut() = Method::GET;
    *request.uri_mut() = fallback_uri(original.uri());
    *request.version_mut() = original.version();
    *request.headers_mut() = original.headers().clone();
    request
}

/// Same scheme and authority as `uri`, path [`FALLBACK_DOCUMENT`], no query.
fn fallback_uri(uri: &Uri) -> Uri {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::from_static(FALLBACK_DOCUMENT));
    Uri::from_parts(parts).unwrap_or_else(|_| Uri::from_static(FALLBACK_DOCUMENT))
}

/// An [`AssetFetcher`] backed by a directory on disk.
///
/// Missing files answer `404` and unsupported methods `405`; there is no
/// built-in fallback, that is [`route`]'s job.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    service: ServeDir,
}

impl StaticAssets {
    /// Serve files below `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            service: ServeDir::new(root),
        }
    }
}

impl AssetFetcher for StaticAssets {
    async fn fetch(&self, request: Request) -> Response {
        match self.service.clone().oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}

/// An axum [`Router`] that sends every request through [`route`].
pub fn app<A: AssetFetcher>(assets: A) -> Router {
    Router::new()
        .fallback(serve_asset::<A>)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(assets))
}

async fn serve_asset<A: AssetFetcher>(State(assets): State<Arc<A>>, request: Request) -> Response {
    route(request, assets.as_ref()).await
}
