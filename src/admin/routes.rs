//! Route table built from the registry listing.
//!
//! The table is rebuilt from a full `list()` snapshot whenever the registry
//! changes and swapped in atomically; in-flight requests finish on the table
//! they started with.

use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::extract::{Request, State};
use axum::http::{Method, Uri};
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use tower::ServiceExt;

use crate::http::ApiError;
use crate::registry::GroupDescriptor;

/// Join the API prefix and an endpoint path. An endpoint path of `/` maps
/// to the prefix itself.
pub fn compose_path(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("", path) => path.to_string(),
        (prefix, "/") => prefix.to_string(),
        (prefix, path) => format!("{prefix}{path}"),
    }
}

/// Build a router serving every endpoint of `groups` under `prefix`.
///
/// `groups` is expected in registry order; when two groups claim the same
/// method and path the first one keeps it.
pub fn build_router(prefix: &str, groups: &[GroupDescriptor]) -> Result<Router, String> {
    let mut paths: BTreeMap<String, MethodRouter> = BTreeMap::new();
    let mut claimed: HashSet<(String, Method)> = HashSet::new();

    for group in groups {
        for entry in group.entries() {
            let path = compose_path(prefix, entry.path());
            if !paths.contains_key(&path) {
                if let Some(existing) = paths.keys().find(|p| conflicting_captures(p, &path)) {
                    tracing::warn!(
                        group = %group.name(),
                        path = %path,
                        existing = %existing,
                        "Endpoint capture conflicts with an existing route, skipping"
                    );
                    continue;
                }
            }
            if !claimed.insert((path.clone(), entry.method().clone())) {
                tracing::warn!(
                    group = %group.name(),
                    method = %entry.method(),
                    path = %path,
                    "Endpoint already served by another group, skipping"
                );
                continue;
            }

            let Ok(filter) = MethodFilter::try_from(entry.method().clone()) else {
                tracing::warn!(
                    group = %group.name(),
                    method = %entry.method(),
                    "Unsupported method, skipping endpoint"
                );
                continue;
            };

            let handler = entry.handler().clone();
            let route = move |request: Request| {
                let handler = handler.clone();
                async move { handler(request).await }
            };

            let methods = paths.remove(&path).unwrap_or_else(MethodRouter::new);
            paths.insert(path, methods.on(filter, route));
        }
    }

    // Known capture conflicts are skipped above. Anything else axum rejects
    // panics here; the default panic hook still reports it on stderr.
    panic::catch_unwind(AssertUnwindSafe(move || {
        paths
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods))
            .fallback(not_found)
    }))
    .map_err(|cause| {
        cause
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| cause.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "route table construction panicked".to_string())
    })
}

/// Two distinct paths that share every segment up to a position where both
/// hold a named capture with different names, e.g. `/x/{a}` and `/x/{b}`.
fn conflicting_captures(a: &str, b: &str) -> bool {
    for (x, y) in a.split('/').zip(b.split('/')) {
        if x != y {
            return is_named_capture(x) && is_named_capture(y);
        }
    }
    false
}

fn is_named_capture(segment: &str) -> bool {
    segment.starts_with('{') && !segment.starts_with("{*")
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {method} {}", uri.path()))
}

/// Atomically swappable route table.
#[derive(Clone)]
pub struct RouteTable {
    prefix: Arc<str>,
    current: Arc<ArcSwap<Router>>,
}

impl RouteTable {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: Arc::from(prefix),
            current: Arc::new(ArcSwap::from_pointee(Router::new().fallback(not_found))),
        }
    }

    /// Replace the table with one built from `groups`. On failure the
    /// previous table stays in place.
    pub fn rebuild(&self, groups: &[GroupDescriptor]) -> bool {
        match build_router(&self.prefix, groups) {
            Ok(router) => {
                self.current.store(Arc::new(router));
                tracing::debug!(groups = groups.len(), "Route table rebuilt");
                true
            }
            Err(error) => {
                tracing::error!(error = %error, "Route table rebuild failed, keeping previous table");
                false
            }
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let router = Router::clone(&self.current.load());
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

/// Fallback handler of the outer admin router.
pub async fn dispatch(State(routes): State<RouteTable>, request: Request) -> Response {
    routes.dispatch(request).await
}
