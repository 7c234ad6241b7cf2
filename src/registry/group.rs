//! Group and endpoint descriptors.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::registry::RegistryError;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Type-erased endpoint handler. The registry never calls it.
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Wrap an async function as a [`Handler`].
pub fn handler<F, Fut, R>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request| {
        let fut = f(request);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// A single administrative endpoint.
#[derive(Clone)]
pub struct EndpointDescriptor {
    path: String,
    method: Method,
    handler: Handler,
}

impl EndpointDescriptor {
    /// Create an endpoint. `path` is relative to the admin API prefix and
    /// must start with `/`; `{name}` and a trailing `{*rest}` capture are
    /// allowed as whole segments.
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Result<Self, RegistryError> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self {
            path,
            method,
            handler,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl Serialize for EndpointDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EndpointDescriptor", 2)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("method", self.method.as_str())?;
        state.end()
    }
}

/// A named bundle of endpoints, registered and unregistered as a unit.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDescriptor {
    #[serde(rename = "group")]
    name: String,
    entries: Vec<EndpointDescriptor>,
}

impl GroupDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an endpoint, keeping insertion order.
    pub fn with_entry(mut self, entry: EndpointDescriptor) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[EndpointDescriptor] {
        &self.entries
    }
}

fn validate_path(path: &str) -> Result<(), RegistryError> {
    let invalid = |reason: &'static str| RegistryError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let Some(rest) = path.strip_prefix('/') else {
        return Err(invalid("must start with '/'"));
    };

    let segments: Vec<&str> = rest.split('/').collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(invalid("use {name} captures"));
        }
        if !segment.contains(['{', '}']) {
            continue;
        }

        let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            return Err(invalid("captures must span a whole segment"));
        };
        let name = match name.strip_prefix('*') {
            Some(_) if i != last => return Err(invalid("wildcard must be the last segment")),
            Some(wildcard) => wildcard,
            None => name,
        };
        if name.is_empty() || name.contains(['{', '}', '*']) {
            return Err(invalid("malformed capture"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        handler(|_req| async {})
    }

    #[test]
    fn test_accepts_plain_and_captured_paths() {
        for path in ["/", "/healthz", "/objects/{name}", "/files/{*rest}"] {
            assert!(
                EndpointDescriptor::new(Method::GET, path, noop()).is_ok(),
                "{path} should be accepted"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for path in [
            "",
            "healthz",
            "/objects/:name",
            "/objects/{}",
            "/objects/x{name}",
            "/files/{*rest}/tail",
            "/objects/{name",
        ] {
            let err = EndpointDescriptor::new(Method::GET, path, noop()).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidPath { .. }), "{path}");
        }
    }

    #[test]
    fn test_group_serializes_name_then_entries() {
        let group = GroupDescriptor::new("admin")
            .with_entry(EndpointDescriptor::new(Method::GET, "/healthz", noop()).unwrap())
            .with_entry(EndpointDescriptor::new(Method::DELETE, "/objects", noop()).unwrap());

        let yaml = serde_yaml::to_string(&group).unwrap();
        assert_eq!(
            yaml,
            "group: admin\nentries:\n- path: /healthz\n  method: GET\n- path: /objects\n  method: DELETE\n"
        );
    }
}
