use std::sync::Weak;

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, Utc};

use crate::http::ApiError;
use crate::lifecycle::LifecycleHandle;
use crate::registry::{handler, EndpointDescriptor, GroupDescriptor, Registry, RegistryError};

/// Group the admin server registers for itself.
pub const ADMIN_GROUP: &str = "admin";

/// Content type of the listing document.
pub const YAML_CONTENT_TYPE: &str = "text/vnd.yaml";

const COPYRIGHT_SINCE: i32 = 2024;

/// Build the `admin` group: listing, liveness and about.
///
/// Handlers hold a weak reference so the registry does not own itself
/// through its own entries.
pub fn admin_group(
    registry: Weak<Registry>,
    lifecycle: LifecycleHandle,
) -> Result<GroupDescriptor, RegistryError> {
    let list = EndpointDescriptor::new(
        Method::GET,
        "/",
        handler(move |_req| {
            let registry = registry.clone();
            async move {
                match registry.upgrade() {
                    Some(registry) => list_apis(&registry),
                    None => ApiError::ServiceUnavailable("registry is gone".into()).into_response(),
                }
            }
        }),
    )?;

    let health = EndpointDescriptor::new(
        Method::GET,
        "/healthz",
        handler(move |_req| {
            let status = healthz(&lifecycle);
            async move { status }
        }),
    )?;

    let about = EndpointDescriptor::new(Method::GET, "/about", handler(|_req| about()))?;

    Ok(GroupDescriptor::new(ADMIN_GROUP)
        .with_entry(list)
        .with_entry(health)
        .with_entry(about))
}

/// Sorted registry snapshot as YAML.
pub fn list_apis(registry: &Registry) -> Response {
    render_listing(&registry.list()).into_response()
}

fn render_listing(groups: &[GroupDescriptor]) -> Result<Response, ApiError> {
    let body = serde_yaml::to_string(groups)
        .map_err(|e| ApiError::Internal(format!("marshal api groups to yaml failed: {e}")))?;
    Ok(([(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], body).into_response())
}

/// 200 with an empty body until the coordinator starts stopping.
pub fn healthz(lifecycle: &LifecycleHandle) -> StatusCode {
    if lifecycle.state().is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn about_text(year: i32) -> String {
    format!(
        "{name} {version}\n\
         Copyright © {COPYRIGHT_SINCE} - {year} The {name} Authors. All rights reserved.\n\
         Licensed under the {license} license.\n",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        license = env!("CARGO_PKG_LICENSE"),
    )
}

pub async fn about() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        about_text(Utc::now().year()),
    )
}
