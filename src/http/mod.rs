//! HTTP plumbing shared by the admin API.
//!
//! # Data Flow
//! ```text
//! incoming request
//!     → request.rs (assign / propagate x-request-id)
//!     → admin route table
//!     → response.rs (handler errors → status + JSON body)
//! ```

pub mod request;
pub mod response;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorBody};
