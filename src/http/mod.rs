pub mod auth;
pub mod client;
pub mod headers;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types for convenient access
pub use auth::{AuthMethod, Secret, resolve_auth};
pub use client::{Client, TransportErrorKind, TransportFailure};
pub use headers::{HeaderEntry, HeaderSet};
pub use request::{QueryParams, QueryValue, WireRequest};
pub use response::Response;
pub use types::{Method, Status};
