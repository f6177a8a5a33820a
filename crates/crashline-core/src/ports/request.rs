//! Inbound request port
//!
//! Reports raised while serving a request can carry that request as
//! context. The reporter only reads the method, the target URL and the
//! remote address; query parameters are derived from the URL. Headers,
//! bodies and cookies are never read.

use serde::{Deserialize, Serialize};

/// Read-only view of an inbound request
pub trait IRequest: Send + Sync {
    /// HTTP method, e.g. `GET`
    fn method(&self) -> &str;

    /// Target URL as received, absolute (`http://host/path?q`) or
    /// origin-form (`/path?q`)
    fn url(&self) -> &str;

    /// Remote peer address, if known
    fn remote_addr(&self) -> Option<&str> {
        None
    }
}

/// Plain owned request description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    pub remote_addr: Option<String>,
}

impl RequestInfo {
    /// Creates a request description without a remote address
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            remote_addr: None,
        }
    }

    /// Sets the remote address
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

impl IRequest for RequestInfo {
    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}
