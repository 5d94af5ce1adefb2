//! Scripted [`Transport`] for tests of code built on [`PortalClient`].
//!
//! [`PortalClient`]: crate::PortalClient

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Method, PortalRequest, PortalResponse, Transport, TransportError};

struct Route {
    method: Method,
    url_fragment: String,
    response: Result<PortalResponse, TransportError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub username: String,
    pub body: Option<String>,
}

/// Answers each request with the route whose URL fragment is the longest
/// match, or a 404 when none matches.
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, url_fragment: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            url_fragment: url_fragment.to_string(),
            response: Ok(PortalResponse::new(status, body)),
        });
        self
    }

    pub fn fail(mut self, method: Method, url_fragment: &str, error: TransportError) -> Self {
        self.routes.push(Route {
            method,
            url_fragment: url_fragment.to_string(),
            response: Err(error),
        });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: PortalRequest<'_>) -> Result<PortalResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method: request.method,
                url: request.url.clone(),
                username: request.credentials.username.clone(),
                body: request.body.clone(),
            });
        }

        self.routes
            .iter()
            .filter(|route| route.method == request.method && request.url.contains(&route.url_fragment))
            .max_by_key(|route| route.url_fragment.len())
            .map(|route| route.response.clone())
            .unwrap_or_else(|| Ok(PortalResponse::new(404, "Not Found")))
    }
}
