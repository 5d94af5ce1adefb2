use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};

use crate::{domain::Credentials, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// The machine identity sent along with the user's credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workstation {
    /// Host name announced during an NTLM handshake. Only NTLM transports
    /// read it; [`ReqwestTransport`] sends Basic auth and ignores it.
    pub workstation: String,
    /// Prefixed to the username as `DOMAIN\user` when not empty.
    pub domain: String,
}

impl Default for Workstation {
    fn default() -> Self {
        Self {
            workstation: "choose.something".to_string(),
            domain: String::new(),
        }
    }
}

/// One authenticated request to the portal.
#[derive(Debug, Clone)]
pub struct PortalRequest<'a> {
    pub method: Method,
    pub url: String,
    pub credentials: &'a Credentials,
    pub workstation: &'a Workstation,
    /// Form-encoded body, only sent with `POST`.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
}

impl PortalResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Authenticated HTTP capability used by [`PortalClient`](crate::PortalClient).
///
/// Any status code is a response; only failing to get one is an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PortalRequest<'_>) -> Result<PortalResponse, TransportError>;
}

/// [`Transport`] backed by reqwest.
///
/// Credentials go out with every request as `DOMAIN\user` when a domain is
/// set. Deployments that only speak the NTLM handshake need their own
/// transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("taskportal/", env!("CARGO_PKG_VERSION"))),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }
}

/// The user name as the portal expects it. `workstation.workstation` plays no
/// part outside the NTLM handshake.
fn qualified_username(credentials: &Credentials, workstation: &Workstation) -> String {
    if workstation.domain.is_empty() {
        credentials.username.clone()
    } else {
        format!("{}\\{}", workstation.domain, credentials.username)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PortalRequest<'_>) -> Result<PortalResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.body.clone().unwrap_or_default()),
        };

        let resp = builder
            .basic_auth(
                qualified_username(request.credentials, request.workstation),
                Some(request.credentials.password()),
            )
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        url: request.url.clone(),
                    }
                } else if e.is_builder() {
                    TransportError::InvalidRequest(e.to_string())
                } else {
                    TransportError::Connection {
                        url: request.url.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = resp.status().as_u16();
        tracing::debug!("{:?} {} returned status {}", request.method, request.url, status);

        let body = resp.text().await.map_err(|e| TransportError::Connection {
            url: request.url.clone(),
            message: format!("failed to read body: {}", e),
        })?;

        Ok(PortalResponse { status, body })
    }
}
