//! HTTP transport seam.
//!
//! The protocol layer builds [`WireRequest`]s and hands them to a
//! [`Transport`]. The default implementation wraps [`reqwest::Client`];
//! tests inject their own implementation to observe request shapes and
//! replay canned bodies without a server.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::error::Error;

/// One outgoing HTTP request as seen by the protocol layer.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully built URL, query string included.
    pub url: String,
    /// Headers, credential already applied.
    pub headers: HeaderMap,
    /// Request body, already encoded.
    pub body: Option<Vec<u8>>,
}

/// Status and body of a completed exchange.
///
/// A response is produced for every status code; classifying error statuses
/// is the protocol layer's job, not the transport's.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Creates a response from a status and a textual body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body decoded as text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for sending HTTP requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response regardless of status.
    ///
    /// Only transport-level failures (connect, TLS, read) are errors here.
    async fn send(&self, request: WireRequest) -> Result<WireResponse, Error>;
}

/// [`Transport`] backed by [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport. Certificate verification is fixed here and never
    /// changes for the lifetime of the connection.
    pub fn new(verify_certificates: bool) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_certificates)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, Error> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(WireResponse { status, body })
    }
}
