//! Error types

/// Errors surfaced by the protocol client and the query engine.
///
/// All classification of HTTP statuses happens in the protocol layer; the
/// query builder passes these through to its caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP 401. Always fatal, never converted, never retried.
    #[error("authentication failed (HTTP 401): {body}")]
    AuthenticationFailed {
        /// Raw response body, if the server sent one.
        body: String,
    },

    /// HTTP 404 while addressing an asset.
    #[error("asset not found (HTTP {status}): {message}")]
    AssetNotFound {
        /// Original HTTP status code.
        status: u16,
        /// Raw response body.
        message: String,
    },

    /// Application-level protocol error. For HTTP 400 the message carries
    /// the raw server response body verbatim, which usually contains a
    /// human-readable diagnostic.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description, including the server body where available.
        message: String,
    },

    /// Unclassified HTTP status error, body included as received. Used for
    /// 5xx responses without a parseable XML body and for raw attachment
    /// transfers.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        message: String,
    },

    /// Network error during a request.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid instance URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse an XML response body.
    #[error("XML parse error: {message}")]
    Xml {
        /// Description of the parse failure.
        message: String,
        /// Raw body that failed to parse, if available.
        body: Option<String>,
    },

    /// Failed to decode a JSON response body.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A query that was required to match something matched nothing.
    #[error("query for {asset_type} returned no results")]
    NoResults {
        /// Asset type the query was bound to.
        asset_type: String,
    },

    /// Malformed `<TypeName>:<numericId>` object identifier.
    #[error("invalid oid: {0}")]
    InvalidOid(String),
}

impl Error {
    /// Creates an XML parse error carrying the offending body.
    pub(crate) fn xml(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the HTTP status code behind this error, if there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { .. } => Some(401),
            Self::AssetNotFound { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
