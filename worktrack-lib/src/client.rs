//! Main WorktrackClient

use std::sync::Arc;

use url::Url;

use crate::api::query::Query;
use crate::auth::Credential;
use crate::error::Error;
use crate::transport::ReqwestTransport;
use crate::transport::Transport;

/// How the `sel` parameter is rendered when no fields were selected.
///
/// The server's behavior differs between an empty `sel=` (asset stubs with
/// identifiers only) and an omitted parameter (the server's default field
/// set), so the choice is configuration rather than a guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptySelection {
    /// Send `sel=` with an empty value.
    #[default]
    SendEmpty,
    /// Omit the parameter entirely.
    Omit,
}

/// The main client for the asset-tracking REST API.
///
/// Represents one realized endpoint: scheme, host, instance path, and the
/// attached credential. Immutable after construction and cheap to clone
/// (uses `Arc` internally), so it can be shared by any number of queries.
///
/// # Example
///
/// ```ignore
/// use worktrack_lib::{WorktrackClient, auth::Credential};
///
/// let client = WorktrackClient::builder()
///     .url("https://track.example.com/MyInstance")
///     .credential(Credential::bearer("my-token"))
///     .build()?;
///
/// let mut stories = client.query("Story").select(&["Name"]);
/// for asset in stories.assets().await? {
///     println!("{:?}", asset.attribute("Name"));
/// }
/// ```
#[derive(Clone)]
pub struct WorktrackClient {
    pub(crate) inner: Arc<WorktrackClientInner>,
}

pub(crate) struct WorktrackClientInner {
    pub(crate) instance_url: Url,
    pub(crate) credential: Credential,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) empty_selection: EmptySelection,
}

impl WorktrackClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> WorktrackClientBuilder<Missing> {
        WorktrackClientBuilder::new()
    }

    /// Creates a deferred query bound to the given asset type.
    pub fn query(&self, asset_type: impl Into<String>) -> Query {
        Query::new(self.clone(), asset_type)
    }

    /// The instance URL this client talks to.
    pub fn instance_url(&self) -> &Url {
        &self.inner.instance_url
    }

    /// The configured empty-selection policy.
    pub fn empty_selection(&self) -> EmptySelection {
        self.inner.empty_selection
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`WorktrackClient`].
///
/// Uses the typestate pattern so the required instance URL must be set
/// before `build` becomes available.
///
/// # Example
///
/// ```ignore
/// let client = WorktrackClient::builder()
///     .url("https://track.example.com/MyInstance")
///     .credential(Credential::basic("admin", "admin"))
///     .verify_certificates(false)
///     .build()?;
/// ```
pub struct WorktrackClientBuilder<U> {
    url: U,
    credential: Credential,
    verify_certificates: bool,
    empty_selection: EmptySelection,
    transport: Option<Arc<dyn Transport>>,
}

impl WorktrackClientBuilder<Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            credential: Credential::Anonymous,
            verify_certificates: true,
            empty_selection: EmptySelection::default(),
            transport: None,
        }
    }
}

impl Default for WorktrackClientBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl WorktrackClientBuilder<Missing> {
    /// Sets the instance URL, e.g. `https://track.example.com/MyInstance`.
    ///
    /// The path component is the instance prefix under which all API
    /// segments (`rest-1.v1`, `meta.v1`, `attachment.v1`) live.
    pub fn url(self, url: impl Into<String>) -> WorktrackClientBuilder<Set<String>> {
        WorktrackClientBuilder {
            url: Set(url.into()),
            credential: self.credential,
            verify_certificates: self.verify_certificates,
            empty_selection: self.empty_selection,
            transport: self.transport,
        }
    }
}

impl<U> WorktrackClientBuilder<U> {
    /// Sets the credential attached to every request.
    ///
    /// Defaults to [`Credential::Anonymous`].
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Enables or disables TLS certificate verification.
    ///
    /// Fixed at construction; defaults to `true`.
    pub fn verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    /// Sets the empty-selection policy for queries without selected fields.
    pub fn empty_selection(mut self, policy: EmptySelection) -> Self {
        self.empty_selection = policy;
        self
    }

    /// Replaces the HTTP transport.
    ///
    /// If not set, a [`ReqwestTransport`] is built with the configured
    /// certificate policy.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl WorktrackClientBuilder<Set<String>> {
    /// Builds the [`WorktrackClient`].
    ///
    /// Only available once the instance URL has been set.
    pub fn build(self) -> Result<WorktrackClient, Error> {
        let raw = self.url.0;
        let instance_url =
            Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
        if !instance_url.has_host() {
            return Err(Error::InvalidUrl(format!("{raw}: missing host")));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.verify_certificates)?),
        };

        Ok(WorktrackClient {
            inner: Arc::new(WorktrackClientInner {
                instance_url,
                credential: self.credential,
                transport,
                empty_selection: self.empty_selection,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parses_instance_url() {
        let client = WorktrackClient::builder()
            .url("https://track.example.com/MyInstance")
            .build()
            .unwrap();
        assert_eq!(client.instance_url().host_str(), Some("track.example.com"));
        assert_eq!(client.instance_url().path(), "/MyInstance");
        assert_eq!(client.empty_selection(), EmptySelection::SendEmpty);
    }

    #[test]
    fn test_build_rejects_bad_url() {
        let result = WorktrackClient::builder().url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
