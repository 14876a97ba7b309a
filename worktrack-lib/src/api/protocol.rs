//! Low-level protocol plumbing: URL construction, fetch, and response
//! classification.
//!
//! This is the only layer that looks at HTTP statuses. Everything above it
//! (asset helpers, the query engine) either gets a parsed document or an
//! already classified [`Error`].

use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use tracing::debug;
use tracing::warn;

use crate::WorktrackClient;
use crate::error::Error;
use crate::transport::WireRequest;
use crate::transport::WireResponse;
use crate::xml::Element;

/// Ordered query parameters, percent-encoded deterministically on render.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, keeping insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Whether no parameters have been added.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders `key=value` pairs joined by `&`, reserved characters
    /// percent-encoded.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A POST body.
#[derive(Debug, Clone)]
pub enum Body {
    /// Form mapping, URL-encoded before transmission.
    Form(Vec<(String, String)>),
    /// Raw bytes, transmitted unchanged.
    Raw(Vec<u8>),
}

impl Body {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Form(pairs) => QueryParams(pairs).encode().into_bytes(),
            Self::Raw(bytes) => bytes,
        }
    }
}

impl WorktrackClient {
    /// Joins the instance path, a request path, and an optional query
    /// string into one well-formed URL.
    pub fn build_url(&self, path: &str, query: Option<&QueryParams>) -> String {
        let mut url = self.inner.instance_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        match query {
            Some(params) if !params.is_empty() => url.set_query(Some(&params.encode())),
            _ => url.set_query(None),
        }
        url.to_string()
    }

    /// Performs a GET, or a POST when a body is given.
    ///
    /// The response is returned for every status except 401, which is an
    /// immediate [`Error::AuthenticationFailed`]; transport failures
    /// propagate as [`Error::Network`].
    pub async fn fetch(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
    ) -> Result<WireResponse, Error> {
        let url = self.build_url(path, query);
        let (method, payload) = match body {
            None => (Method::GET, None),
            Some(body) => (Method::POST, Some(body.into_bytes())),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml;charset=UTF-8"),
        );
        if let Some(value) = self.inner.credential.authorization_header() {
            let value = HeaderValue::from_str(&value).map_err(|_| Error::Protocol {
                message: "credential contains characters not valid in a header".to_string(),
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        debug!(%url, method = %method, "request");
        let response = self
            .inner
            .transport
            .send(WireRequest {
                method,
                url,
                headers,
                body: payload,
            })
            .await?;

        if response.status == 401 {
            return Err(Error::AuthenticationFailed {
                body: response.text(),
            });
        }
        Ok(response)
    }

    /// Fetches and parses an XML document, classifying error statuses.
    pub async fn get_xml(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
    ) -> Result<Element, Error> {
        let response = self.fetch(path, query, body).await?;
        let text = response.text();
        if response.is_success() {
            return Element::parse(&text);
        }
        warn!(status = response.status, path, "error response");
        Err(classify_error(response.status, text))
    }

    /// Fetches and decodes a JSON payload, classifying error statuses the
    /// same way as [`get_xml`](Self::get_xml).
    pub async fn get_json(&self, path: &str, body: Option<Body>) -> Result<serde_json::Value, Error> {
        let response = self.fetch(path, None, body).await?;
        let text = response.text();
        if !response.is_success() {
            warn!(status = response.status, path, "error response");
            return Err(classify_error(response.status, text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Classifies a non-2xx response.
///
/// The server answers most error statuses with a machine-readable XML body;
/// a 5xx without one is surfaced as the bare HTTP error.
fn classify_error(status: u16, body: String) -> Error {
    if status >= 500 && Element::parse(&body).is_err() {
        return Error::Http {
            status,
            message: body,
        };
    }
    match status {
        404 => Error::AssetNotFound {
            status,
            message: body,
        },
        400 => Error::Protocol {
            message: format!("bad request (HTTP 400): {body}"),
        },
        _ => Error::Protocol {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::api::testing::mock_client;
    use crate::api::testing::mock_client_with;
    use crate::auth::Credential;

    #[test]
    fn test_classify_not_found() {
        let error = classify_error(404, "<Error>gone</Error>".to_string());
        assert!(matches!(error, Error::AssetNotFound { status: 404, .. }));
    }

    #[test]
    fn test_classify_bad_request_carries_body() {
        let error = classify_error(400, "<Error>Name is required</Error>".to_string());
        assert!(error.to_string().contains("<Error>Name is required</Error>"));
        assert!(matches!(error, Error::Protocol { .. }));
    }

    #[test]
    fn test_classify_server_error_without_xml_is_untouched() {
        let error = classify_error(502, "Bad Gateway".to_string());
        assert!(matches!(
            error,
            Error::Http {
                status: 502,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_server_error_with_xml_is_wrapped() {
        let error = classify_error(500, "<Error>boom</Error>".to_string());
        assert!(matches!(error, Error::Protocol { .. }));
    }

    #[test]
    fn test_classify_other_status_is_wrapped() {
        let error = classify_error(403, "<Error>denied</Error>".to_string());
        assert!(matches!(error, Error::Protocol { .. }));
    }

    #[test]
    fn test_build_url_round_trip() {
        let (client, _transport) = mock_client(&[]);
        let params: QueryParams = [("sel", "Name,Description"), ("where", "Name='x'")]
            .into_iter()
            .collect();
        let url = client.build_url("rest-1.v1/Data/Story", Some(&params));

        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/Instance/rest-1.v1/Data/Story");
        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["sel"], "Name,Description");
        assert_eq!(pairs["where"], "Name='x'");
    }

    #[test]
    fn test_build_url_without_query() {
        let (client, _transport) = mock_client(&[]);
        assert_eq!(
            client.build_url("/meta.v1/Story", None),
            "https://track.example.com/Instance/meta.v1/Story"
        );
    }

    #[tokio::test]
    async fn test_fetch_attaches_credential_and_content_type() {
        let (client, transport) = mock_client_with(
            Credential::bearer("tok"),
            &[WireResponse::new(200, "<Asset/>")],
        );
        client.fetch("rest-1.v1/Data/Story/1", None, None).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers.get(AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
        assert_eq!(
            requests[0].headers.get(CONTENT_TYPE).unwrap(),
            "text/xml;charset=UTF-8"
        );
        assert_eq!(requests[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_fetch_posts_form_bodies_url_encoded() {
        let (client, transport) = mock_client(&[WireResponse::new(200, "<Asset/>")]);
        let body = Body::Form(vec![("op".to_string(), "Quick Close".to_string())]);
        client
            .fetch("rest-1.v1/Data/Story/1", None, Some(body))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].body.as_deref(), Some(b"op=Quick%20Close".as_ref()));
    }

    #[tokio::test]
    async fn test_fetch_propagates_401_immediately() {
        let (client, _transport) = mock_client(&[WireResponse::new(401, "denied")]);
        let result = client.fetch("rest-1.v1/Data/Story", None, None).await;
        assert!(matches!(result, Err(Error::AuthenticationFailed { .. })));
    }

    #[tokio::test]
    async fn test_fetch_returns_other_error_statuses() {
        let (client, _transport) = mock_client(&[WireResponse::new(404, "<Error/>")]);
        let response = client.fetch("rest-1.v1/Data/Story", None, None).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_get_xml_classifies_not_found() {
        let (client, _transport) = mock_client(&[WireResponse::new(404, "<Error>gone</Error>")]);
        let result = client.get_xml("rest-1.v1/Data/Story/999", None, None).await;
        assert!(matches!(result, Err(Error::AssetNotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_xml_parses_success() {
        let (client, _transport) =
            mock_client(&[WireResponse::new(200, r#"<Asset id="Story:1"/>"#)]);
        let doc = client.get_xml("rest-1.v1/Data/Story/1", None, None).await.unwrap();
        assert_eq!(doc.attr("id"), Some("Story:1"));
    }

    #[tokio::test]
    async fn test_get_json_decodes_success() {
        let (client, _transport) = mock_client(&[WireResponse::new(200, r#"[[{"_oid":"Story:1"}]]"#)]);
        let value = client.get_json("rest-1.v1/query.v1", None).await.unwrap();
        assert!(value.is_array());
    }
}
