//! Binary attachment transfer.
//!
//! Attachments bypass XML entirely: raw bytes in, raw bytes out. Error
//! statuses are not classified beyond the bare HTTP error, and 401 still
//! short-circuits in `fetch`.

use crate::WorktrackClient;
use crate::api::protocol::Body;
use crate::error::Error;

impl WorktrackClient {
    /// Downloads an attachment's raw bytes.
    pub async fn get_attachment_blob(&self, attachment_id: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .fetch(&format!("attachment.v1/{attachment_id}"), None, None)
            .await?;
        if !response.is_success() {
            return Err(Error::Http {
                status: response.status,
                message: response.text(),
            });
        }
        Ok(response.body)
    }

    /// Uploads an attachment's raw bytes, returning the server's response
    /// body unchanged.
    pub async fn set_attachment_blob(
        &self,
        attachment_id: &str,
        blob: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let response = self
            .fetch(
                &format!("attachment.v1/{attachment_id}"),
                None,
                Some(Body::Raw(blob)),
            )
            .await?;
        if !response.is_success() {
            return Err(Error::Http {
                status: response.status,
                message: response.text(),
            });
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use crate::api::testing::mock_client;
    use crate::error::Error;
    use crate::transport::WireResponse;

    #[tokio::test]
    async fn test_blob_round_trips_raw_bytes() {
        let payload = vec![0u8, 159, 146, 150];
        let (client, transport) = mock_client(&[WireResponse::new(200, payload.clone())]);

        let body = client.get_attachment_blob("42").await.unwrap();
        assert_eq!(body, payload);
        assert!(transport.requests()[0].url.ends_with("/Instance/attachment.v1/42"));
    }

    #[tokio::test]
    async fn test_store_posts_bytes_unchanged() {
        let payload = vec![1u8, 2, 3];
        let (client, transport) = mock_client(&[WireResponse::new(200, "")]);
        client.set_attachment_blob("42", payload.clone()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].body.as_deref(), Some(payload.as_slice()));
    }

    #[tokio::test]
    async fn test_errors_propagate_without_classification() {
        let (client, _transport) = mock_client(&[WireResponse::new(404, "missing")]);
        let result = client.get_attachment_blob("42").await;
        assert!(matches!(result, Err(Error::Http { status: 404, .. })));
    }
}
