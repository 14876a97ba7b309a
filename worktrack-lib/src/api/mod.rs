//! Protocol operations

mod assets;
mod attachment;
mod protocol;
pub mod query;

pub use protocol::Body;
pub use protocol::QueryParams;

#[cfg(test)]
pub(crate) mod testing {
    //! Mock transport shared by the network-path tests.

    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::WorktrackClient;
    use crate::auth::Credential;
    use crate::error::Error;
    use crate::transport::Transport;
    use crate::transport::WireRequest;
    use crate::transport::WireResponse;

    /// Records every request and replays canned responses in order. Once
    /// the canned responses run out, answers `200 <Assets/>`.
    pub(crate) struct MockTransport {
        requests: Mutex<Vec<WireRequest>>,
        responses: Mutex<VecDeque<WireResponse>>,
    }

    impl MockTransport {
        pub(crate) fn new(responses: &[WireResponse]) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.iter().cloned().collect()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<WireRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: WireRequest) -> Result<WireResponse, Error> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| WireResponse::new(200, "<Assets/>")))
        }
    }

    pub(crate) fn mock_client(responses: &[WireResponse]) -> (WorktrackClient, Arc<MockTransport>) {
        mock_client_with(Credential::Anonymous, responses)
    }

    pub(crate) fn mock_client_with(
        credential: Credential,
        responses: &[WireResponse],
    ) -> (WorktrackClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(responses));
        let client = WorktrackClient::builder()
            .url("https://track.example.com/Instance")
            .credential(credential)
            .transport(transport.clone())
            .build()
            .unwrap();
        (client, transport)
    }
}
