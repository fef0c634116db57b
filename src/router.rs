//! Request router
//!
//! Classifies an inbound request by field presence and forwards it,
//! unmodified, to the host or user handler. The router keeps no state and
//! does no validation beyond classification.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::IssuerError;
use crate::handler::{
    HostRequestHandler, InvocationOptions, IssuerServices, RequestHandler, UserRequestHandler,
};
use crate::request::{InboundRequest, RequestKind};
use crate::response::Response;

pub struct RequestRouter {
    host: Arc<dyn RequestHandler>,
    user: Arc<dyn RequestHandler>,
}

impl RequestRouter {
    pub fn new(host: Arc<dyn RequestHandler>, user: Arc<dyn RequestHandler>) -> Self {
        Self { host, user }
    }

    /// Router wired to the standard host and user handlers.
    pub fn from_services(services: Arc<IssuerServices>) -> Self {
        Self::new(
            Arc::new(HostRequestHandler::new(Arc::clone(&services))),
            Arc::new(UserRequestHandler::new(services)),
        )
    }

    pub async fn handle(&self, request: InboundRequest, invocation: &InvocationOptions) -> Response {
        let kind = request.kind();
        debug!(?kind, "Routing request");

        match kind {
            RequestKind::Host => self.host.handle(request, invocation).await,
            RequestKind::User => self.user.handle(request, invocation).await,
        }
    }

    /// Deserialize a raw event, then route it.
    pub async fn handle_json(&self, event: JsonValue, invocation: &InvocationOptions) -> Response {
        match serde_json::from_value::<InboundRequest>(event) {
            Ok(request) => self.handle(request, invocation).await,
            Err(e) => IssuerError::Classification(format!("malformed request: {e}")).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<InboundRequest>>,
    }

    #[async_trait]
    impl RequestHandler for RecordingHandler {
        async fn handle(&self, request: InboundRequest, _: &InvocationOptions) -> Response {
            self.seen.lock().unwrap().push(request);
            Response::success_in_region("cert", None, None)
        }
    }

    fn router() -> (RequestRouter, Arc<RecordingHandler>, Arc<RecordingHandler>) {
        let host = Arc::new(RecordingHandler::default());
        let user = Arc::new(RecordingHandler::default());
        (RequestRouter::new(host.clone(), user.clone()), host, user)
    }

    #[tokio::test]
    async fn test_host_request_routed_to_host_handler() {
        let (router, host, user) = router();
        let event = json!({
            "hostnames": "host.example.com",
            "publicKeyToSign": "ssh-rsa AAAA",
        });

        router.handle_json(event, &InvocationOptions::default()).await;

        assert_eq!(host.seen.lock().unwrap().len(), 1);
        assert!(user.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_request_routed_to_user_handler() {
        let (router, host, user) = router();
        let event = json!({
            "remoteUsernames": "user",
            "publicKeyToSign": "ssh-rsa AAAA",
            "bastionUser": "user",
        });

        router.handle_json(event, &InvocationOptions::default()).await;

        assert!(host.seen.lock().unwrap().is_empty());
        assert_eq!(user.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_forwarded_unmodified() {
        let (router, host, _) = router();
        let request = InboundRequest {
            hostnames: Some("a.example.com,b.example.com".to_string()),
            remote_usernames: Some("root".to_string()),
            bastion_user: None,
            public_key_to_sign: "ssh-rsa AAAA".to_string(),
        };

        router.handle(request.clone(), &InvocationOptions::default()).await;

        assert_eq!(host.seen.lock().unwrap()[0], request);
    }

    #[tokio::test]
    async fn test_shapeless_request_goes_to_user_handler() {
        let (router, _, user) = router();
        router
            .handle_json(json!({ "publicKeyToSign": "ssh-rsa AAAA" }), &InvocationOptions::default())
            .await;
        assert_eq!(user.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_object_event_is_classification_error() {
        let (router, host, user) = router();
        let response = router
            .handle_json(json!("not a request"), &InvocationOptions::default())
            .await;

        assert_eq!(response.error_type(), Some("ClassificationError"));
        assert!(host.seen.lock().unwrap().is_empty());
        assert!(user.seen.lock().unwrap().is_empty());
    }
}
