use async_trait::async_trait;

use crate::error::GatewayError;
use crate::message::PushMessage;

/// FCM's cap on tokens per multicast call.
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// One message fanned out to up to [`MAX_MULTICAST_TOKENS`] device tokens.
#[derive(Debug, Clone)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// One message sent to a named topic.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic: String,
    pub message: PushMessage,
}

/// Per-token results of a multicast, in the same order as the tokens.
///
/// `Ok` carries the FCM message name.
#[derive(Debug, Default)]
pub struct BatchResponse {
    pub responses: Vec<Result<String, GatewayError>>,
}

impl BatchResponse {
    pub fn success_count(&self) -> u32 {
        self.responses.iter().filter(|r| r.is_ok()).count() as u32
    }

    pub fn failure_count(&self) -> u32 {
        self.responses.iter().filter(|r| r.is_err()).count() as u32
    }
}

/// Outbound push gateway.
///
/// `send_multicast` fails as a whole only when no per-token attempt could be
/// made (bad request shape, credentials); otherwise every token gets a result.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, GatewayError>;

    /// Returns the FCM message name on success.
    async fn send_to_topic(&self, message: &TopicMessage) -> Result<String, GatewayError>;
}
