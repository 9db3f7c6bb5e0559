//! FCM HTTP v1 gateway.
//!
//! v1 has no multicast endpoint, so a multicast batch is one
//! `messages:send` request per token, run with bounded concurrency. Results
//! come back in token order.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::AccessTokenProvider;
use crate::error::{ErrorCode, GatewayError};
use crate::gateway::{
    BatchResponse, MAX_MULTICAST_TOKENS, MulticastMessage, PushGateway, TopicMessage,
};
use crate::message::{AddressedMessage, PushMessage, SendRequest, Target};

#[derive(Debug, Deserialize)]
struct SendResponseBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetailBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetailBody {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Settings for [`FcmGateway`].
#[derive(Debug, Clone)]
pub struct FcmOptions {
    pub project_id: String,
    /// e.g. `https://fcm.googleapis.com`
    pub base_url: String,
    /// Concurrent requests within one multicast batch
    pub concurrency: usize,
    pub request_timeout: Duration,
}

/// Push gateway backed by the FCM HTTP v1 API.
pub struct FcmGateway {
    client: reqwest::Client,
    auth: AccessTokenProvider,
    send_url: String,
    concurrency: usize,
}

impl FcmGateway {
    pub fn new(options: FcmOptions, auth: AccessTokenProvider) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self::with_client(client, options, auth))
    }

    pub fn with_client(
        client: reqwest::Client,
        options: FcmOptions,
        auth: AccessTokenProvider,
    ) -> Self {
        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            options.base_url.trim_end_matches('/'),
            options.project_id
        );

        tracing::info!(
            project_id = %options.project_id,
            concurrency = options.concurrency,
            "FCM gateway configured"
        );

        Self {
            client,
            auth,
            send_url,
            concurrency: options.concurrency.max(1),
        }
    }

    async fn send_one(
        &self,
        access_token: &str,
        message: &PushMessage,
        target: Target<'_>,
    ) -> Result<String, GatewayError> {
        let body = SendRequest {
            message: AddressedMessage { target, message },
        };

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let sent: SendResponseBody = response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            return Ok(sent.name);
        }

        let raw = response.text().await.unwrap_or_default();
        Err(parse_error(status, &raw))
    }
}

/// Turn a non-2xx FCM response into a [`GatewayError::Rejected`].
fn parse_error(status: StatusCode, raw: &str) -> GatewayError {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => {
            let body = envelope.error;
            // FCM-specific detail codes are more precise than the rpc status
            let fcm_code = body
                .details
                .iter()
                .find_map(|d| d.error_code.as_deref())
                .or(body.status.as_deref());

            let code = match fcm_code {
                Some(c) => ErrorCode::from_fcm(c, &body.message),
                None => ErrorCode::from_http_status(status.as_u16()),
            };
            GatewayError::rejected(code, body.message)
        }
        Err(_) => GatewayError::rejected(
            ErrorCode::from_http_status(status.as_u16()),
            format!("FCM returned {status}: {raw}"),
        ),
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_multicast(
        &self,
        multicast: &MulticastMessage,
    ) -> Result<BatchResponse, GatewayError> {
        if multicast.tokens.is_empty() {
            return Err(GatewayError::rejected(
                ErrorCode::InvalidArgument,
                "tokens must be a non-empty array",
            ));
        }
        if multicast.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(GatewayError::rejected(
                ErrorCode::InvalidArgument,
                format!("tokens list must not contain more than {MAX_MULTICAST_TOKENS} items"),
            ));
        }

        let access_token = self.auth.access_token().await?;

        // Built eagerly so the stream holds plain futures, not a borrowing
        // closure, which keeps the outer future `Send`.
        let sends: Vec<_> = multicast
            .tokens
            .iter()
            .map(|token| {
                self.send_one(
                    &access_token,
                    &multicast.message,
                    Target::Token(token.as_str()),
                )
            })
            .collect();

        let responses: Vec<Result<String, GatewayError>> = futures::stream::iter(sends)
            .buffered(self.concurrency)
            .collect()
            .await;

        let response = BatchResponse { responses };
        tracing::debug!(
            tokens = multicast.tokens.len(),
            success = response.success_count(),
            failure = response.failure_count(),
            "FCM multicast sent"
        );
        Ok(response)
    }

    async fn send_to_topic(&self, topic: &TopicMessage) -> Result<String, GatewayError> {
        let access_token = self.auth.access_token().await?;
        self.send_one(&access_token, &topic.message, Target::Topic(topic.topic.as_str()))
            .await
    }
}
