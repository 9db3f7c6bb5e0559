//! Push delivery through Firebase Cloud Messaging.
//!
//! The dispatcher only sees the [`PushGateway`] trait; [`fcm::FcmGateway`]
//! is the production implementation speaking the FCM HTTP v1 API.

pub mod auth;
pub mod error;
pub mod fcm;
pub mod gateway;
pub mod message;

pub use error::{ErrorCode, GatewayError};
pub use gateway::{BatchResponse, MAX_MULTICAST_TOKENS, MulticastMessage, PushGateway, TopicMessage};
