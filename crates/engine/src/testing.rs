//! In-memory store and gateway used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use donorlink_common::error::AppError;
use donorlink_common::types::{
    BLOOD_REQUEST_RESPONSE, DeliveryStatusUpdate, NotificationRecord, UserRecord,
};
use donorlink_notifier::{
    BatchResponse, ErrorCode, GatewayError, MulticastMessage, PushGateway, TopicMessage,
};

use crate::store::NotificationStore;

pub(crate) fn record(id: &str, user_id: &str) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        seq: 1,
        kind: BLOOD_REQUEST_RESPONSE.to_string(),
        user_id: user_id.to_string(),
        title: None,
        body: None,
        responder_name: Some("Ravi".to_string()),
        responder_phone: Some("+15550100".to_string()),
        blood_type: Some("O+".to_string()),
        responder_id: Some("responder-9".to_string()),
        request_id: Some("req-1".to_string()),
        created_at: Utc::now(),
    }
}

pub(crate) fn user(id: &str, tokens: &[&str]) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        notifications_enabled: None,
        device_tokens: tokens.iter().map(|t| t.to_string()).collect(),
        last_token_update: None,
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    users: Mutex<HashMap<String, UserRecord>>,
    statuses: Mutex<Vec<(String, DeliveryStatusUpdate)>>,
    removals: Mutex<Vec<(String, String)>>,
    user_reads: AtomicUsize,
    status_attempts: AtomicUsize,
    fail_user_reads: AtomicBool,
    fail_status_writes: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn insert_user(&self, user: UserRecord) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub(crate) fn user(&self, id: &str) -> Option<UserRecord> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn fail_user_reads(&self) {
        self.fail_user_reads.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_status_writes(&self) {
        self.fail_status_writes.store(true, Ordering::SeqCst);
    }

    /// Successful status writes, in order.
    pub(crate) fn status_writes(&self) -> Vec<(String, DeliveryStatusUpdate)> {
        self.statuses.lock().unwrap().clone()
    }

    pub(crate) fn status_write_attempts(&self) -> usize {
        self.status_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn token_removals(&self) -> Vec<(String, String)> {
        self.removals.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_user_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "users table unavailable".to_string(),
            )));
        }
        Ok(self.user(user_id))
    }

    async fn write_delivery_status(
        &self,
        notification_id: &str,
        update: &DeliveryStatusUpdate,
    ) -> Result<(), AppError> {
        self.status_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "notifications table unavailable".to_string(),
            )));
        }
        self.statuses
            .lock()
            .unwrap()
            .push((notification_id.to_string(), update.clone()));
        Ok(())
    }

    async fn remove_device_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(user_id) else {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        };
        user.device_tokens.retain(|t| t != token);
        user.last_token_update = Some(Utc::now());
        self.removals
            .lock()
            .unwrap()
            .push((user_id.to_string(), token.to_string()));
        Ok(())
    }
}

/// Gateway that succeeds unless told otherwise.
#[derive(Default)]
pub(crate) struct FakeGateway {
    token_failures: Mutex<HashMap<String, ErrorCode>>,
    /// Keyed by zero-based multicast call index
    batch_failures: Mutex<HashMap<usize, GatewayError>>,
    topic_failure: Mutex<Option<GatewayError>>,
    multicasts: Mutex<Vec<usize>>,
    topics: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub(crate) fn fail_token(&self, token: &str, code: ErrorCode) {
        self.token_failures
            .lock()
            .unwrap()
            .insert(token.to_string(), code);
    }

    pub(crate) fn fail_batch(&self, call_index: usize, error: GatewayError) {
        self.batch_failures
            .lock()
            .unwrap()
            .insert(call_index, error);
    }

    pub(crate) fn fail_topic(&self, error: GatewayError) {
        *self.topic_failure.lock().unwrap() = Some(error);
    }

    /// Token count of every multicast call, including failed ones.
    pub(crate) fn multicast_sizes(&self) -> Vec<usize> {
        self.multicasts.lock().unwrap().clone()
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for FakeGateway {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, GatewayError> {
        let call_index = {
            let mut calls = self.multicasts.lock().unwrap();
            calls.push(message.tokens.len());
            calls.len() - 1
        };

        if let Some(error) = self.batch_failures.lock().unwrap().remove(&call_index) {
            return Err(error);
        }

        let failures = self.token_failures.lock().unwrap();
        let responses = message
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match failures.get(token) {
                Some(code) => Err(GatewayError::rejected(*code, format!("{} for token", code))),
                None => Ok(format!("projects/test/messages/{}-{}", call_index, i)),
            })
            .collect();

        Ok(BatchResponse { responses })
    }

    async fn send_to_topic(&self, message: &TopicMessage) -> Result<String, GatewayError> {
        self.topics.lock().unwrap().push(message.topic.clone());
        match self.topic_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok("projects/test/messages/topic".to_string()),
        }
    }
}
