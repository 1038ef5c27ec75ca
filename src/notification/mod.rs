use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::types::RequestStatus;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Push provider responded with {0}")]
    Rejected(reqwest::StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushData {
    pub kind: String,
    pub id: Uuid,
    pub status: RequestStatus,
}

/// Expo push message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub sound: &'static str,
    pub data: PushData,
}

impl PushMessage {
    pub fn new(to: impl Into<String>, title: impl Into<String>, body: impl Into<String>, data: PushData) -> Self {
        Self {
            to: to.into(),
            title: title.into(),
            body: body.into(),
            sound: "default",
            data,
        }
    }
}

/// Outbound push channel for status changes
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), NotificationError>;
}

/// Posts messages to the Expo push endpoint
pub struct ExpoNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl ExpoNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Notifier for ExpoNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected(status));
        }
        debug!("Push notification accepted for {} {}", message.data.kind, message.data.id);
        Ok(())
    }
}

/// Used when notifications are disabled in configuration
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), NotificationError> {
        debug!(
            "Notifications disabled, dropping message for {} {}",
            message.data.kind, message.data.id
        );
        Ok(())
    }
}
