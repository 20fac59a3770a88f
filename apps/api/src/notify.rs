//! Push notifications sent when a long-running job finishes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const ONESIGNAL_API_URL: &str = "https://onesignal.com/api/v1/notifications";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OneSignal rejected notification (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub user_id: String,
    pub heading: String,
    pub body: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: PushMessage) -> Result<(), NotifyError>;
}

/// Used when OneSignal is not configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, message: PushMessage) -> Result<(), NotifyError> {
        debug!(user_id = %message.user_id, "Push notifications disabled, dropping '{}'", message.heading);
        Ok(())
    }
}

#[derive(Serialize)]
struct OneSignalRequest<'a> {
    app_id: &'a str,
    include_external_user_ids: [&'a str; 1],
    headings: LocalizedText<'a>,
    contents: LocalizedText<'a>,
    url: &'a str,
}

#[derive(Serialize)]
struct LocalizedText<'a> {
    en: &'a str,
}

pub struct OneSignalNotifier {
    client: Client,
    app_id: String,
    rest_api_key: String,
    default_url: String,
}

impl OneSignalNotifier {
    pub fn new(app_id: String, rest_api_key: String, default_url: String) -> Self {
        Self {
            client: Client::new(),
            app_id,
            rest_api_key,
            default_url,
        }
    }
}

#[async_trait]
impl Notifier for OneSignalNotifier {
    async fn send(&self, message: PushMessage) -> Result<(), NotifyError> {
        let body = OneSignalRequest {
            app_id: &self.app_id,
            include_external_user_ids: [&message.user_id],
            headings: LocalizedText {
                en: &message.heading,
            },
            contents: LocalizedText { en: &message.body },
            url: message.url.as_deref().unwrap_or(&self.default_url),
        };

        let response = self
            .client
            .post(ONESIGNAL_API_URL)
            .header("Authorization", format!("Basic {}", self.rest_api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(user_id = %message.user_id, "Push notification sent");
        Ok(())
    }
}

#[cfg(test)]
pub mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Records every message; with `fail` set, each send is rejected after recording.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<PushMessage>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: PushMessage) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(message);
            if self.fail {
                return Err(NotifyError::Rejected {
                    status: 400,
                    body: "invalid app id".to_string(),
                });
            }
            Ok(())
        }
    }
}
