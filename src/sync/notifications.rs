use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use uuid::Uuid;

use super::backend::Backend;
use super::error::SyncError;
use crate::models::ANONYMOUS_USER;
use crate::relay::TriggerDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// Recipient; defaults to the signed-in identity.
    pub user_id: Option<String>,
}

impl NotificationDraft {
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            user_id: None,
        }
    }
}

/// A notification as shown in the local notification list.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    /// Relay failure, if delivery did not go through.
    pub error: Option<String>,
}

/// Sends notifications through the notification relay and keeps the local
/// list. A notification is listed even when the relay call fails.
pub struct NotificationCenter {
    backend: Arc<dyn Backend>,
    list: watch::Sender<Vec<LocalNotification>>,
}

impl NotificationCenter {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (list, _) = watch::channel(Vec::new());
        Self { backend, list }
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<LocalNotification> {
        self.list.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<LocalNotification>> {
        self.list.subscribe()
    }

    pub fn unread_count(&self) -> usize {
        self.list.borrow().iter().filter(|n| !n.read).count()
    }

    pub fn mark_read(&self, id: Uuid) {
        self.list.send_modify(|list| {
            if let Some(n) = list.iter_mut().find(|n| n.id == id) {
                n.read = true;
            }
        });
    }

    pub fn mark_all_read(&self) {
        self.list.send_modify(|list| list.iter_mut().for_each(|n| n.read = true));
    }

    pub fn clear(&self) {
        self.list.send_modify(Vec::clear);
    }

    /// Returns the relay's `data` on success. Either way the notification is
    /// added to the local list.
    pub async fn trigger_notification(&self, draft: NotificationDraft) -> Result<Value, SyncError> {
        let user_id = match draft.user_id.clone().filter(|u| !u.is_empty()) {
            Some(user_id) => user_id,
            None => self
                .backend
                .current_user()
                .await
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        };
        let request_id = Uuid::new_v4();
        let now = Utc::now();

        let body = json!({
            "title": draft.title,
            "message": draft.message,
            "type": draft.kind,
            "userId": user_id,
            "timestamp": now.to_rfc3339(),
            "requestId": request_id,
        });

        let res = self
            .backend
            .invoke(TriggerDomain::Notification.function_name(), body)
            .await;
        if let Err(e) = &res {
            tracing::warn!(error = %e, title = %draft.title, "Notification relay failed, keeping it locally");
        }

        self.push(LocalNotification {
            id: request_id,
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            created_at: now,
            read: false,
            error: res.as_ref().err().map(ToString::to_string),
        });
        res
    }

    /// Add a notification locally without going through the relay.
    pub fn push(&self, notification: LocalNotification) {
        self.list.send_modify(|list| list.insert(0, notification));
    }
}
