//! The seam between sync hooks and whatever serves functions, table reads
//! and change channels.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::SyncError;
use crate::realtime::{ChangeEvent, Table};

/// One read against one table. Ordering is fixed per table by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: Table,
    pub user_id: Option<String>,
    pub portfolio_id: Option<String>,
    pub limit: Option<i64>,
}

impl TableQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            user_id: None,
            portfolio_id: None,
            limit: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn portfolio(mut self, portfolio_id: impl Into<String>) -> Self {
        self.portfolio_id = Some(portfolio_id.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An open change channel for one table.
///
/// Closing (explicitly or by drop) stops the task feeding it, so a channel
/// never outlives its owner.
#[derive(Debug)]
pub struct Channel {
    table: Table,
    rx: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Channel {
    /// `task` is the feeder to stop on close; `None` when the sender side
    /// is owned elsewhere.
    pub fn new(table: Table, rx: mpsc::Receiver<ChangeEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { table, rx, task }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Next change on this table; `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Signed-in identity, if any.
    async fn current_user(&self) -> Option<String>;

    /// Invoke a relay function; returns the `data` of its success envelope.
    async fn invoke(&self, function: &str, body: Value) -> Result<Value, SyncError>;

    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, SyncError>;

    /// First row of `query`; "no rows" is `Ok(None)`.
    async fn select_latest(&self, query: &TableQuery) -> Result<Option<Value>, SyncError>;

    async fn subscribe(&self, table: Table) -> Result<Channel, SyncError>;
}

pub async fn select_as<T: DeserializeOwned>(
    backend: &dyn Backend,
    query: &TableQuery,
) -> Result<Vec<T>, SyncError> {
    backend
        .select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(SyncError::from))
        .collect()
}

pub async fn select_latest_as<T: DeserializeOwned>(
    backend: &dyn Backend,
    query: &TableQuery,
) -> Result<Option<T>, SyncError> {
    match backend.select_latest(query).await? {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}
