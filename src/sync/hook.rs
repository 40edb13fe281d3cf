//! Remote sync hook: trigger a relay, read the domain's tables back, and
//! re-read whenever a watched table changes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::backend::Backend;
use super::error::SyncError;
use crate::models::ANONYMOUS_USER;
use crate::realtime::Table;
use crate::relay::TriggerDomain;

/// What one dashboard surface synchronizes.
#[async_trait]
pub trait SyncDomain: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;
    type Params: Clone + Default + Send + Sync + 'static;

    const DOMAIN: TriggerDomain;
    const WATCHED: &'static [Table];

    /// Trigger once when mounted instead of only reading.
    const AUTO_TRIGGER: bool = false;

    fn trigger_body(identity: &str, params: &Self::Params) -> Value;

    /// Adjust the stored parameters once their trigger body has been built.
    /// One-shot inputs are cleared here so they are sent only once.
    fn after_trigger(_params: &mut Self::Params) {}

    /// Read the domain's current rows. "No rows" yields an empty/default
    /// value, not an error.
    async fn fetch(
        backend: &dyn Backend,
        identity: &str,
        params: &Self::Params,
    ) -> Result<Self::Data, SyncError>;

    /// Combine a fresh read with the data already shown. Replaces it by default.
    fn merge_fetched(_previous: Option<&Self::Data>, fetched: Self::Data) -> Self::Data {
        fetched
    }

    /// Data carried by the trigger response itself. `None` means the
    /// trigger is followed by a read.
    fn from_trigger_response(_response: &Value) -> Option<Result<Self::Data, SyncError>> {
        None
    }
}

/// Data plus the time it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Synced<T> {
    pub data: T,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HookState<T> {
    pub data: Option<Synced<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for HookState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Shared flag checked before any result is applied.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct HookInner<D: SyncDomain> {
    backend: Arc<dyn Backend>,
    state: watch::Sender<HookState<D::Data>>,
    params: Mutex<D::Params>,
    /// Replaced on unmount; work started earlier keeps the cancelled one.
    cancel: Mutex<CancelToken>,
    issued_reads: AtomicU64,
    applied_read: AtomicU64,
}

impl<D: SyncDomain> HookInner<D> {
    fn token(&self) -> CancelToken {
        match self.cancel.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn params(&self) -> D::Params {
        match self.params.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_params(&self, params: D::Params) {
        match self.params.lock() {
            Ok(mut guard) => *guard = params,
            Err(poisoned) => *poisoned.into_inner() = params,
        }
    }

    /// Build the trigger body from the stored parameters and let the domain
    /// drop whatever must not be sent twice.
    fn take_trigger_body(&self, identity: &str) -> Value {
        let mut guard = match self.params.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let body = D::trigger_body(identity, &guard);
        D::after_trigger(&mut guard);
        body
    }

    async fn identity(&self) -> String {
        self.backend
            .current_user()
            .await
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string())
    }

    /// Next read sequence number.
    fn begin_read(&self) -> u64 {
        self.issued_reads.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `data` unless cancelled or a newer read was applied already.
    /// Reads go through [`SyncDomain::merge_fetched`]; trigger results do not.
    /// `error` is left alone: only starting a new trigger clears it.
    fn apply(&self, seq: u64, token: &CancelToken, data: D::Data, merge: bool) -> bool {
        if token.is_cancelled() {
            return false;
        }
        let newest = self.applied_read.fetch_max(seq, Ordering::SeqCst);
        if newest > seq {
            tracing::debug!(domain = %D::DOMAIN, seq, newest, "Discarding stale read");
            return false;
        }

        self.state.send_modify(|state| {
            let data = if merge {
                D::merge_fetched(state.data.as_ref().map(|s| &s.data), data)
            } else {
                data
            };
            state.data = Some(Synced {
                data,
                last_updated: Utc::now(),
            });
        });
        true
    }

    fn fail(&self, seq: Option<u64>, token: &CancelToken, err: &SyncError) {
        if token.is_cancelled() {
            return;
        }
        if let Some(seq) = seq {
            if self.applied_read.load(Ordering::SeqCst) > seq {
                return;
            }
        }
        tracing::warn!(domain = %D::DOMAIN, error = %err, "Sync failed");
        let message = err.to_string();
        self.state.send_modify(|state| state.error = Some(message));
    }

    fn set_loading(&self, token: &CancelToken, loading: bool) {
        if token.is_cancelled() {
            return;
        }
        self.state.send_modify(|state| {
            state.loading = loading;
            if loading {
                state.error = None;
            }
        });
    }

    async fn fetch_with(&self, token: &CancelToken) -> Result<(), SyncError> {
        let seq = self.begin_read();
        let identity = self.identity().await;
        let params = self.params();

        match D::fetch(self.backend.as_ref(), &identity, &params).await {
            Ok(data) => {
                self.apply(seq, token, data, true);
                Ok(())
            }
            Err(e) => {
                self.fail(Some(seq), token, &e);
                Err(e)
            }
        }
    }

    async fn trigger_with(&self, token: &CancelToken) -> Result<(), SyncError> {
        let identity = self.identity().await;
        let body = self.take_trigger_body(&identity);

        let response = match self.backend.invoke(D::DOMAIN.function_name(), body).await {
            Ok(response) => response,
            Err(e) => {
                self.fail(None, token, &e);
                return Err(e);
            }
        };

        match D::from_trigger_response(&response) {
            Some(Ok(data)) => {
                let seq = self.begin_read();
                self.apply(seq, token, data, false);
                Ok(())
            }
            Some(Err(e)) => {
                self.fail(None, token, &e);
                Err(e)
            }
            // Write first, then read.
            None => self.fetch_with(token).await,
        }
    }
}

/// One mounted dashboard surface for domain `D`.
///
/// State is published through a `watch` channel. Realtime channels opened by
/// [`mount`](Self::mount) are closed by [`unmount`](Self::unmount) or on drop.
pub struct SyncHook<D: SyncDomain> {
    inner: Arc<HookInner<D>>,
    listeners: Vec<JoinHandle<()>>,
}

impl<D: SyncDomain> SyncHook<D> {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_params(backend, D::Params::default())
    }

    pub fn with_params(backend: Arc<dyn Backend>, params: D::Params) -> Self {
        let (state, _) = watch::channel(HookState::default());
        Self {
            inner: Arc::new(HookInner {
                backend,
                state,
                params: Mutex::new(params),
                cancel: Mutex::new(CancelToken::new()),
                issued_reads: AtomicU64::new(0),
                applied_read: AtomicU64::new(0),
            }),
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> HookState<D::Data> {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<HookState<D::Data>> {
        self.inner.state.subscribe()
    }

    pub fn params(&self) -> D::Params {
        self.inner.params()
    }

    pub fn is_mounted(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Invoke the domain relay, then re-read. On failure the previous data
    /// stays and `error` is set. `params` replaces the stored parameters.
    pub async fn trigger_update(&self, params: Option<D::Params>) -> Result<(), SyncError> {
        if let Some(params) = params {
            self.inner.set_params(params);
        }
        let token = self.inner.token();

        self.inner.set_loading(&token, true);
        let res = self.inner.trigger_with(&token).await;
        self.inner.set_loading(&token, false);
        res
    }

    pub async fn fetch_data(&self) -> Result<(), SyncError> {
        let token = self.inner.token();
        self.inner.fetch_with(&token).await
    }

    pub async fn refetch(&self) -> Result<(), SyncError> {
        self.fetch_data().await
    }

    /// Open one channel per watched table, then trigger (auto-trigger
    /// domains) or read once. Each change notification causes one read.
    pub async fn mount(&mut self) -> Result<(), SyncError> {
        if self.is_mounted() {
            return Ok(());
        }

        for &table in D::WATCHED {
            let mut channel = match self.inner.backend.subscribe(table).await {
                Ok(channel) => channel,
                Err(e) => {
                    self.unmount();
                    return Err(e);
                }
            };

            let inner = Arc::clone(&self.inner);
            let token = inner.token();
            self.listeners.push(tokio::spawn(async move {
                while let Some(event) = channel.recv().await {
                    if token.is_cancelled() {
                        break;
                    }
                    tracing::debug!(domain = %D::DOMAIN, table = %event.table, event = ?event.event, "Change notification");
                    let _ = inner.fetch_with(&token).await;
                }
                channel.close();
            }));
        }

        tracing::debug!(domain = %D::DOMAIN, channels = self.listeners.len(), "Hook mounted");

        if D::AUTO_TRIGGER {
            self.trigger_update(None).await
        } else {
            self.fetch_data().await
        }
    }

    /// Close every channel and discard results of work still in flight.
    pub fn unmount(&mut self) {
        match self.inner.cancel.lock() {
            Ok(mut guard) => {
                guard.cancel();
                *guard = CancelToken::new();
            }
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                guard.cancel();
                *guard = CancelToken::new();
            }
        }

        // Aborting a listener drops its Channel, which stops the feeder.
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        self.inner.state.send_modify(|state| state.loading = false);
    }
}

impl<D: SyncDomain> Drop for SyncHook<D> {
    fn drop(&mut self) {
        self.unmount();
    }
}
