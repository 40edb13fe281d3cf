//! Client side: keeps dashboard surfaces in sync with the backend by
//! triggering relays, reading tables back and following change channels.

pub mod app_settings;
pub mod backend;
pub mod domains;
pub mod error;
pub mod hook;
pub mod http;
pub mod notifications;

pub use app_settings::{AppSettings, AppSettingsPatch, AppSettingsStore, ChartType};
pub use backend::{Backend, Channel, TableQuery};
pub use error::SyncError;
pub use hook::{CancelToken, HookState, SyncDomain, SyncHook, Synced};
pub use http::HttpBackend;
pub use notifications::{LocalNotification, NotificationCenter, NotificationDraft, NotificationKind};
