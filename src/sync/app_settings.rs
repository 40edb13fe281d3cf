//! Device-local display settings, kept as one JSON file under the platform
//! config directory (`~/.config/stockdash/app_settings.json` on Linux).

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::present::DateFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Candlestick,
    Area,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Seconds between automatic refreshes.
    pub refresh_interval: u64,
    pub chart_type: ChartType,
    pub date_format: DateFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            refresh_interval: 30,
            chart_type: ChartType::Line,
            date_format: DateFormat::MonthDayYear,
        }
    }
}

/// Fields to change; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSettingsPatch {
    pub refresh_interval: Option<u64>,
    pub chart_type: Option<ChartType>,
    pub date_format: Option<DateFormat>,
}

pub struct AppSettingsStore {
    path: PathBuf,
    settings: AppSettings,
}

impl AppSettingsStore {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stockdash").join("app_settings.json"))
    }

    /// Open the store at the platform location. Without a config directory
    /// the file lands in the working directory.
    pub fn open_default() -> Self {
        let path = Self::default_path().unwrap_or_else(|| PathBuf::from("app_settings.json"));
        Self::open(path)
    }

    /// A missing or unreadable file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Self::load(&path);
        Self { path, settings }
    }

    fn load(path: &Path) -> AppSettings {
        let Ok(json) = std::fs::read_to_string(path) else {
            return AppSettings::default();
        };
        match serde_json::from_str::<AppSettings>(&json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt app settings");
                AppSettings::default()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Apply `patch` and rewrite the file.
    pub fn update(&mut self, patch: AppSettingsPatch) -> anyhow::Result<&AppSettings> {
        if let Some(v) = patch.refresh_interval {
            self.settings.refresh_interval = v;
        }
        if let Some(v) = patch.chart_type {
            self.settings.chart_type = v;
        }
        if let Some(v) = patch.date_format {
            self.settings.date_format = v;
        }
        self.save()?;
        Ok(&self.settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    pub fn format_date<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> String {
        self.settings.date_format.format(date)
    }
}
