use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::scanner::{CaptureConfig, ScanPolicy};
use crate::scoring::ClassifierSettings;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub scan_policy: ScanPolicy,
    pub capture: CaptureConfig,
    pub classifier: ClassifierSettings,
}

impl AppSettings {
    pub fn validate(&self) -> Result<()> {
        self.scan_policy.validate().context("invalid scan policy")?;
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing file, unparseable JSON or a policy that fails
    /// validation all yield defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<AppSettings>(&contents) {
                Ok(settings) if settings.validate().is_ok() => settings,
                Ok(_) => {
                    warn!("Settings in {} failed validation; using defaults", path.display());
                    AppSettings::default()
                }
                Err(err) => {
                    warn!("Ignoring unreadable settings in {}: {err}", path.display());
                    AppSettings::default()
                }
            }
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        Self::new(data_dir.join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn scan_policy(&self) -> ScanPolicy {
        self.read().scan_policy
    }

    pub fn capture(&self) -> CaptureConfig {
        self.read().capture.clone()
    }

    pub fn classifier(&self) -> ClassifierSettings {
        self.read().classifier.clone()
    }

    /// Applies `change` and persists the result. Rejected changes leave the stored
    /// settings untouched.
    pub fn update<F>(&self, change: F) -> Result<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        next.validate()?;
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::scanner::FacingMode;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(store.get(), AppSettings::default());
        assert_eq!(store.scan_policy().min_repeats, 3);
        assert_eq!(store.capture().facing_mode, FacingMode::Environment);
    }

    #[test]
    fn update_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        store
            .update(|settings| {
                settings.scan_policy.min_repeats = 2;
                settings.classifier.enabled = false;
            })
            .unwrap();

        let reopened = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.scan_policy().min_repeats, 2);
        assert!(!reopened.classifier().enabled);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_written() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        let result = store.update(|settings| settings.scan_policy.min_repeats = 9);
        assert!(result.is_err());
        assert_eq!(store.scan_policy().min_repeats, 3);
        assert!(!store.path().exists());
    }

    #[test]
    fn partial_and_corrupt_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        fs::write(&path, r#"{"scanPolicy": {"minConfidence": 0.8}}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.scan_policy().min_confidence, 0.8);
        assert_eq!(store.scan_policy().buffer_capacity, 5);

        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn oversized_buffer_capacity_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &path,
            r#"{"scanPolicy": {"bufferCapacity": 1000000000000000000, "minRepeats": 3}}"#,
        )
        .unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.scan_policy(), ScanPolicy::default());
    }
}
