use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::alarm::model::{
    Alarm, AlarmDocument, AlarmSettings, parse_alarm_document, render_alarm_document,
};
use crate::error::StoreError;

pub trait AlarmStore {
    fn load_alarms(&mut self) -> Result<Vec<Alarm>, StoreError>;
    fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), StoreError>;
}

/// JSON document on disk. A missing file reads as an empty alarm list with
/// default settings; settings are carried through every save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    settings: AlarmSettings,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: AlarmSettings::default(),
        }
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    fn read_document(&self) -> Result<AlarmDocument, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_alarm_document(&content),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "alarm file missing, starting empty");
                Ok(AlarmDocument::default())
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl AlarmStore for JsonFileStore {
    fn load_alarms(&mut self) -> Result<Vec<Alarm>, StoreError> {
        let document = self.read_document()?;
        self.settings = document.settings;
        Ok(document.alarms)
    }

    fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), StoreError> {
        let text = render_alarm_document(alarms, &self.settings)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, text).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub alarms: Vec<Alarm>,
    pub saves: usize,
    pub fail_saves: bool,
}

#[cfg(test)]
impl AlarmStore for MemoryStore {
    fn load_alarms(&mut self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.alarms.clone())
    }

    fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("store offline"),
            });
        }
        self.saves += 1;
        self.alarms = alarms.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use tempfile::tempdir;

    use super::*;
    use crate::alarm::model::Recurrence;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path().join("alarms.json"));
        let alarms = store.load_alarms().expect("load");
        assert!(alarms.is_empty());
        assert!(store.settings().notifications_enabled);
    }

    #[test]
    fn save_keeps_loaded_settings() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("alarms.json");
        fs::write(
            &path,
            r#"{ "version": 1, "settings": { "notifications_enabled": false }, "alarms": [] }"#,
        )
        .expect("write");

        let mut store = JsonFileStore::new(&path);
        store.load_alarms().expect("load");
        let alarm = Alarm::new(
            NaiveTime::from_hms_opt(6, 45, 0).expect("time"),
            Recurrence::Weekly { day_of_week: 3 },
            42,
        );
        store.save_alarms(&[alarm.clone()]).expect("save");

        let mut reopened = JsonFileStore::new(&path);
        let alarms = reopened.load_alarms().expect("reload");
        assert_eq!(alarms, vec![alarm]);
        assert!(!reopened.settings().notifications_enabled);
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("alarms.json");
        let mut store = JsonFileStore::new(&path);
        store.save_alarms(&[]).expect("save");
        assert!(path.exists());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("alarms.json");
        fs::write(&path, "{ nope").expect("write");
        let err = JsonFileStore::new(&path)
            .load_alarms()
            .expect_err("malformed file");
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
