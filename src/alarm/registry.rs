use chrono::NaiveTime;
use tracing::{debug, info, warn};

use crate::alarm::model::{Alarm, Recurrence};
use crate::alarm::store::AlarmStore;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(String),
    Duplicate,
}

/// Sole owner of the alarm set. Alarms stay sorted by time of day and every
/// mutation is written through to the store. A failed save leaves the
/// in-memory change in place and reports the error.
pub struct AlarmRegistry<S> {
    alarms: Vec<Alarm>,
    store: S,
}

impl<S: AlarmStore> AlarmRegistry<S> {
    pub fn load(mut store: S) -> Result<Self, StoreError> {
        let loaded = store.load_alarms()?;
        let mut alarms: Vec<Alarm> = Vec::with_capacity(loaded.len());
        for alarm in loaded {
            if alarms.iter().any(|existing| existing.same_slot(&alarm)) {
                warn!(alarm_id = %alarm.id, "dropping duplicate alarm from store");
                continue;
            }
            alarms.push(alarm);
        }
        sort_by_time(&mut alarms);
        debug!(count = alarms.len(), "alarm registry loaded");
        Ok(Self { alarms, store })
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn get(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn add(
        &mut self,
        time: NaiveTime,
        recurrence: Recurrence,
        created_unix_ms: i64,
    ) -> Result<AddOutcome, StoreError> {
        if self
            .alarms
            .iter()
            .any(|alarm| alarm.time == time && alarm.recurrence == recurrence)
        {
            debug!(%recurrence, "duplicate alarm ignored");
            return Ok(AddOutcome::Duplicate);
        }

        let mut stamp = created_unix_ms;
        let mut alarm = Alarm::new(time, recurrence, stamp);
        while self.get(&alarm.id).is_some() {
            stamp += 1;
            alarm = Alarm::new(alarm.time, alarm.recurrence, stamp);
        }
        let id = alarm.id.clone();
        info!(alarm_id = %id, recurrence = %alarm.recurrence, "alarm added");
        self.alarms.push(alarm);
        sort_by_time(&mut self.alarms);
        self.persist()?;
        Ok(AddOutcome::Added(id))
    }

    /// Flips `is_active`; `None` when the id is unknown.
    pub fn toggle(&mut self, id: &str) -> Result<Option<bool>, StoreError> {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return Ok(None);
        };
        alarm.is_active = !alarm.is_active;
        let active = alarm.is_active;
        info!(alarm_id = %id, active, "alarm toggled");
        self.persist()?;
        Ok(Some(active))
    }

    pub fn deactivate(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(alarm) = self
            .alarms
            .iter_mut()
            .find(|alarm| alarm.id == id && alarm.is_active)
        else {
            return Ok(false);
        };
        alarm.is_active = false;
        debug!(alarm_id = %id, "alarm deactivated");
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.alarms.len();
        self.alarms.retain(|alarm| alarm.id != id);
        if self.alarms.len() == before {
            return Ok(false);
        }
        info!(alarm_id = %id, "alarm deleted");
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.alarms.len();
        self.alarms.clear();
        info!(removed, "alarms cleared");
        self.persist()?;
        Ok(removed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save_alarms(&self.alarms)
    }
}

fn sort_by_time(alarms: &mut [Alarm]) {
    alarms.sort_by(|left, right| left.time.cmp(&right.time));
}
