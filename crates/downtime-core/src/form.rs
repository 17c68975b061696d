// ── Query form ──
//
// The editable selection: two time bounds and an ordered list of device
// rows. Converts to and from `PersistedState`.

use serde::{Deserialize, Serialize};

use crate::drf::DeviceSpec;
use crate::error::CoreError;
use crate::persist::PersistedState;
use crate::window::TimeWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryForm {
    pub t1: String,
    pub t2: String,
    pub rows: Vec<DeviceSpec>,
}

impl QueryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a form from persisted state. Blank bounds leave the form's
    /// own values untouched.
    pub fn fill(&mut self, state: &PersistedState) {
        if !state.t1.is_empty() {
            self.t1.clone_from(&state.t1);
        }
        if !state.t2.is_empty() {
            self.t2.clone_from(&state.t2);
        }
        if !state.devices.is_empty() {
            self.rows = state.devices.iter().map(|d| DeviceSpec::parse(d)).collect();
        }
    }

    pub fn from_state(state: &PersistedState) -> Self {
        let mut form = Self::new();
        form.fill(state);
        form
    }

    /// Persisted form: each row serialized, empty rows kept as `""`.
    pub fn to_state(&self) -> PersistedState {
        PersistedState {
            t1: self.t1.clone(),
            t2: self.t2.clone(),
            devices: self.rows.iter().map(DeviceSpec::to_drf).collect(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            t1: Some(self.t1.clone()).filter(|s| !s.is_empty()),
            t2: Some(self.t2.clone()).filter(|s| !s.is_empty()),
        }
    }

    pub fn set_window(&mut self, window: &TimeWindow) {
        if let Some(ref t1) = window.t1 {
            self.t1.clone_from(t1);
        }
        if let Some(ref t2) = window.t2 {
            self.t2.clone_from(t2);
        }
    }

    /// Append a copy of the last row (an empty row if there is none).
    pub fn add_device(&mut self) -> &mut DeviceSpec {
        let row = self.rows.last().cloned().unwrap_or_default();
        self.rows.push(row);
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    pub fn add_spec(&mut self, spec: DeviceSpec) {
        self.rows.push(spec);
    }

    pub fn remove_device(&mut self, index: usize) -> Result<DeviceSpec, CoreError> {
        if index >= self.rows.len() {
            return Err(CoreError::NoSuchRow {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Rows that name a device.
    pub fn configured_rows(&self) -> impl Iterator<Item = &DeviceSpec> {
        self.rows.iter().filter(|r| r.is_configured())
    }
}
