// ── Query state persistence ──
//
// The current selection lives in two places: the share URL (`t1`, `t2`,
// one `device` per row) and a key/value store (`t1`, `t2`, and `devices`
// joined with `&`). On load the URL wins; on every query the store is
// written first and the URL is rebuilt from it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::CoreError;

const KEY_T1: &str = "t1";
const KEY_T2: &str = "t2";
const KEY_DEVICES: &str = "devices";
const PARAM_DEVICE: &str = "device";
const DEVICE_SEPARATOR: &str = "&";

/// Time bounds plus serialized device rows, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub t1: String,
    pub t2: String,
    pub devices: Vec<String>,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.t1.is_empty() && self.t2.is_empty() && self.devices.is_empty()
    }

    /// Device rows in their stored `a&b&c` form.
    pub fn joined_devices(&self) -> String {
        self.devices.join(DEVICE_SEPARATOR)
    }
}

// ── Stores ──────────────────────────────────────────────────────────

/// String key/value storage that outlives a single run.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened state store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush()
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Read state from a page URL. `None` when it carries none of the keys.
pub fn load_from_url(url: &Url) -> Option<PersistedState> {
    let mut state = PersistedState::default();
    let mut t1 = None;
    let mut t2 = None;

    for (key, value) in url.query_pairs() {
        match &*key {
            KEY_T1 if t1.is_none() => t1 = Some(value.into_owned()),
            KEY_T2 if t2.is_none() => t2 = Some(value.into_owned()),
            PARAM_DEVICE => state.devices.push(value.into_owned()),
            _ => {}
        }
    }

    state.t1 = t1.unwrap_or_default();
    state.t2 = t2.unwrap_or_default();

    if state.is_empty() {
        None
    } else {
        Some(state)
    }
}

/// Read state from the store. Missing keys read as empty.
pub fn load_from_store(store: &impl KeyValueStore) -> PersistedState {
    let devices = store.get(KEY_DEVICES).unwrap_or_default();
    PersistedState {
        t1: store.get(KEY_T1).unwrap_or_default(),
        t2: store.get(KEY_T2).unwrap_or_default(),
        devices: if devices.is_empty() {
            Vec::new()
        } else {
            devices.split(DEVICE_SEPARATOR).map(str::to_owned).collect()
        },
    }
}

/// Startup policy: the URL is the shareable form and wins when present.
pub fn load_preferring_url(url: Option<&Url>, store: &impl KeyValueStore) -> PersistedState {
    if let Some(state) = url.and_then(load_from_url) {
        tracing::debug!(devices = state.devices.len(), "Loaded query state from URL");
        return state;
    }
    let state = load_from_store(store);
    tracing::debug!(devices = state.devices.len(), "Loaded query state from store");
    state
}

// ── Saving ──────────────────────────────────────────────────────────

pub fn save(store: &mut impl KeyValueStore, state: &PersistedState) -> Result<(), CoreError> {
    store.set(KEY_T1, &state.t1)?;
    store.set(KEY_T2, &state.t2)?;
    store.set(KEY_DEVICES, &state.joined_devices())?;
    Ok(())
}

/// Build the share URL for what the store currently holds.
///
/// Keeps only origin and path of `page`; any existing query or fragment
/// is dropped. Returns `None` when the store is empty. Nothing navigates:
/// the caller keeps the URL to hand out later.
pub fn reflect_to_url(store: &impl KeyValueStore, page: &Url) -> Option<Url> {
    let t1 = store.get(KEY_T1).unwrap_or_default();
    let t2 = store.get(KEY_T2).unwrap_or_default();
    let devices = store.get(KEY_DEVICES).unwrap_or_default();

    if t1.is_empty() && t2.is_empty() && devices.is_empty() {
        return None;
    }

    let mut url = page.clone();
    url.set_query(None);
    url.set_fragment(None);
    let _ = url.set_username("");
    let _ = url.set_password(None);

    {
        let mut query = url.query_pairs_mut();
        query.append_pair(KEY_T1, &t1);
        query.append_pair(KEY_T2, &t2);
        for device in devices.split(DEVICE_SEPARATOR) {
            query.append_pair(PARAM_DEVICE, device);
        }
    }

    Some(url)
}
