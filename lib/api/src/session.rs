//! Per-client interaction state
//!
//! A session remembers what one client was doing between requests: the mode,
//! the last prediction and its input, the field values seen so far and the
//! last search. Resetting rules:
//!
//! - switching mode clears the prediction
//! - changing a field value that was already recorded clears the prediction
//!
//! Sessions never touch the shared dataset or model. A session left idle
//! longer than the store's idle timeout is evicted.

use ahash::RandomState;
use carscope_core::{FieldValue, VehicleRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Browse and filter the dataset
    #[default]
    Basic,
    /// Enter every vehicle field and predict
    Full,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub id: Uuid,
    pub mode: Mode,
    /// Input of the last prediction
    pub input: Option<VehicleRecord>,
    pub predicted_price: Option<f64>,
    pub predict_clicked: bool,
    pub last_values: BTreeMap<String, FieldValue>,
    /// Dataset row indices of the last search
    pub search_results: Option<Vec<usize>>,
    /// Dataset row index chosen from the last search
    pub selected_car: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            mode: Mode::default(),
            input: None,
            predicted_price: None,
            predict_clicked: false,
            last_values: BTreeMap::new(),
            search_results: None,
            selected_car: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn clear_prediction(&mut self) {
        self.predict_clicked = false;
        self.predicted_price = None;
        self.input = None;
    }

    /// Switch mode. Returns true when the prediction was cleared.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        self.touch();
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        let had_prediction = self.predict_clicked;
        self.clear_prediction();
        had_prediction
    }

    /// Record the current value of a form field. Returns true when a changed
    /// value cleared an existing prediction.
    pub fn observe_field(&mut self, key: &str, value: FieldValue) -> bool {
        self.touch();
        let changed = self
            .last_values
            .get(key)
            .and_then(FieldValue::category_key)
            .is_some_and(|old| value.category_key().as_deref() != Some(old.as_str()));
        let cleared = self.predict_clicked && changed;
        if cleared {
            self.clear_prediction();
        }
        self.last_values.insert(key.to_string(), value);
        cleared
    }

    /// Store a prediction and the fields it was made from
    pub fn record_prediction(&mut self, input: VehicleRecord, price: f64) {
        self.touch();
        for column in input.columns() {
            self.last_values
                .insert(column.clone(), input.get(column).clone());
        }
        self.input = Some(input);
        self.predicted_price = Some(price);
        self.predict_clicked = true;
    }

    /// Store search results. The previous selection survives when it is
    /// still among the results; otherwise the first result is selected.
    pub fn record_search(&mut self, indices: Vec<usize>) {
        self.touch();
        let keep = self.selected_car.filter(|s| indices.contains(s));
        self.selected_car = keep.or_else(|| indices.first().copied());
        self.search_results = Some(indices);
    }

    /// Select a row from the last search. Returns false when it is not one
    /// of the results.
    pub fn select_car(&mut self, index: usize) -> bool {
        self.touch();
        let found = self
            .search_results
            .as_ref()
            .is_some_and(|r| r.contains(&index));
        if found {
            self.selected_car = Some(index);
        }
        found
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True when the session has not been touched for longer than `ttl`
    fn is_idle(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.updated_at).to_std().is_ok_and(|idle| idle > ttl)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Idle timeout used by [`SessionStore::new`]
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// All live sessions, keyed by id
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionContext, RandomState>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_IDLE)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::default()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Create a session, evicting idle ones first
    pub fn create(&self) -> SessionContext {
        let now = Utc::now();
        let session = SessionContext::new();
        let mut sessions = self.sessions.write();
        Self::retain_active(&mut sessions, self.idle_ttl, now);
        sessions.insert(session.id, session.clone());
        debug!("Created session {}", session.id);
        session
    }

    /// Snapshot of a session. Idle sessions are treated as gone.
    pub fn get(&self, id: &Uuid) -> Option<SessionContext> {
        let now = Utc::now();
        self.sessions
            .read()
            .get(id)
            .filter(|s| !s.is_idle(self.idle_ttl, now))
            .cloned()
    }

    /// Run `f` against a live session under the write lock
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut SessionContext) -> R) -> Option<R> {
        let now = Utc::now();
        self.sessions
            .write()
            .get_mut(id)
            .filter(|s| !s.is_idle(self.idle_ttl, now))
            .map(f)
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    /// Drop every idle session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.evict_idle(Utc::now())
    }

    /// Drop every session idle at `now`. Returns how many were removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        Self::retain_active(&mut self.sessions.write(), self.idle_ttl, now)
    }

    fn retain_active(
        sessions: &mut HashMap<Uuid, SessionContext, RandomState>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_idle(ttl, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
