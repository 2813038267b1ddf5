//! Process-wide position store: the hand-off between the engine driver
//! (writer) and the external streaming interface (reader).
//!
//! Last-write-wins, no freshness guarantee beyond that — readers sample at
//! their own cadence. Grounded on `original_source/backend/app/position_manager.py`
//! (`PositionManager`), translated from a module-level dict to a
//! `parking_lot::Mutex<HashMap<...>>`, the same mutex crate the teacher uses
//! for `StreamState.callback` and throughout `rf-dsp`.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Opaque session identifier. The core treats it as an owned string;
/// callers (the external interface layer) decide what it means.
pub type SessionId = String;

/// `session_id -> latest reference beat position`.
#[derive(Default)]
pub struct PositionStore {
    inner: Mutex<HashMap<SessionId, f32>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Records the latest position for a session.
    pub fn set(&self, session_id: impl Into<SessionId>, position: f32) {
        self.inner.lock().insert(session_id.into(), position);
    }

    /// Returns the session's latest position, or `0.0` if absent or NaN.
    pub fn get(&self, session_id: &str) -> f32 {
        match self.inner.lock().get(session_id).copied() {
            Some(position) if !position.is_nan() => position,
            _ => 0.0,
        }
    }

    /// Removes a single session's entry (session close).
    pub fn remove(&self, session_id: &str) {
        self.inner.lock().remove(session_id);
    }

    /// Snapshot of every tracked session's position.
    pub fn get_all(&self) -> HashMap<SessionId, f32> {
        self.inner.lock().clone()
    }

    /// Clears every tracked session.
    pub fn reset(&self) {
        self.inner.lock().clear();
    }
}
