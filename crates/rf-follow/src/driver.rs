//! Ties the feature queue, the engine, and the position store together for
//! one following session, and owns the audio source's lifetime.
//!
//! Grounded on the teacher's RAII device/stream guards (`AudioStream` in
//! `rf-audio::stream` holds a `cpal::Stream` that stops the device on
//! `Drop`) and on `original_source/backend/app/main.py`'s per-connection
//! loop (`with AudioStream(...) as stream: oltw = OLTW(...); for frame in
//! oltw.run(): ...`), restructured from a generator loop into an explicit
//! `step`-driven worker thread plus a `Drop`-based cancellation guard.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rf_audio::AudioSource;

use crate::engine::{OltwEngine, StepOutcome};
use crate::error::FollowResult;
use crate::position::{PositionStore, SessionId};

/// Converts a reference-frame index into whatever position unit the caller
/// wants written to the [`PositionStore`]. The beat/quarter mapping named
/// in the specification's scope as an external collaborator is exactly
/// this closure; the default identity mapping writes the raw frame index.
pub type PositionMapper = Box<dyn Fn(u32) -> f32 + Send>;

fn identity_mapper() -> PositionMapper {
    Box::new(|frame| frame as f32)
}

/// Final result of a session's run, distinguishing normal completion from
/// an early end-of-stream (spec.md §7: "truncated-follow result; distinct
/// from normal completion").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The reference was exhausted normally.
    Finished,
    /// The feature queue hit EOF before the reference was exhausted.
    Truncated,
}

/// Owns one session's audio source, engine, and worker thread. Dropping a
/// `Session` (whether by normal scope exit, an early `close()`, or an
/// unwinding panic) stops the audio source, which in turn releases its
/// device or decoder thread on every exit path.
pub struct Session<S: AudioSource + Send + 'static> {
    id: SessionId,
    store: Arc<PositionStore>,
    source: Option<S>,
    worker: Option<JoinHandle<FollowOutcome>>,
}

impl<S: AudioSource + Send + 'static> Session<S> {
    /// Starts the audio source, spawns the engine worker thread, and
    /// begins writing reference-frame indices (as raw `f32`) to `store`
    /// under `id`. A source that fails to start leaves no resource held
    /// (spec.md §7 Resource acquisition failure: "engine does not start;
    /// no partial state").
    pub fn start(
        id: impl Into<SessionId>,
        source: S,
        engine: OltwEngine,
        store: Arc<PositionStore>,
    ) -> FollowResult<Self> {
        Self::start_with_mapper(id, source, engine, store, identity_mapper())
    }

    /// As [`Session::start`], but positions are passed through `mapper`
    /// before being written — the hook an external beat/quarter mapping
    /// layer plugs into.
    pub fn start_with_mapper(
        id: impl Into<SessionId>,
        mut source: S,
        mut engine: OltwEngine,
        store: Arc<PositionStore>,
        mapper: PositionMapper,
    ) -> FollowResult<Self> {
        let id = id.into();
        source.start()?;

        let worker_id = id.clone();
        let worker_store = Arc::clone(&store);
        let worker = thread::spawn(move || loop {
            match engine.step() {
                StepOutcome::Advanced(frame) => {
                    worker_store.set(worker_id.clone(), mapper(frame.0));
                }
                StepOutcome::Truncated => break FollowOutcome::Truncated,
                StepOutcome::Finished => break FollowOutcome::Finished,
            }
        });

        Ok(Self {
            id,
            store,
            source: Some(source),
            worker: Some(worker),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Blocks until the engine reaches a terminal outcome, then tears the
    /// session down as [`Session::close`] would.
    pub fn join(mut self) -> FollowOutcome {
        let outcome = self
            .worker
            .take()
            .map(|handle| handle.join().unwrap_or(FollowOutcome::Truncated))
            .unwrap_or(FollowOutcome::Truncated);
        self.teardown();
        outcome
    }

    /// Stops the source, waits for the engine to observe EOF or finish,
    /// and clears this session's position entry.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.store.remove(&self.id);
    }
}

impl<S: AudioSource + Send + 'static> Drop for Session<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
