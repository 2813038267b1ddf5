//! The Online Time Warping alignment engine.

use std::sync::Arc;

use rf_audio::{FeatureConsumer, QueueItem};
use rf_core::{ChromaVector, FrameIndex};
use rf_dsp::FeatureType;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::error::{FollowError, FollowResult};
use crate::matrix::CostMatrix;

/// Distance metric used for the local cost `c(i,j)`. Euclidean is the only
/// implemented and tested option; the variant exists so configuration can
/// name the choice explicitly rather than hard-coding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalCost {
    Euclidean,
}

/// Tunable parameters for one following session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowConfig {
    /// Sliding window extent, in seconds.
    pub window_seconds: f32,
    /// Advancement granularity `d`.
    pub frame_per_seg: u32,
    /// Feature cadence; derives `hop_length` together with `sample_rate`.
    pub frame_rate: u32,
    pub sample_rate: u32,
    pub local_cost: LocalCost,
    /// Consecutive same-direction steps allowed before a forced toggle.
    pub max_run_count: u32,
    pub feature_type: FeatureType,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            window_seconds: 3.0,
            frame_per_seg: 1,
            frame_rate: 30,
            sample_rate: 44100,
            local_cost: LocalCost::Euclidean,
            max_run_count: 30,
            feature_type: FeatureType::Chroma,
        }
    }
}

impl FollowConfig {
    pub fn hop_length(&self) -> usize {
        (self.sample_rate / self.frame_rate) as usize
    }

    /// Window width `w = floor(window_seconds * frame_rate)`, in frames.
    pub fn window_frames(&self) -> usize {
        (self.window_seconds * self.frame_rate as f32).floor() as usize
    }

    fn validate(&self) -> FollowResult<()> {
        if self.window_seconds <= 0.0 {
            return Err(FollowError::InvalidConfig(
                "window_seconds must be positive".into(),
            ));
        }
        if self.frame_per_seg == 0 {
            return Err(FollowError::InvalidConfig(
                "frame_per_seg must be at least 1".into(),
            ));
        }
        if self.frame_rate == 0 || self.sample_rate == 0 {
            return Err(FollowError::InvalidConfig(
                "frame_rate and sample_rate must be positive".into(),
            ));
        }
        if self.sample_rate % self.frame_rate != 0 {
            return Err(FollowError::InvalidConfig(format!(
                "sample_rate {} is not an integer multiple of frame_rate {}",
                self.sample_rate, self.frame_rate
            )));
        }
        if self.window_frames() == 0 {
            return Err(FollowError::InvalidConfig(
                "window_seconds * frame_rate rounds down to zero frames".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one [`OltwEngine::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A new reference-frame index was emitted.
    Advanced(FrameIndex),
    /// The feature queue hit EOF before the reference was exhausted.
    Truncated,
    /// The reference was exhausted; following is complete.
    Finished,
}

fn euclidean_distance(a: &ChromaVector, b: &ChromaVector) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Diagonal tie-break discount applied only inside the recurrence's
/// comparator; `D` itself is always stored un-discounted.
const DIAGONAL_DISCOUNT: f32 = 0.98;

/// Incremental DTW alignment against a precomputed reference feature
/// matrix. One engine per following session; owns its matrices, pointers
/// and warping path exclusively.
pub struct OltwEngine {
    reference: Arc<[ChromaVector]>,
    input: Vec<ChromaVector>,
    matrix: CostMatrix,
    consumer: FeatureConsumer,
    config: FollowConfig,
    d: usize,
    w: usize,

    ref_ptr: usize,
    input_ptr: usize,

    previous_direction: Option<Direction>,
    run_count: u32,

    candidate_on_ref_edge: bool,
    candidate_on_target_edge: bool,

    path: Vec<(u32, u32)>,
    outcome: Option<StepOutcome>,
}

impl OltwEngine {
    pub fn new(
        reference: Arc<[ChromaVector]>,
        consumer: FeatureConsumer,
        config: FollowConfig,
    ) -> FollowResult<Self> {
        config.validate()?;
        let w = config.window_frames();
        let d = config.frame_per_seg as usize;

        if reference.is_empty() {
            return Err(FollowError::InvalidReference(
                "reference feature matrix is empty".into(),
            ));
        }
        if reference.len() < w {
            return Err(FollowError::InvalidReference(format!(
                "reference has {} frames, shorter than the configured window ({} frames)",
                reference.len(),
                w
            )));
        }

        let mut engine = Self {
            reference,
            input: Vec::new(),
            matrix: CostMatrix::new(w),
            consumer,
            config,
            d,
            w,
            ref_ptr: w,
            input_ptr: 0,
            previous_direction: None,
            run_count: 0,
            candidate_on_ref_edge: false,
            candidate_on_target_edge: false,
            path: Vec::new(),
            outcome: None,
        };
        engine.initialize();
        Ok(engine)
    }

    /// Window offset into `reference`: constant once `ref_ptr` is fixed at
    /// `w`, since `wx = w` for the engine's entire lifetime.
    fn ref_offset(&self) -> usize {
        self.ref_ptr - self.w
    }

    fn input_offset(&self) -> usize {
        self.input_ptr - self.matrix.wy()
    }

    fn local_cost(&self, i: usize, j: usize) -> f32 {
        let r = &self.reference[self.ref_offset() + i];
        let t = &self.input[self.input_offset() + j];
        match self.config.local_cost {
            LocalCost::Euclidean => euclidean_distance(r, t),
        }
    }

    /// Computes and stores the recurrence at `(i, j)`. Row 0 and column 0
    /// of the window are only ever filled here once each, during the very
    /// first window fill: every later shift only ever writes the far edge
    /// (the newest frames), so an `i == 0` or `j == 0` cell reached here is
    /// always the true leading-edge boundary with no valid predecessor,
    /// exactly the cells the window-edge two-term reduction covers.
    fn fill_cell(&mut self, i: usize, j: usize) {
        let cost = self.local_cost(i, j);
        let up = (i > 0).then(|| self.matrix.get(i - 1, j));
        let left = (j > 0).then(|| self.matrix.get(i, j - 1));

        let (total, length) = match (up, left) {
            (None, None) => (cost, 1),
            (Some((d_up, l_up)), None) => (cost + d_up, l_up + 1),
            (None, Some((d_left, l_left))) => (cost + d_left, l_left + 1),
            (Some((d_up, l_up)), Some((d_left, l_left))) => {
                let (d_diag, l_diag) = self.matrix.get(i - 1, j - 1);
                let discounted_diag = d_diag * DIAGONAL_DISCOUNT;
                if discounted_diag <= d_up && discounted_diag <= d_left {
                    (cost + d_diag, l_diag + 1)
                } else if d_up <= d_left {
                    (cost + d_up, l_up + 1)
                } else {
                    (cost + d_left, l_left + 1)
                }
            }
        };

        debug_assert!(
            total.is_finite() && length >= 1,
            "fill_cell produced a degenerate entry at ({i}, {j}): D={total}, L={length}"
        );
        self.matrix.set(i, j, total, length);
    }

    fn fill_block(&mut self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) {
        for i in rows {
            for j in cols.clone() {
                self.fill_cell(i, j);
            }
        }
    }

    /// Consumes `d` target frames so `input_ptr = d`, then computes the
    /// top-left corner of the matrices via the boundary recurrence.
    fn initialize(&mut self) {
        for _ in 0..self.d {
            match self.consumer.recv() {
                QueueItem::Frame(frame) => {
                    self.input.push(frame.chroma);
                    self.input_ptr += 1;
                }
                QueueItem::Eof => {
                    self.outcome = Some(StepOutcome::Truncated);
                    return;
                }
            }
        }
        self.matrix.advance_target(self.d);
        self.fill_block(0..self.w, 0..self.matrix.wy());
    }

    fn select_direction(&self) -> Direction {
        if self.input_ptr <= self.w {
            return Direction::Target;
        }
        if self.run_count > self.config.max_run_count {
            return self
                .previous_direction
                .unwrap_or(Direction::Target)
                .toggle();
        }
        match (self.candidate_on_ref_edge, self.candidate_on_target_edge) {
            (true, true) => Direction::Both,
            (true, false) => Direction::Ref,
            // Ties collapse to Target: Direction::Both is reachable only
            // through the run_count/edge combination above.
            (false, _) => Direction::Target,
        }
    }

    /// Picks the window-edge cell with the lowest length-normalized cost,
    /// appends it (translated to absolute coordinates) to the path, and
    /// records which edge(s) it came from for the next direction decision.
    fn select_candidate(&mut self) {
        let wy = self.matrix.wy();
        let mut best_cost = f32::INFINITY;
        let mut best = (self.w - 1, 0usize);
        let mut on_ref_edge = false;
        let mut on_target_edge = false;

        for j in 0..wy {
            let (cost, len) = self.matrix.get(self.w - 1, j);
            if len == 0 {
                continue;
            }
            let normalized = cost / len as f32;
            if normalized < best_cost {
                best_cost = normalized;
                best = (self.w - 1, j);
                on_ref_edge = true;
                on_target_edge = false;
            }
        }
        for i in 0..self.w {
            let (cost, len) = self.matrix.get(i, wy - 1);
            if len == 0 {
                continue;
            }
            let normalized = cost / len as f32;
            if normalized < best_cost {
                best_cost = normalized;
                best = (i, wy - 1);
                on_ref_edge = false;
                on_target_edge = true;
            } else if normalized == best_cost {
                on_target_edge = true;
            }
        }

        self.candidate_on_ref_edge = on_ref_edge;
        self.candidate_on_target_edge = on_target_edge;

        let ref_abs = self.ref_offset() as u32 + best.0 as u32;
        let target_abs = self.input_offset() as u32 + best.1 as u32;
        self.path.push((ref_abs, target_abs));
    }

    /// Advances the session by one step. Returns the terminal outcome
    /// repeatedly once following has ended.
    pub fn step(&mut self) -> StepOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        if self.ref_ptr > self.reference.len().saturating_sub(self.d) {
            self.outcome = Some(StepOutcome::Finished);
            return StepOutcome::Finished;
        }

        let direction = self.select_direction();
        let mut pending_col_fill = None;

        if direction != Direction::Ref {
            // One queue item carries exactly one target frame (rf-audio
            // pushes a single `FeatureFrame` per hop), so advancing by `d`
            // requires `d` dequeues, not one dequeue followed by a
            // pointer jump of `d`.
            for _ in 0..self.d {
                match self.consumer.recv() {
                    QueueItem::Frame(frame) => {
                        self.input.push(frame.chroma);
                        self.input_ptr += 1;
                    }
                    QueueItem::Eof => {
                        self.outcome = Some(StepOutcome::Truncated);
                        return StepOutcome::Truncated;
                    }
                }
            }
            let fill_start = self.matrix.advance_target(self.d);
            pending_col_fill = Some(fill_start);
        }

        if direction != Direction::Target {
            self.ref_ptr += self.d;
            self.matrix.advance_ref(self.d);
            // New rows span every column currently in the window,
            // including any just-grown-but-not-yet-filled ones from a
            // Both step's target advance above, which is why the target
            // fill happens after this for Both.
            self.fill_block(self.w - self.d..self.w, 0..self.matrix.wy());
        }

        if let Some(fill_start) = pending_col_fill {
            self.fill_block(0..self.w, fill_start..self.matrix.wy());
        }

        if self.previous_direction == Some(direction) {
            self.run_count += 1;
        } else {
            self.run_count = 1;
        }
        self.previous_direction = Some(direction);

        self.select_candidate();

        let ref_index = self.path.last().map(|(r, _)| *r).unwrap_or(0);
        StepOutcome::Advanced(FrameIndex(ref_index))
    }

    /// The warping path accumulated so far.
    pub fn path(&self) -> &[(u32, u32)] {
        &self.path
    }

    /// The direction chosen on the most recently completed step, if any.
    pub fn previous_direction(&self) -> Option<Direction> {
        self.previous_direction
    }

    /// Consecutive steps taken in `previous_direction()`.
    pub fn run_count(&self) -> u32 {
        self.run_count
    }

    pub fn ref_ptr(&self) -> usize {
        self.ref_ptr
    }

    pub fn input_ptr(&self) -> usize {
        self.input_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vector(dim: usize) -> ChromaVector {
        let mut v = [0.0f32; 12];
        v[dim % 12] = 1.0;
        v
    }

    fn small_config() -> FollowConfig {
        FollowConfig {
            window_seconds: 0.3,
            frame_per_seg: 1,
            frame_rate: 10,
            sample_rate: 100,
            local_cost: LocalCost::Euclidean,
            max_run_count: 30,
            feature_type: FeatureType::Chroma,
        }
    }

    #[test]
    fn identity_alignment_advances_monotonically() {
        let config = small_config();
        let reference: Arc<[ChromaVector]> = (0..20).map(unit_vector).collect::<Vec<_>>().into();

        let (mut producer, consumer) = rf_audio::channel(64);
        for frame in reference.iter() {
            producer.push(*frame);
        }
        producer.close();

        let mut engine = OltwEngine::new(reference.clone(), consumer, config).unwrap();
        let mut last_ref = 0u32;
        loop {
            match engine.step() {
                StepOutcome::Advanced(idx) => {
                    assert!(idx.0 >= last_ref);
                    last_ref = idx.0;
                }
                StepOutcome::Finished | StepOutcome::Truncated => break,
            }
        }
        assert!(last_ref as usize >= reference.len() - 2);
    }
}
