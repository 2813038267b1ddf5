//! End-to-end following scenarios (S1-S6), run against the public
//! `OltwEngine` and `PositionStore` APIs rather than their internals.

use std::sync::Arc;

use rf_audio::channel;
use rf_core::ChromaVector;
use rf_dsp::FeatureType;
use rf_follow::engine::{FollowConfig, LocalCost, OltwEngine, StepOutcome};
use rf_follow::position::PositionStore;
use rf_follow::Direction;

fn unit_vector(dim: usize) -> ChromaVector {
    let mut v = [0.0f32; 12];
    v[dim % 12] = 1.0;
    v
}

fn zero_vector() -> ChromaVector {
    [0.0f32; 12]
}

fn config(window_seconds: f32, frame_rate: u32, max_run_count: u32) -> FollowConfig {
    config_with_seg(window_seconds, frame_rate, max_run_count, 1)
}

fn config_with_seg(
    window_seconds: f32,
    frame_rate: u32,
    max_run_count: u32,
    frame_per_seg: u32,
) -> FollowConfig {
    FollowConfig {
        window_seconds,
        frame_per_seg,
        frame_rate,
        sample_rate: frame_rate * 10,
        local_cost: LocalCost::Euclidean,
        max_run_count,
        feature_type: FeatureType::Chroma,
    }
}

/// S1 - Identity: target replays the reference verbatim. Expect emitted
/// ref indices to advance monotonically and settle within `d` of `N_ref`.
#[test]
fn s1_identity_alignment_reaches_the_end() {
    let cfg = config(0.3, 10, 30);
    let reference: Arc<[ChromaVector]> = (0..60).map(unit_vector).collect::<Vec<_>>().into();

    let (mut producer, consumer) = channel(256);
    for row in reference.iter() {
        producer.push(*row);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg.clone()).unwrap();
    let mut last_ref = 0u32;
    loop {
        match engine.step() {
            StepOutcome::Advanced(idx) => {
                assert!(idx.0 >= last_ref, "reference index must never regress");
                last_ref = idx.0;
            }
            StepOutcome::Finished | StepOutcome::Truncated => break,
        }
    }

    let d = cfg.frame_per_seg;
    assert!(last_ref as usize >= reference.len() - d as usize);
    assert!(last_ref as usize <= reference.len());
}

/// S2 - Constant tempo stretch x2: each reference row is repeated twice in
/// the target. The engine must eventually consume the whole target
/// without ever exceeding `max_run_count` consecutive TARGET-only steps.
#[test]
fn s2_tempo_stretch_keeps_run_count_bounded() {
    let max_run_count = 30;
    let cfg = config(0.5, 10, max_run_count);
    let reference: Arc<[ChromaVector]> = (0..30).map(unit_vector).collect::<Vec<_>>().into();

    let (mut producer, consumer) = channel(512);
    for row in reference.iter() {
        producer.push(*row);
        producer.push(*row);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg).unwrap();
    loop {
        match engine.step() {
            StepOutcome::Advanced(_) => {
                if engine.previous_direction() == Some(Direction::Target) {
                    assert!(
                        engine.run_count() <= max_run_count + 1,
                        "run_count must be forced to toggle within one step of the max"
                    );
                }
            }
            StepOutcome::Finished | StepOutcome::Truncated => break,
        }
    }
}

/// S3 - Silence prefix: 15 zero-chroma frames precede the reference
/// content. The engine must not panic or regress, and must still make
/// forward progress once real content starts arriving.
#[test]
fn s3_silence_prefix_does_not_break_monotonicity() {
    let cfg = config(0.3, 10, 30);
    let reference: Arc<[ChromaVector]> = (0..40).map(unit_vector).collect::<Vec<_>>().into();

    let (mut producer, consumer) = channel(512);
    for _ in 0..15 {
        producer.push(zero_vector());
    }
    for row in reference.iter() {
        producer.push(*row);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg).unwrap();
    let mut last_ref = 0u32;
    let mut steps = 0usize;
    loop {
        match engine.step() {
            StepOutcome::Advanced(idx) => {
                assert!(idx.0 >= last_ref);
                last_ref = idx.0;
                steps += 1;
            }
            StepOutcome::Finished | StepOutcome::Truncated => break,
        }
    }
    assert!(steps > 15, "engine must keep advancing past the silence prefix");
    assert!(last_ref as usize <= reference.len());
}

/// S4 - Forced toggle: the target matches reference row 0 for 40
/// consecutive frames, which should drive the direction machine into a
/// long TARGET run. `run_count` must never exceed `max_run_count` by more
/// than one step.
#[test]
fn s4_forced_toggle_bounds_the_target_run() {
    let max_run_count = 30;
    let cfg = config(0.3, 10, max_run_count);
    let reference: Arc<[ChromaVector]> = (0..30).map(unit_vector).collect::<Vec<_>>().into();
    let row0 = reference[0];

    let (mut producer, consumer) = channel(512);
    for _ in 0..40 {
        producer.push(row0);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg).unwrap();
    loop {
        match engine.step() {
            StepOutcome::Advanced(_) => {
                assert!(
                    engine.run_count() <= max_run_count + 1,
                    "run_count exceeded max_run_count without a forced toggle"
                );
            }
            StepOutcome::Finished | StepOutcome::Truncated => break,
        }
    }
}

/// S5 - Early EOF: the queue closes after 10 target frames. The engine
/// must terminate cleanly with a `Truncated` outcome and a path containing
/// no more entries than frames actually produced.
#[test]
fn s5_early_eof_truncates_cleanly() {
    let cfg = config(0.3, 10, 30);
    let reference: Arc<[ChromaVector]> = (0..60).map(unit_vector).collect::<Vec<_>>().into();

    let (mut producer, consumer) = channel(256);
    for row in reference.iter().take(10) {
        producer.push(*row);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg).unwrap();
    let mut outcome = StepOutcome::Finished;
    loop {
        outcome = engine.step();
        match outcome {
            StepOutcome::Advanced(_) => continue,
            StepOutcome::Finished | StepOutcome::Truncated => break,
        }
    }

    assert_eq!(outcome, StepOutcome::Truncated);
    assert!(engine.path().len() <= 10);
}

/// S6 - NaN position: setting a session's position to NaN directly must
/// normalize to 0 on read.
#[test]
fn s6_nan_position_reads_as_zero() {
    let store = PositionStore::new();
    store.set("session-1", f32::NAN);
    assert_eq!(store.get("session-1"), 0.0);
}

/// `frame_per_seg > 1` advances `input_ptr`/`ref_ptr` by more than one
/// frame per non-`Ref`/non-`Target` step; every one of those frames must
/// actually be dequeued and pushed onto `input`, or the first window fill
/// indexes past the end of the buffer.
#[test]
fn frame_per_seg_greater_than_one_does_not_panic() {
    let cfg = config_with_seg(0.3, 10, 30, 3);
    let reference: Arc<[ChromaVector]> = (0..60).map(unit_vector).collect::<Vec<_>>().into();

    let (mut producer, consumer) = channel(512);
    for row in reference.iter() {
        producer.push(*row);
    }
    producer.close();

    let mut engine = OltwEngine::new(reference.clone(), consumer, cfg).unwrap();
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
    assert!(last_ref as usize <= reference.len());
}
