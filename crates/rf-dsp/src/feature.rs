//! Chroma and chroma-decay feature extraction.
//!
//! Each extracted frame is a 12-dimensional pitch-class energy vector
//! computed from a single non-centered STFT frame of length `2 * hop_length`
//! (the previous hop concatenated with the new one). [`FrameBuilder`] owns
//! the hop carry-over so callers only ever hand it one hop's worth of fresh
//! samples at a time.

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use rf_core::ChromaVector;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{RfDspError, RfDspResult};

/// Which feature a [`ChromaExtractor`] produces from each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Pitch-class energy aggregated over one STFT frame.
    Chroma,
    /// Half-wave-rectified first difference of chroma across consecutive frames.
    ChromaDecay,
}

/// Maps an FFT bin to the pitch class (0 = C .. 11 = B) it falls nearest to.
fn bin_pitch_classes(n_fft: usize, sample_rate: u32) -> Vec<Option<usize>> {
    let mut classes = vec![None; n_fft / 2 + 1];
    // bin 0 is DC, carries no pitch information.
    for (k, slot) in classes.iter_mut().enumerate().skip(1) {
        let freq = k as f32 * sample_rate as f32 / n_fft as f32;
        if freq <= 0.0 {
            continue;
        }
        let midi = 69.0 + 12.0 * (freq / 440.0).log2();
        let pitch_class = midi.round().rem_euclid(12.0) as usize;
        *slot = Some(pitch_class.min(11));
    }
    classes
}

fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / (len - 1) as f32).cos())
        .collect()
}

/// Computes chroma vectors from fixed-length STFT windows.
///
/// Not thread-safe by design: one extractor per session, same as the
/// matrices it feeds.
pub struct ChromaExtractor {
    n_fft: usize,
    window: Vec<f32>,
    bin_classes: Vec<Option<usize>>,
    fft: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    input_buf: Vec<f32>,
    feature_type: FeatureType,
    previous_chroma: Option<ChromaVector>,
}

impl ChromaExtractor {
    /// `n_fft` must equal `2 * hop_length` per the continuity contract.
    pub fn new(n_fft: usize, sample_rate: u32, feature_type: FeatureType) -> RfDspResult<Self> {
        if n_fft == 0 || n_fft % 2 != 0 {
            return Err(RfDspError::InvalidFftSize(n_fft));
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let scratch = fft.make_output_vec();
        Ok(Self {
            n_fft,
            window: hann_window(n_fft),
            bin_classes: bin_pitch_classes(n_fft, sample_rate),
            fft,
            scratch,
            input_buf: vec![0.0; n_fft],
            feature_type,
            previous_chroma: None,
        })
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Extracts one feature row from a window of exactly `n_fft` samples.
    pub fn extract(&mut self, window: &[f32]) -> RfDspResult<ChromaVector> {
        if window.len() != self.n_fft {
            return Err(RfDspError::WindowLengthMismatch {
                expected: self.n_fft,
                actual: window.len(),
            });
        }

        for (dst, (src, w)) in self
            .input_buf
            .iter_mut()
            .zip(window.iter().zip(self.window.iter()))
        {
            *dst = src * w;
        }

        self.fft
            .process(&mut self.input_buf, &mut self.scratch)
            .expect("fixed-size fft plan never fails on a correctly sized buffer");

        let mut chroma = [0.0f32; 12];
        for (bin, coeff) in self.scratch.iter().enumerate() {
            if let Some(pitch_class) = self.bin_classes[bin] {
                chroma[pitch_class] += coeff.norm_sqr();
            }
        }
        normalize(&mut chroma);

        match self.feature_type {
            FeatureType::Chroma => Ok(chroma),
            FeatureType::ChromaDecay => {
                let previous = self.previous_chroma.unwrap_or([0.0; 12]);
                let mut decay = [0.0f32; 12];
                for i in 0..12 {
                    decay[i] = (chroma[i] - previous[i]).max(0.0);
                }
                self.previous_chroma = Some(chroma);
                Ok(decay)
            }
        }
    }
}

fn normalize(chroma: &mut ChromaVector) {
    let sum: f32 = chroma.iter().sum();
    if sum > 0.0 {
        for v in chroma.iter_mut() {
            *v /= sum;
        }
    }
}

/// Assembles fixed-length, hop-overlapping analysis windows from a stream of
/// hops, maintaining the continuity contract: frame `k+1`'s window is
/// prefixed with the last `hop_length` samples of frame `k`'s window (zeros
/// for the very first frame).
pub struct FrameBuilder {
    hop_length: usize,
    carry_over: Vec<f32>,
}

impl FrameBuilder {
    pub fn new(hop_length: usize) -> Self {
        Self {
            hop_length,
            carry_over: vec![0.0; hop_length],
        }
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Folds one new hop of samples into a `2 * hop_length` analysis window
    /// and advances the carry-over for the next call.
    pub fn push_hop(&mut self, hop: &[f32]) -> RfDspResult<Vec<f32>> {
        if hop.len() != self.hop_length {
            return Err(RfDspError::WindowLengthMismatch {
                expected: self.hop_length,
                actual: hop.len(),
            });
        }
        let mut window = Vec::with_capacity(self.hop_length * 2);
        window.extend_from_slice(&self.carry_over);
        window.extend_from_slice(hop);
        self.carry_over.copy_from_slice(hop);
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_builder_prefixes_zeros_on_first_hop() {
        let mut builder = FrameBuilder::new(4);
        let window = builder.push_hop(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(window, vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn frame_builder_carries_previous_hop_forward() {
        let mut builder = FrameBuilder::new(4);
        builder.push_hop(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let window = builder.push_hop(&[5.0, 6.0, 7.0, 8.0]).unwrap();
        assert_eq!(window, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn chroma_is_non_negative_and_sums_to_one() {
        let mut extractor = ChromaExtractor::new(256, 44100, FeatureType::Chroma).unwrap();
        let window: Vec<f32> = (0..256)
            .map(|n| (2.0 * PI * 440.0 * n as f32 / 44100.0).sin())
            .collect();
        let chroma = extractor.extract(&window).unwrap();
        assert!(chroma.iter().all(|&v| v >= 0.0));
        assert_relative_eq!(chroma.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn chroma_decay_is_zero_on_repeated_identical_frames() {
        let mut extractor = ChromaExtractor::new(256, 44100, FeatureType::ChromaDecay).unwrap();
        let window: Vec<f32> = (0..256)
            .map(|n| (2.0 * PI * 440.0 * n as f32 / 44100.0).sin())
            .collect();
        extractor.extract(&window).unwrap();
        let decay = extractor.extract(&window).unwrap();
        assert!(decay.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn rejects_mismatched_window_length() {
        let mut extractor = ChromaExtractor::new(256, 44100, FeatureType::Chroma).unwrap();
        let err = extractor.extract(&[0.0; 100]).unwrap_err();
        assert!(matches!(err, RfDspError::WindowLengthMismatch { .. }));
    }
}
