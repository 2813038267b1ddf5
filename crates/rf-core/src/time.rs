//! Frame-indexed time types shared by the feature pipeline and the engine.

use serde::{Deserialize, Serialize};

/// An index into a feature sequence (reference or input), one per frame at
/// `frame_rate`. Distinct from a raw sample count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::ops::Add<u32> for FrameIndex {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::Sub for FrameIndex {
    type Output = u32;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl From<usize> for FrameIndex {
    fn from(value: usize) -> Self {
        Self(value as u32)
    }
}
