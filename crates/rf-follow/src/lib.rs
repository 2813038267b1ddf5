//! rf-follow: the Online Time Warping alignment engine and its session
//! driver.
//!
//! ## Modules
//! - `matrix` — the windowed accumulated-cost (`D`) and path-length (`L`)
//!   buffers, shifted in place rather than reallocated.
//! - `direction` — the engine's three-state advancement direction.
//! - `engine` — [`OltwEngine`], the incremental DTW alignment itself.
//! - `position` — [`PositionStore`], the cross-thread session-position
//!   hand-off.
//! - `driver` — [`Session`], which ties one audio source, engine, and the
//!   position store together with RAII cancellation.
//! - `error` — `FollowError`, the crate's `thiserror` enum.

pub mod direction;
pub mod driver;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod position;

pub use direction::Direction;
pub use driver::{FollowOutcome, PositionMapper, Session};
pub use engine::{FollowConfig, LocalCost, OltwEngine, StepOutcome};
pub use error::{FollowError, FollowResult};
pub use position::{PositionStore, SessionId};
