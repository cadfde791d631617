//! # nback
//!
//! Turn sequencing and match validation for a multi-box dual n-back exercise.
//!
//! On every turn one cell lights up inside each box. The player judges, for a
//! chosen box, whether the current cell equals the one shown exactly `n` turns
//! earlier in that same box.
//!
//! ## Quick Start
//!
//! ```
//! use nback::prelude::*;
//!
//! let mut session = Session::with_seed(Settings::default(), 7);
//! session.start_session(None).unwrap();
//! session.next_turn().unwrap();
//!
//! // Too early for a 2-back judgement: refused, not an error.
//! assert!(session.respond(0).is_refused());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serde derives and the settings token codec
//! - `clock` (default): tokio-driven session clock
//!
//! ## Modules
//!
//! - [`settings`]: Settings record, defaults and validation
//! - `codec`: Opaque settings token encode/decode
//! - [`grid`]: Box/cell addressing
//! - [`engine`]: Stimulus generation and history
//! - [`validator`]: The n-back match rule
//! - [`session`]: Explicit session object tying the above together
//! - `clock`: Periodic ticking and flash timing

#[path = "core/error.rs"]
pub mod error;

#[path = "core/settings.rs"]
pub mod settings;

#[cfg(feature = "serde")]
#[path = "core/codec.rs"]
pub mod codec;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/engine.rs"]
pub mod engine;

#[path = "core/validator.rs"]
pub mod validator;

#[path = "core/stats.rs"]
pub mod stats;

#[path = "core/keymap.rs"]
pub mod keymap;

#[path = "core/session.rs"]
pub mod session;

#[cfg(feature = "clock")]
#[path = "core/clock.rs"]
pub mod clock;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
///
/// ```
/// use nback::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "clock")]
    pub use crate::clock::{SessionClock, SessionEvent};
    pub use crate::engine::{CellSource, History, SequenceEngine, StimulusFrame};
    pub use crate::error::{Error, Result};
    pub use crate::grid::GridShape;
    pub use crate::prng::Prng;
    pub use crate::session::{Session, Verdict};
    pub use crate::settings::{Settings, ThemePreset};
    pub use crate::stats::SessionStats;
}
