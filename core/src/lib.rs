//! Domain model for Grove: adopted trees, their lifecycle, and the
//! carbon-offset accounting derived from it.
//!
//! Nothing in this crate performs I/O. Persistence, HTTP and text
//! generation live in `grove-daemon`.

pub mod clock;
pub mod error;
pub mod growth;
pub mod leaderboard;
pub mod models;
pub mod prompt;
pub mod suggest;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{GroveError, GroveResult};
