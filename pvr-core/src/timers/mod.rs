//! Timer scheduler.
//!
//! [`Timer`] models one recording instruction; the [`TimerScheduler`]
//! owns the list, forwards changes to the owning client adapter, matches
//! timers to guide entries by midpoint and answers next-to-fire queries.

mod scheduler;
mod timer;

pub use scheduler::{TimerError, TimerScheduler};
pub use timer::{weekday_bit, Timer, TimerMargins};
