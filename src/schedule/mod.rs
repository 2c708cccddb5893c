//! Daily schedules and the time rules around them.
//!
//! Everything in here is pure: callers pass in the current time and get back
//! which slots are due, whether a participation window is still open and how
//! a streak moves. The scheduler and the participation service own all I/O.

pub mod progress;
pub mod templates;
pub mod window;

pub use progress::{next_streak, AchievementLevel};
pub use templates::{builtin_slots, due_slots, find_builtin_slot, ScheduleSlot, ScheduleType};
pub use window::ParticipationWindow;
