//! # shiftminus scheduler
//!
//! Everything that decides what to say and when to say it.
//!
//! ## Architecture
//! ```text
//! NotifyJob::run(today)
//!   ├── DeadlineBoard::reminder_check  → deadline channel (day 3/2/1)
//!   ├── delete shortfalls before today
//!   ├── shortfalls_from(today) → split by Department
//!   └── compose_alert (UrgencyWindow) → department channel
//!
//! Desk (manual)
//!   ├── register / fill / open_for
//!   ├── send_notice → compose_notice → department channel
//!   └── deadline / set_deadline / announce_deadline
//! ```

pub mod compose;
pub mod deadline;
pub mod desk;
pub mod job;
pub mod reminder;
pub mod services;
pub mod urgency;

#[cfg(test)]
mod testing;

pub use deadline::{DeadlineBoard, DeadlineState, Reminder};
pub use desk::{Desk, FillOutcome};
pub use job::{JobReport, NotifyJob};
pub use services::Services;
pub use urgency::UrgencyWindow;
