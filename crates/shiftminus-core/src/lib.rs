//! # shiftminus core
//! Configuration, error type, domain types and the traits the store and
//! messaging clients implement.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ShiftConfig;
pub use error::{Result, ShiftError};
pub use traits::{DeadlineStore, Messenger, ShortfallStore};
pub use types::{
    DeadlineRecord, Delivery, Department, NewShortfall, PushTarget, ShortfallRecord,
};
