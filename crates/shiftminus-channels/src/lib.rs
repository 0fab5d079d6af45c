//! # shiftminus channels
//! Push messaging channels.

pub mod line;

pub use line::LineMessenger;
