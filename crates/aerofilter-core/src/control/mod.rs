//! Control consuming the estimated belief
//!
//! - Altitude PID controller producing a vertical acceleration command

pub mod pid;

pub use pid::*;
