//! Core wallet primitives
//!
//! - Address, fingerprint and sequence id types
//! - The execution environment's clock

pub mod clock;
pub mod types;

pub use clock::{day_index, to_datetime, Clock, ManualClock, SystemClock, SECONDS_PER_DAY};
pub use types::{hex_bytes, Address, Amount, Fingerprint, FingerprintError, SequenceId};
