//! Small shared helpers: time sources and key hashing.

pub mod clock;
pub mod hash;

pub use clock::{Clock, ManualClock, SystemClock};
pub use hash::hash_url;
