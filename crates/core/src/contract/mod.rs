//! Contract types shared by client and store
//!
//! - `cas`: Compare-and-swap token assigned to every document mutation
//! - `timestamp`: Microsecond timestamps used for last-modified and expiry

pub mod cas;
pub mod timestamp;

pub use cas::Cas;
pub use timestamp::Timestamp;
