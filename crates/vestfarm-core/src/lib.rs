//! # vestfarm-core
//! Foundation types and traits for Vestfarm reward farms.

pub mod clock;
pub mod constants;
pub mod custody;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
