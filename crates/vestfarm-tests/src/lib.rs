//! Scenario and adversarial test suite for Vestfarm.
//!
//! Integration tests drive a factory, its farms and in-memory custody
//! through full reward lifecycles, and try to break conservation and
//! atomicity from a hostile caller's side.

pub mod helpers;
