//! Test helper modules for cowatch-client integration tests
//!
//! - Harness: a running synchronizer over a simulated player and a recording hub link

pub mod harness;

#[allow(unused_imports)]
pub use harness::{advance, snapshot, Harness, RecordingLink};
