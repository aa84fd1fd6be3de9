//! Mock Submission Client
//!
//! In-process stand-in for the cluster launcher, used by unit and
//! integration tests to exercise the coordinator's success, failure,
//! interrupt and teardown paths deterministically.

mod client;
mod failure;

pub use client::{Latch, MockClient, MockScript};
pub use failure::{FailureConfig, FailureInjector, MockOperation};
