//! Typed job parameters for distributed training submissions.
//!
//! A job is described by a [`JobParameters`] value: one variant per training
//! framework, each carrying the settings needed to build the cluster job.
//! Values for resources, localizations and configuration overrides use the
//! same textual syntax as the submission command line.

mod error;
mod framework;
mod params;
mod parser;

pub use error::ParamError;
pub use framework::Framework;
pub use params::{CommonParameters, JobParameters, PyTorchParameters, TensorFlowParameters};
pub use parser::{ConfPair, Localization, LocalizationMode, Resource};
