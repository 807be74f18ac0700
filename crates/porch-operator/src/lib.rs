//! PackageRevision Kubernetes operator.
//!
//! Watches `PackageRevision` custom resources, reports their state through
//! status conditions and events, and runs finalizer cleanup on deletion.

pub mod conditions;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod crds;
pub mod error;
pub mod events;
pub mod labels;
pub mod leader_election;
pub mod metrics;
pub mod telemetry;
pub mod validation;

pub use crds::PackageRevision;
pub use error::{OperatorError, Result};
