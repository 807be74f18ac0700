pub mod package_revision_controller;

pub use package_revision_controller::{error_policy, reconcile, run, Context, ControllerSettings};
