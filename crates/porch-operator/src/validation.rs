//! Runtime checks for PackageRevision specs.
//!
//! The CRD schema cannot express the tagged-union rules of `Task` and
//! `UpstreamPackage`, so the reconciler checks them here and reports every
//! violation on the resource status.

use thiserror::Error;

use crate::crds::{
    PackageRevisionRef, PackageRevisionSpec, RepositoryType, Task, TaskType, UpstreamPackage,
};

/// A single violation, addressed by its field path.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// All violations found in a spec.
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a PackageRevision spec.
pub fn validate(spec: &PackageRevisionSpec) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if spec.revision < -1 {
        errors.push("spec.revision", format!("must be >= -1, got {}", spec.revision));
    }

    if let Some(parent) = &spec.parent {
        if parent.name.is_empty() {
            errors.push("spec.parent.name", "must not be empty");
        }
    }

    for (i, task) in spec.tasks.iter().enumerate() {
        validate_task(task, &format!("spec.tasks[{i}]"), &mut errors);
    }

    for (i, gate) in spec.readiness_gates.iter().enumerate() {
        if gate.condition_type.is_empty() {
            errors.push(
                format!("spec.readinessGates[{i}].conditionType"),
                "must not be empty",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_task(task: &Task, path: &str, errors: &mut ValidationErrors) {
    let populated = task.populated();

    if !populated.contains(&task.type_) {
        errors.push(
            format!("{path}.{}", task.type_),
            format!("required for task type {}", task.type_),
        );
    }

    for other in populated.iter().filter(|t| **t != task.type_) {
        errors.push(
            format!("{path}.{other}"),
            format!("must be unset for task type {}", task.type_),
        );
    }

    match task.type_ {
        TaskType::Init => {}
        TaskType::Clone => {
            if let Some(clone) = &task.clone {
                validate_upstream(&clone.upstream, &format!("{path}.clone.upstreamRef"), errors);
            }
        }
        TaskType::Edit => {
            if let Some(source) = task.edit.as_ref().and_then(|e| e.source.as_ref()) {
                validate_ref(source, &format!("{path}.edit.sourceRef"), errors);
            }
        }
        TaskType::Upgrade => {
            if let Some(upgrade) = &task.upgrade {
                validate_ref(&upgrade.old_upstream, &format!("{path}.upgrade.oldUpstreamRef"), errors);
                validate_ref(&upgrade.new_upstream, &format!("{path}.upgrade.newUpstreamRef"), errors);
                validate_ref(
                    &upgrade.local_package_revision_ref,
                    &format!("{path}.upgrade.localPackageRevisionRef"),
                    errors,
                );
            }
        }
    }
}

fn validate_upstream(upstream: &UpstreamPackage, path: &str, errors: &mut ValidationErrors) {
    match upstream.type_ {
        Some(RepositoryType::Git) => match &upstream.git {
            Some(git) => {
                if git.repo.is_empty() {
                    errors.push(format!("{path}.git.repo"), "must not be empty");
                }
                if git.ref_.is_empty() {
                    errors.push(format!("{path}.git.ref"), "must not be empty");
                }
            }
            None => errors.push(format!("{path}.git"), "required when type is git"),
        },
        Some(RepositoryType::Oci) => match &upstream.oci {
            Some(oci) if oci.image.is_empty() => {
                errors.push(format!("{path}.oci.image"), "must not be empty")
            }
            Some(_) => {}
            None => errors.push(format!("{path}.oci"), "required when type is oci"),
        },
        None => match &upstream.upstream_ref {
            Some(r) => validate_ref(r, &format!("{path}.upstreamRef"), errors),
            None => errors.push(
                format!("{path}.upstreamRef"),
                "required when type is unset",
            ),
        },
    }

    if upstream.type_ != Some(RepositoryType::Git) && upstream.git.is_some() {
        errors.push(format!("{path}.git"), "must be unset unless type is git");
    }
    if upstream.type_ != Some(RepositoryType::Oci) && upstream.oci.is_some() {
        errors.push(format!("{path}.oci"), "must be unset unless type is oci");
    }
}

fn validate_ref(r: &PackageRevisionRef, path: &str, errors: &mut ValidationErrors) {
    if r.name.is_empty() {
        errors.push(format!("{path}.name"), "must not be empty");
    }
}
