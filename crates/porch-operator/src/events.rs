//! Kubernetes events emitted for PackageRevisions.

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, warn};

use crate::constants::{events, CONTROLLER_NAME};
use crate::crds::PackageRevision;
use crate::metrics;
use crate::validation::ValidationErrors;

/// Build a recorder reporting as this controller.
pub fn recorder(client: Client, instance: Option<String>) -> Recorder {
    let reporter = Reporter {
        controller: CONTROLLER_NAME.into(),
        instance,
    };
    Recorder::new(client, reporter)
}

/// Warning raised when a PackageRevision starts finalization.
pub fn deleting(pr: &PackageRevision) -> Event {
    Event {
        type_: EventType::Warning,
        reason: events::REASON_DELETING.into(),
        note: Some(format!(
            "Custom Resource {} is being deleted from the namespace {}",
            pr.name_any(),
            pr.namespace().unwrap_or_default()
        )),
        action: events::ACTION_FINALIZE.into(),
        secondary: None,
    }
}

/// Warning raised when a PackageRevision spec fails validation.
pub fn invalid_spec(errors: &ValidationErrors) -> Event {
    Event {
        type_: EventType::Warning,
        reason: events::REASON_INVALID_SPEC.into(),
        note: Some(errors.to_string()),
        action: events::ACTION_VALIDATE.into(),
        secondary: None,
    }
}

/// Publish an event for `pr`.
///
/// Failures are logged and swallowed: events never block reconciliation.
pub async fn publish(recorder: &Recorder, pr: &PackageRevision, event: &Event) {
    let reference = pr.object_ref(&());
    let published = match recorder.publish(event, &reference).await {
        Ok(()) => {
            debug!(name = %pr.name_any(), reason = %event.reason, "Published event");
            true
        }
        Err(e) => {
            warn!(name = %pr.name_any(), reason = %event.reason, "Failed to publish event: {e}");
            false
        }
    };
    metrics::record_event(&event.reason, published);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{PackageRevisionSpec, ParentReference};
    use crate::validation;

    fn package_revision() -> PackageRevision {
        let mut pr = PackageRevision::new("blueprints-bucket-v1", PackageRevisionSpec::default());
        pr.metadata.namespace = Some("porch-demo".into());
        pr
    }

    #[test]
    fn test_deleting_event() {
        let event = deleting(&package_revision());
        assert_eq!(event.type_, EventType::Warning);
        assert_eq!(event.reason, "Deleting");
        assert_eq!(
            event.note.as_deref(),
            Some("Custom Resource blueprints-bucket-v1 is being deleted from the namespace porch-demo")
        );
    }

    #[test]
    fn test_invalid_spec_event_lists_violations() {
        let spec = PackageRevisionSpec {
            parent: Some(ParentReference { name: String::new() }),
            ..Default::default()
        };
        let errors = validation::validate(&spec).unwrap_err();
        let event = invalid_spec(&errors);
        assert_eq!(event.reason, "InvalidSpec");
        assert_eq!(event.note.as_deref(), Some("spec.parent.name: must not be empty"));
    }
}
