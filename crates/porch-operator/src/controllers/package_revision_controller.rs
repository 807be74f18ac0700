use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::events::Recorder;
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::conditions::set_status_condition;
use crate::constants::conditions::{
    REASON_FINALIZING, REASON_INVALID_SPEC, REASON_RECONCILING, STATUS_FALSE, STATUS_TRUE,
    STATUS_UNKNOWN, TYPE_AVAILABLE, TYPE_DEGRADED,
};
use crate::constants::{defaults, CONTROLLER_NAME, FINALIZER};
use crate::crds::{Condition, PackageRevision};
use crate::error::{OperatorError, Result};
use crate::metrics::ReconcileOutcome;
use crate::validation::{self, ValidationErrors};
use crate::{events, labels, metrics};

/// Tunables for the PackageRevision controller.
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Maximum number of concurrent reconciles.
    pub concurrency: u16,
    /// Requeue interval for a successfully reconciled object.
    pub requeue_after: Duration,
    /// Event reporter instance, typically the pod name.
    pub instance: Option<String>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            concurrency: defaults::MAX_CONCURRENT_RECONCILES,
            requeue_after: Duration::from_secs(defaults::REQUEUE_AFTER_SECS),
            instance: None,
        }
    }
}

/// Shared context for the PackageRevision reconciler.
pub struct Context {
    pub client: Client,
    pub recorder: Recorder,
    pub settings: ControllerSettings,
}

impl Context {
    pub fn new(client: Client, settings: ControllerSettings) -> Self {
        let recorder = events::recorder(client.clone(), settings.instance.clone());
        Self {
            client,
            recorder,
            settings,
        }
    }
}

/// Start the PackageRevision controller. Returns when a shutdown signal arrives.
pub async fn run(client: Client, settings: ControllerSettings) -> Result<()> {
    let api: Api<PackageRevision> = Api::all(client.clone());
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("PackageRevision CRD is not queryable: {e}. Is the CRD installed?");
        return Err(e.into());
    }

    match labels::image_for_package_revision() {
        Ok(image) => info!(%image, "Operand image configured"),
        Err(e) => warn!("{e}"),
    }
    debug!(labels = ?labels::labels_for_package_revision(), "Managed resource labels");

    let deployments: Api<Deployment> = Api::all(client.clone());
    let owned = watcher::Config::default().labels(&labels::managed_by_selector());
    let config = controller::Config::default().concurrency(settings.concurrency);
    let ctx = Arc::new(Context::new(client, settings));

    info!(
        controller = CONTROLLER_NAME,
        concurrency = ctx.settings.concurrency,
        "Starting PackageRevision controller"
    );
    metrics::set_ready(true);

    Controller::new(api, watcher::Config::default())
        .owns(deployments, owned)
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _action)) => debug!(name = %obj.name, "Reconciled PackageRevision"),
                Err(e) => warn!("PackageRevision reconciliation error: {e}"),
            }
        })
        .await;

    metrics::set_ready(false);
    info!("PackageRevision controller stopped");
    Ok(())
}

/// Reconcile a single PackageRevision.
pub async fn reconcile(pr: Arc<PackageRevision>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let name = pr.name_any();

    let (outcome, result) = match reconcile_inner(pr, &ctx).await {
        Ok(action) => (ReconcileOutcome::Success, Ok(action)),
        Err(e) if e.is_not_found() => {
            info!(%name, "PackageRevision resource not found. Ignoring since object must be deleted");
            (ReconcileOutcome::NotFound, Ok(Action::await_change()))
        }
        Err(e) => (ReconcileOutcome::Error, Err(e)),
    };

    metrics::record_reconciliation(outcome, start.elapsed());
    result
}

async fn reconcile_inner(pr: Arc<PackageRevision>, ctx: &Context) -> Result<Action> {
    let namespace = pr.namespace().unwrap_or_else(|| "default".into());
    let api: Api<PackageRevision> = Api::namespaced(ctx.client.clone(), &namespace);

    let pr = if pr.conditions().is_empty() {
        match patch_condition(&api, &pr, starting(&pr)).await? {
            Some(updated) => Arc::new(updated),
            None => pr,
        }
    } else {
        pr
    };

    finalizer(&api, FINALIZER, pr, |event| async {
        match event {
            Finalizer::Apply(pr) => apply(&api, &pr, ctx).await,
            Finalizer::Cleanup(pr) => cleanup(&api, &pr, ctx).await,
        }
    })
    .await
    .map_err(OperatorError::from)
}

async fn apply(api: &Api<PackageRevision>, pr: &PackageRevision, ctx: &Context) -> Result<Action> {
    let name = pr.name_any();

    if let Err(errors) = validation::validate(&pr.spec) {
        warn!(%name, %errors, "PackageRevision spec is invalid");
        if patch_condition(api, pr, invalid(pr, &errors)).await?.is_some() {
            events::publish(&ctx.recorder, pr, &events::invalid_spec(&errors)).await;
        }
        return Ok(Action::await_change());
    }

    info!(
        %name,
        lifecycle = %pr.spec.lifecycle,
        package = %pr.spec.package_name,
        revision = pr.spec.revision,
        "Reconciling PackageRevision"
    );
    patch_condition(api, pr, available(pr)).await?;

    Ok(Action::requeue(ctx.settings.requeue_after))
}

async fn cleanup(api: &Api<PackageRevision>, pr: &PackageRevision, ctx: &Context) -> Result<Action> {
    info!(name = %pr.name_any(), "Performing finalizer operations for PackageRevision");

    let updated = patch_condition(api, pr, finalizing(pr)).await?;
    let pr = updated.as_ref().unwrap_or(pr);
    events::publish(&ctx.recorder, pr, &events::deleting(pr)).await;
    patch_condition(api, pr, finalized(pr)).await?;

    Ok(Action::await_change())
}

/// Set `condition` on the status of `pr`.
///
/// Returns the object as stored, or None when the condition was already
/// current and nothing was sent. The patch carries the observed
/// resourceVersion, so a write based on a stale object fails with a conflict
/// instead of replacing conditions set by other writers.
async fn patch_condition(
    api: &Api<PackageRevision>,
    pr: &PackageRevision,
    condition: Condition,
) -> Result<Option<PackageRevision>> {
    let mut conditions = pr.conditions().to_vec();
    if !set_status_condition(&mut conditions, condition.clone()) {
        return Ok(None);
    }

    let patch = status_patch(pr, &conditions)?;
    let updated = api
        .patch_status(
            &pr.name_any(),
            &PatchParams::apply(CONTROLLER_NAME),
            &Patch::Merge(&patch),
        )
        .await?;
    metrics::record_condition_write(&condition);
    Ok(Some(updated))
}

fn status_patch(pr: &PackageRevision, conditions: &[Condition]) -> Result<serde_json::Value> {
    let mut patch = serde_json::json!({
        "status": { "conditions": serde_json::to_value(conditions)? }
    });
    if let Some(resource_version) = pr.resource_version() {
        patch["metadata"] = serde_json::json!({ "resourceVersion": resource_version });
    }
    Ok(patch)
}

fn condition(pr: &PackageRevision, type_: &str, status: &str, reason: &str, message: String) -> Condition {
    Condition::new(type_, status, reason, message).with_observed_generation(pr.metadata.generation)
}

fn starting(pr: &PackageRevision) -> Condition {
    condition(
        pr,
        TYPE_AVAILABLE,
        STATUS_UNKNOWN,
        REASON_RECONCILING,
        "Starting reconciliation".into(),
    )
}

fn available(pr: &PackageRevision) -> Condition {
    condition(
        pr,
        TYPE_AVAILABLE,
        STATUS_TRUE,
        REASON_RECONCILING,
        format!(
            "Deployment for custom resource ({}) with {} lifecycle successful",
            pr.name_any(),
            pr.spec.lifecycle
        ),
    )
}

fn invalid(pr: &PackageRevision, errors: &ValidationErrors) -> Condition {
    condition(
        pr,
        TYPE_AVAILABLE,
        STATUS_FALSE,
        REASON_INVALID_SPEC,
        format!("Invalid spec: {errors}"),
    )
}

fn finalizing(pr: &PackageRevision) -> Condition {
    condition(
        pr,
        TYPE_DEGRADED,
        STATUS_UNKNOWN,
        REASON_FINALIZING,
        format!(
            "Performing finalizer operations for the custom resource: {} ",
            pr.name_any()
        ),
    )
}

fn finalized(pr: &PackageRevision) -> Condition {
    condition(
        pr,
        TYPE_DEGRADED,
        STATUS_TRUE,
        REASON_FINALIZING,
        format!(
            "Finalizer operations for custom resource {} name were successfully accomplished",
            pr.name_any()
        ),
    )
}

/// Error policy.
pub fn error_policy(pr: Arc<PackageRevision>, error: &OperatorError, _ctx: Arc<Context>) -> Action {
    warn!(name = %pr.name_any(), "PackageRevision reconciliation error: {error}");
    if error.is_transient() {
        Action::requeue(Duration::from_secs(defaults::REQUEUE_TRANSIENT_ERROR_SECS))
    } else {
        Action::requeue(Duration::from_secs(defaults::REQUEUE_PERMANENT_ERROR_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{PackageRevisionLifecycle, PackageRevisionSpec, ParentReference};

    fn package_revision() -> PackageRevision {
        let mut pr = PackageRevision::new(
            "blueprints-bucket-v1",
            PackageRevisionSpec {
                package_name: "bucket".into(),
                repository_name: "blueprints".into(),
                lifecycle: PackageRevisionLifecycle::Published,
                ..Default::default()
            },
        );
        pr.metadata.namespace = Some("porch-demo".into());
        pr.metadata.generation = Some(4);
        pr
    }

    #[test]
    fn test_starting_condition() {
        let cond = starting(&package_revision());
        assert_eq!(cond.type_, "Available");
        assert_eq!(cond.status, "Unknown");
        assert_eq!(cond.reason, "Reconciling");
        assert_eq!(cond.message, "Starting reconciliation");
        assert_eq!(cond.observed_generation, Some(4));
    }

    #[test]
    fn test_available_condition_names_lifecycle() {
        let cond = available(&package_revision());
        assert_eq!(cond.status, "True");
        assert_eq!(
            cond.message,
            "Deployment for custom resource (blueprints-bucket-v1) with Published lifecycle successful"
        );
    }

    #[test]
    fn test_finalizer_conditions() {
        let pr = package_revision();

        let cond = finalizing(&pr);
        assert_eq!(cond.type_, "Degraded");
        assert_eq!(cond.status, "Unknown");
        assert_eq!(cond.reason, "Finalizing");
        assert_eq!(
            cond.message,
            "Performing finalizer operations for the custom resource: blueprints-bucket-v1 "
        );

        let cond = finalized(&pr);
        assert_eq!(cond.status, "True");
        assert_eq!(
            cond.message,
            "Finalizer operations for custom resource blueprints-bucket-v1 name were successfully accomplished"
        );
    }

    #[test]
    fn test_invalid_condition_lists_violations() {
        let mut pr = package_revision();
        pr.spec.parent = Some(ParentReference { name: String::new() });
        let errors = validation::validate(&pr.spec).unwrap_err();

        let cond = invalid(&pr, &errors);
        assert_eq!(cond.type_, "Available");
        assert_eq!(cond.status, "False");
        assert_eq!(cond.reason, "InvalidSpec");
        assert_eq!(cond.message, "Invalid spec: spec.parent.name: must not be empty");
    }

    #[test]
    fn test_status_patch_pins_resource_version() {
        let mut pr = package_revision();
        let conditions = vec![starting(&pr)];

        let patch = status_patch(&pr, &conditions).unwrap();
        assert!(patch.get("metadata").is_none());
        assert_eq!(patch["status"]["conditions"][0]["type"], "Available");

        pr.metadata.resource_version = Some("42".into());
        let patch = status_patch(&pr, &conditions).unwrap();
        assert_eq!(patch["metadata"]["resourceVersion"], "42");
    }

    #[test]
    fn test_default_settings() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.requeue_after, Duration::from_secs(300));
    }
}
