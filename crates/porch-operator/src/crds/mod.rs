pub mod common;
pub mod package_revision;
pub mod task;

pub use common::{Condition, SecretRef};
pub use package_revision::{
    PackageRevision, PackageRevisionLifecycle, PackageRevisionSpec, PackageRevisionStatus,
    ParentReference, ReadinessGate,
};
pub use task::{
    GitLock, GitPackage, OciPackage, PackageCloneTaskSpec, PackageEditTaskSpec,
    PackageInitTaskSpec, PackageMergeStrategy, PackageRevisionRef, PackageUpgradeTaskSpec,
    RepositoryType, Task, TaskType, UpstreamLock, UpstreamPackage,
};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};
use tracing::info;

use crate::constants::CONTROLLER_NAME;
use crate::error::Result;

/// List of PackageRevisions as returned by the API server.
pub type PackageRevisionList = kube::core::ObjectList<PackageRevision>;

/// Render the PackageRevision CRD as YAML.
pub fn crd_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&PackageRevision::crd())?)
}

/// Create or update the PackageRevision CRD with server-side apply.
pub async fn install_crds(client: Client) -> Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let crd = PackageRevision::crd();
    let name = PackageRevision::crd_name();

    info!(crd = %name, "Installing CRD");
    crds.patch(
        name,
        &PatchParams::apply(CONTROLLER_NAME).force(),
        &Patch::Apply(&crd),
    )
    .await?;

    Ok(())
}
