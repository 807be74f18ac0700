//! Task and upstream types carried by a PackageRevision.
//!
//! These types only describe how a package revision was produced. The
//! operator validates their shape but does not execute any of them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::SecretRef;

/// A single step in the history of a package revision.
///
/// Exactly one of the task specs must be set, and it must match `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    #[serde(rename = "type")]
    pub type_: TaskType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<PackageInitTaskSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<PackageCloneTaskSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<PackageEditTaskSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<PackageUpgradeTaskSpec>,
}

impl Task {
    pub fn init(spec: PackageInitTaskSpec) -> Self {
        Self::empty(TaskType::Init).with(|t| t.init = Some(spec))
    }

    pub fn clone_package(spec: PackageCloneTaskSpec) -> Self {
        Self::empty(TaskType::Clone).with(|t| t.clone = Some(spec))
    }

    pub fn edit(spec: PackageEditTaskSpec) -> Self {
        Self::empty(TaskType::Edit).with(|t| t.edit = Some(spec))
    }

    pub fn upgrade(spec: PackageUpgradeTaskSpec) -> Self {
        Self::empty(TaskType::Upgrade).with(|t| t.upgrade = Some(spec))
    }

    fn empty(type_: TaskType) -> Self {
        Self {
            type_,
            init: None,
            clone: None,
            edit: None,
            upgrade: None,
        }
    }

    fn with(mut self, f: impl FnOnce(&mut Self)) -> Self {
        f(&mut self);
        self
    }

    /// Task types whose spec field is populated.
    pub fn populated(&self) -> Vec<TaskType> {
        let mut out = Vec::new();
        if self.init.is_some() {
            out.push(TaskType::Init);
        }
        if self.clone.is_some() {
            out.push(TaskType::Clone);
        }
        if self.edit.is_some() {
            out.push(TaskType::Edit);
        }
        if self.upgrade.is_some() {
            out.push(TaskType::Upgrade);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Init,
    Clone,
    Edit,
    Upgrade,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Init => "init",
            TaskType::Clone => "clone",
            TaskType::Edit => "edit",
            TaskType::Upgrade => "upgrade",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initializes a new package or subpackage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageInitTaskSpec {
    /// Directory path to a subpackage to initialize. The main package is
    /// initialized when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpackage: Option<String>,

    /// Short description of the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Keywords describing the package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Link to a page with information about the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

/// Clones an upstream package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageCloneTaskSpec {
    /// Reference to the upstream package to clone.
    #[serde(rename = "upstreamRef", default)]
    pub upstream: UpstreamPackage,

    /// Strategy used to update the package.
    #[serde(default)]
    pub strategy: PackageMergeStrategy,
}

/// Upgrades a local package from one upstream revision to another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpgradeTaskSpec {
    /// Original upstream revision: the common ancestor of the local package
    /// and the new upstream revision.
    #[serde(rename = "oldUpstreamRef", default)]
    pub old_upstream: PackageRevisionRef,

    /// Upstream revision the local package is upgraded to.
    #[serde(rename = "newUpstreamRef", default)]
    pub new_upstream: PackageRevisionRef,

    /// Local revision holding the changes made on top of `oldUpstreamRef`.
    #[serde(default)]
    pub local_package_revision_ref: PackageRevisionRef,

    /// Strategy used to update the package.
    #[serde(default)]
    pub strategy: PackageMergeStrategy,
}

/// Edits a package, optionally starting from another revision.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageEditTaskSpec {
    #[serde(rename = "sourceRef", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PackageRevisionRef>,
}

/// Upstream package source: a Git or OCI location, or another registered
/// package revision.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamPackage {
    /// Type of the repository. When unset, `upstreamRef` is used.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<RepositoryType>,

    /// Required if `type` is `git`, unset otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitPackage>,

    /// Required if `type` is `oci`, unset otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci: Option<OciPackage>,

    /// Package from a registered repository rather than an external location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_ref: Option<PackageRevisionRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    Git,
    Oci,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitPackage {
    /// Address of the Git repository, e.g.
    /// `https://github.com/GoogleCloudPlatform/blueprints.git`.
    pub repo: String,

    /// Branch, tag, or commit SHA containing the package.
    #[serde(rename = "ref")]
    pub ref_: String,

    /// Directory within the repository where packages are stored.
    pub directory: String,

    /// Secret holding authentication credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
}

/// Package stored in a registry compatible with the OCI standard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OciPackage {
    /// Address of the OCI image.
    pub image: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackageRevisionRef {
    /// Name of the referenced PackageRevision resource.
    pub name: String,
}

/// Policy for reconciling local edits against upstream changes.
///
/// * `resource-merge`: structural comparison of the original and updated
///   resources, merged into the local package.
/// * `fast-forward`: fail without updating if the local package was modified
///   since it was fetched.
/// * `force-delete-replace`: wipe local changes and replace them with the
///   remote version.
/// * `copy-merge`: copy all remote changes into the local package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PackageMergeStrategy {
    #[default]
    ResourceMerge,
    FastForward,
    ForceDeleteReplace,
    CopyMerge,
}

/// Resolved upstream data for a package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpstreamLock {
    /// Type of origin.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Resolved locator for a package on Git.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitLock>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GitLock {
    /// Repository that was fetched, e.g. `https://github.com/kubernetes/examples.git`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Subdirectory that was fetched, e.g. `staging/cockroachdb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Branch, tag, or commit SHA that was fetched.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,

    /// Commit SHA of the last fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}
