use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::Condition;
use super::task::{Task, UpstreamLock};

/// Spec for one revision of a configuration package.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cache.example.com",
    version = "v1alpha1",
    kind = "PackageRevision",
    plural = "packagerevisions",
    namespaced,
    status = "PackageRevisionStatus",
    shortname = "pr",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Package","type":"string","jsonPath":".spec.packageName"}"#,
    printcolumn = r#"{"name":"Revision","type":"integer","jsonPath":".spec.revision"}"#,
    printcolumn = r#"{"name":"Lifecycle","type":"string","jsonPath":".spec.lifecycle"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevisionSpec {
    /// Identifies the package in the repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package_name: String,

    /// Name of the Repository object containing this package.
    #[serde(rename = "repository", default, skip_serializing_if = "String::is_empty")]
    pub repository_name: String,

    /// Short, unique description of the changes contained in this revision.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace_name: String,

    /// Version of the package. -1 marks a placeholder revision.
    #[serde(default)]
    #[schemars(schema_with = "revision_schema")]
    pub revision: i64,

    /// Package that provides resources to this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentReference>,

    #[serde(default)]
    pub lifecycle: PackageRevisionLifecycle,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readiness_gates: Vec<ReadinessGate>,
}

/// `revision` is an integer with a lower bound of -1.
fn revision_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
    let mut schema = <i64 as JsonSchema>::json_schema(gen).into_object();
    schema.number().minimum = Some(-1.0);
    schema.into()
}

/// Observed state of a PackageRevision.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevisionStatus {
    /// Upstream data for this package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_lock: Option<UpstreamLock>,

    /// Identity of the user who approved the revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_by: Option<String>,

    /// When the revision was approved.
    #[serde(rename = "publishTimestamp", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// True for a deployment package (in a deployment repository).
    #[serde(default)]
    pub deployment: bool,

    /// Status conditions, keyed by type.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Reference to a parent package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParentReference {
    /// Name of the parent PackageRevision.
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessGate {
    #[serde(default)]
    pub condition_type: String,
}

/// Lifecycle stage of a package revision: Draft, Proposed, Published or
/// DeletionProposed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PackageRevisionLifecycle {
    #[default]
    Draft,
    Proposed,
    Published,
    DeletionProposed,
}

impl PackageRevisionLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageRevisionLifecycle::Draft => "Draft",
            PackageRevisionLifecycle::Proposed => "Proposed",
            PackageRevisionLifecycle::Published => "Published",
            PackageRevisionLifecycle::DeletionProposed => "DeletionProposed",
        }
    }
}

impl std::fmt::Display for PackageRevisionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PackageRevision {
    /// Status conditions, empty when no status has been written yet.
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
