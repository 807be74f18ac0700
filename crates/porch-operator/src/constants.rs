/// Kubernetes label keys following the app.kubernetes.io convention.
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    pub const VERSION: &str = "app.kubernetes.io/version";
}

/// Label values.
pub mod values {
    pub const APP_NAME: &str = "PackageRevision-operator";
    pub const MANAGED_BY: &str = "PackageRevisionController";
}

/// Status condition types, statuses and reasons.
pub mod conditions {
    /// Status of the reconciliation of the PackageRevision.
    pub const TYPE_AVAILABLE: &str = "Available";
    /// Used while the custom resource is being deleted and finalizer operations run.
    pub const TYPE_DEGRADED: &str = "Degraded";

    pub const STATUS_TRUE: &str = "True";
    pub const STATUS_FALSE: &str = "False";
    pub const STATUS_UNKNOWN: &str = "Unknown";

    pub const REASON_RECONCILING: &str = "Reconciling";
    pub const REASON_FINALIZING: &str = "Finalizing";
    pub const REASON_INVALID_SPEC: &str = "InvalidSpec";
}

/// Event reasons and actions.
pub mod events {
    pub const REASON_DELETING: &str = "Deleting";
    pub const REASON_INVALID_SPEC: &str = "InvalidSpec";
    pub const ACTION_FINALIZE: &str = "Finalize";
    pub const ACTION_VALIDATE: &str = "Validate";
}

/// Finalizer name for graceful cleanup.
pub const FINALIZER: &str = "cache.example.com/finalizer";

/// CRD API group.
pub const API_GROUP: &str = "cache.example.com";

/// Controller name, used as event reporter and field manager.
pub const CONTROLLER_NAME: &str = "packagerevision-controller";

/// Environment variable holding the operand image.
pub const IMAGE_ENV_VAR: &str = "PackageRevision_IMAGE";

/// Default operator settings.
pub mod defaults {
    pub const METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";
    pub const LEASE_NAME: &str = "porch-operator-leader";
    pub const LEASE_DURATION_SECS: i32 = 15;
    pub const LEASE_RENEW_INTERVAL_SECS: u64 = 5;
    pub const MAX_CONCURRENT_RECONCILES: u16 = 2;
    pub const LOG_LEVEL: &str = "info";

    /// Requeue intervals in seconds.
    pub const REQUEUE_AFTER_SECS: u64 = 300;
    pub const REQUEUE_TRANSIENT_ERROR_SECS: u64 = 15;
    pub const REQUEUE_PERMANENT_ERROR_SECS: u64 = 300;
}
