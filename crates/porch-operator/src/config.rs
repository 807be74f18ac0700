//! Command-line and environment configuration for the operator.

use std::time::Duration;

use clap::Parser;

use crate::constants::defaults;
use crate::controllers::ControllerSettings;
use crate::error::{OperatorError, Result};
use crate::leader_election::{self, LeaderElectionConfig};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "porch-operator",
    about = "Kubernetes operator for PackageRevision resources",
    version
)]
pub struct OperatorConfig {
    /// Address the metrics and health endpoints bind to ("0" disables them)
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = defaults::METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Enable leader election so only one replica reconciles at a time
    #[arg(long, env = "LEADER_ELECT", default_value_t = false)]
    pub leader_elect: bool,

    /// Name of the Lease used for leader election
    #[arg(long, env = "LEASE_NAME", default_value = defaults::LEASE_NAME)]
    pub lease_name: String,

    /// Namespace of the Lease (defaults to the pod namespace, then "default")
    #[arg(long, env = "POD_NAMESPACE")]
    pub lease_namespace: Option<String>,

    /// Maximum number of PackageRevisions reconciled concurrently
    #[arg(long, env = "MAX_CONCURRENT_RECONCILES", default_value_t = defaults::MAX_CONCURRENT_RECONCILES)]
    pub max_concurrent_reconciles: u16,

    /// Seconds between reconciliations of a healthy PackageRevision
    #[arg(long, env = "REQUEUE_AFTER_SECS", default_value_t = defaults::REQUEUE_AFTER_SECS)]
    pub requeue_after_secs: u64,

    /// Install or update the PackageRevision CRD at startup
    #[arg(long, env = "INSTALL_CRDS", default_value_t = false)]
    pub install_crds: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(short = 'l', long, env = "LOG_LEVEL", default_value = defaults::LOG_LEVEL)]
    pub log_level: String,
}

impl OperatorConfig {
    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_reconciles == 0 {
            return Err(OperatorError::Config(
                "--max-concurrent-reconciles must be at least 1".into(),
            ));
        }
        if self.requeue_after_secs == 0 {
            return Err(OperatorError::Config(
                "--requeue-after-secs must be at least 1".into(),
            ));
        }
        if self.lease_name.is_empty() {
            return Err(OperatorError::Config("--lease-name must not be empty".into()));
        }
        Ok(())
    }

    /// Metrics server address, or None when disabled.
    pub fn metrics_addr(&self) -> Option<String> {
        match self.metrics_bind_address.trim() {
            "" | "0" => None,
            addr => Some(addr.to_string()),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            concurrency: self.max_concurrent_reconciles,
            requeue_after: Duration::from_secs(self.requeue_after_secs),
            instance: std::env::var("POD_NAME").ok(),
        }
    }

    pub fn leader_election(&self) -> LeaderElectionConfig {
        LeaderElectionConfig {
            lease_name: self.lease_name.clone(),
            namespace: self
                .lease_namespace
                .clone()
                .unwrap_or_else(|| "default".into()),
            holder_id: leader_election::holder_identity(),
            lease_duration_secs: defaults::LEASE_DURATION_SECS,
            renew_interval_secs: defaults::LEASE_RENEW_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OperatorConfig {
        let mut argv = vec!["porch-operator"];
        argv.extend_from_slice(args);
        OperatorConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--metrics-bind-address",
            "127.0.0.1:9090",
            "--leader-elect",
            "--lease-name",
            "porch-leader",
            "--lease-namespace",
            "porch-system",
            "--max-concurrent-reconciles",
            "8",
            "--requeue-after-secs",
            "60",
            "--install-crds",
            "--log-level",
            "debug",
        ]);
        assert_eq!(config.metrics_addr().as_deref(), Some("127.0.0.1:9090"));
        assert!(config.leader_elect);
        assert!(config.install_crds);
        assert_eq!(config.log_level, "debug");

        let settings = config.controller_settings();
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.requeue_after, Duration::from_secs(60));

        let lease = config.leader_election();
        assert_eq!(lease.lease_name, "porch-leader");
        assert_eq!(lease.namespace, "porch-system");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_can_be_disabled() {
        let config = parse(&["--metrics-bind-address", "0"]);
        assert_eq!(config.metrics_addr(), None);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = parse(&["--max-concurrent-reconciles", "0"]);
        assert!(matches!(config.validate(), Err(OperatorError::Config(_))));
    }

    #[test]
    fn test_zero_requeue_rejected() {
        let config = parse(&["--requeue-after-secs", "0"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("--requeue-after-secs"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(OperatorConfig::try_parse_from(["porch-operator", "--kafka-port", "9092"]).is_err());
    }
}
