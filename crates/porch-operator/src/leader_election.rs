use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, error, info, warn};

use crate::constants::defaults;
use crate::metrics;

/// Annotation key for storing the renew epoch timestamp.
const ANNOTATION_RENEW_EPOCH: &str = "cache.example.com/renew-epoch";

/// How often waiters poll the shared leader flag.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for Lease-based leader election.
#[derive(Clone, Debug)]
pub struct LeaderElectionConfig {
    /// Name of the Lease object in Kubernetes.
    pub lease_name: String,
    /// Namespace where the Lease lives.
    pub namespace: String,
    /// Unique identity of this operator instance (typically the pod name).
    pub holder_id: String,
    /// How long the lease is valid before it expires (seconds).
    pub lease_duration_secs: i32,
    /// How often to attempt renewal (seconds). Should be ~1/3 of duration.
    pub renew_interval_secs: u64,
}

impl Default for LeaderElectionConfig {
    fn default() -> Self {
        let namespace = std::env::var("POD_NAMESPACE").unwrap_or_else(|_| "default".into());

        Self {
            lease_name: defaults::LEASE_NAME.into(),
            namespace,
            holder_id: holder_identity(),
            lease_duration_secs: defaults::LEASE_DURATION_SECS,
            renew_interval_secs: defaults::LEASE_RENEW_INTERVAL_SECS,
        }
    }
}

/// Identity of this process: the pod name, or a random id outside a cluster.
pub fn holder_identity() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| format!("porch-operator-{}", uuid::Uuid::new_v4()))
}

/// Shared leader status accessible from multiple tasks.
#[derive(Clone, Default)]
pub struct LeaderStatus {
    is_leader: Arc<AtomicBool>,
}

impl LeaderStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this instance currently holds leadership.
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::Relaxed)
    }

    /// Force this instance to be leader (used when leader election is disabled).
    pub fn force_leader(&self) {
        self.set_leader(true);
    }

    fn set_leader(&self, v: bool) {
        self.is_leader.store(v, Ordering::Relaxed);
        metrics::set_leader(v);
    }

    /// Resolves once this instance holds leadership.
    pub async fn acquired(&self) {
        while !self.is_leader() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Resolves once this instance no longer holds leadership.
    pub async fn lost(&self) {
        while self.is_leader() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Run the leader election loop. This function never returns normally.
pub async fn run(client: Client, config: LeaderElectionConfig, status: LeaderStatus) {
    let api: Api<Lease> = Api::namespaced(client, &config.namespace);

    loop {
        match try_acquire_or_renew(&api, &config).await {
            Ok(acquired) => {
                if acquired && !status.is_leader() {
                    info!(
                        holder = %config.holder_id,
                        lease = %config.lease_name,
                        "Acquired leadership"
                    );
                } else if !acquired && status.is_leader() {
                    warn!(holder = %config.holder_id, "Lost leadership");
                }
                status.set_leader(acquired);
            }
            Err(e) => {
                error!("Leader election error: {e}");
                status.set_leader(false);
            }
        }

        tokio::time::sleep(Duration::from_secs(config.renew_interval_secs)).await;
    }
}

/// Gracefully step down from leadership on shutdown.
pub async fn step_down(client: &Client, config: &LeaderElectionConfig) {
    let api: Api<Lease> = Api::namespaced(client.clone(), &config.namespace);

    match api.get(&config.lease_name).await {
        Ok(existing) => {
            if !is_held_by(&existing, &config.holder_id) {
                return;
            }
            let mut updated = existing.clone();
            if let Some(ref mut s) = updated.spec {
                s.holder_identity = None;
                s.lease_duration_seconds = Some(1);
            }
            match api
                .replace(&config.lease_name, &PostParams::default(), &updated)
                .await
            {
                Ok(_) => info!("Stepped down from leadership"),
                Err(e) => warn!("Failed to step down: {e}"),
            }
        }
        Err(e) => {
            debug!("Could not read lease for step-down: {e}");
        }
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn is_held_by(lease: &Lease, holder_id: &str) -> bool {
    lease
        .spec
        .as_ref()
        .and_then(|s| s.holder_identity.as_deref())
        == Some(holder_id)
}

/// Whether a lease held by someone else may be taken over at `now`.
fn is_expired(lease: &Lease, default_duration_secs: i32, now: u64) -> bool {
    let renew_epoch: Option<u64> = lease
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_RENEW_EPOCH))
        .and_then(|s| s.parse().ok());
    let duration = lease
        .spec
        .as_ref()
        .and_then(|s| s.lease_duration_seconds)
        .unwrap_or(default_duration_secs)
        .max(0) as u64;

    match renew_epoch {
        Some(ts) => now > ts.saturating_add(duration),
        None => true,
    }
}

fn stamp_renew_epoch(lease: &mut Lease, now: u64) {
    lease
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(ANNOTATION_RENEW_EPOCH.to_string(), now.to_string());
}

fn new_lease(config: &LeaderElectionConfig, now: u64) -> Lease {
    Lease {
        metadata: ObjectMeta {
            name: Some(config.lease_name.clone()),
            namespace: Some(config.namespace.clone()),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_RENEW_EPOCH.to_string(),
                now.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(LeaseSpec {
            holder_identity: Some(config.holder_id.clone()),
            lease_duration_seconds: Some(config.lease_duration_secs),
            lease_transitions: Some(0),
            ..Default::default()
        }),
    }
}

async fn replace_lease(api: &Api<Lease>, name: &str, lease: &Lease) -> anyhow::Result<bool> {
    match api.replace(name, &PostParams::default(), lease).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 409 => {
            debug!("Conflict updating lease, will retry");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn try_acquire_or_renew(
    api: &Api<Lease>,
    config: &LeaderElectionConfig,
) -> anyhow::Result<bool> {
    let now = epoch_secs();

    match api.get(&config.lease_name).await {
        Ok(existing) if is_held_by(&existing, &config.holder_id) => {
            // Ours; renew.
            let mut updated = existing.clone();
            stamp_renew_epoch(&mut updated, now);
            replace_lease(api, &config.lease_name, &updated).await
        }
        Ok(existing) if is_expired(&existing, config.lease_duration_secs, now) => {
            let mut updated = existing.clone();
            if let Some(ref mut s) = updated.spec {
                s.holder_identity = Some(config.holder_id.clone());
                s.lease_transitions = Some(s.lease_transitions.unwrap_or(0) + 1);
            }
            stamp_renew_epoch(&mut updated, now);
            replace_lease(api, &config.lease_name, &updated).await
        }
        Ok(existing) => {
            debug!(
                holder = ?existing.spec.as_ref().and_then(|s| s.holder_identity.as_deref()),
                "Lease held by another instance"
            );
            Ok(false)
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {
            match api.create(&PostParams::default(), &new_lease(config, now)).await {
                Ok(_) => Ok(true),
                Err(kube::Error::Api(e)) if e.code == 409 => {
                    debug!("Lease already created by another instance");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}
