//! Kubernetes operator for PackageRevision resources.

use anyhow::{anyhow, Result};
use clap::Parser;
use kube::Client;
use tracing::{error, info};

use porch_operator::config::OperatorConfig;
use porch_operator::leader_election::{self, LeaderStatus};
use porch_operator::{controllers, crds, metrics, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    telemetry::init(&config.log_level);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting PackageRevision operator"
    );

    let client = Client::try_default().await?;

    if config.install_crds {
        crds::install_crds(client.clone()).await?;
    }

    if let Some(addr) = config.metrics_addr() {
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr).await {
                error!("Metrics server failed: {e}");
            }
        });
    }

    let settings = config.controller_settings();
    let status = LeaderStatus::new();

    if !config.leader_elect {
        status.force_leader();
        controllers::run(client, settings).await?;
        return Ok(());
    }

    let lease = config.leader_election();
    let elector = tokio::spawn(leader_election::run(
        client.clone(),
        lease.clone(),
        status.clone(),
    ));

    info!(holder = %lease.holder_id, lease = %lease.lease_name, "Waiting for leadership");
    tokio::select! {
        _ = status.acquired() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested before acquiring leadership");
            elector.abort();
            return Ok(());
        }
    }

    let result = tokio::select! {
        res = controllers::run(client.clone(), settings) => res.map_err(anyhow::Error::from),
        _ = status.lost() => Err(anyhow!("leadership lost, exiting")),
    };

    elector.abort();
    leader_election::step_down(&client, &lease).await;
    result
}
