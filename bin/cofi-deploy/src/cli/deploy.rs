use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use cofi_deployer::artifact::{ArtifactStore, DEFAULT_ARTIFACTS_DIR};
use cofi_deployer::client::StarknetClient;
use cofi_deployer::manifest::{ManifestStore, DEFAULT_DEPLOYMENTS_DIR};
use cofi_deployer::network::{NetworkName, NetworksConfig};
use cofi_deployer::plan::DeploymentPlan;
use cofi_deployer::session::{self, SessionOptions};
use cofi_primitives::fee::FeeToken;
use tracing::info;

const DEFAULT_PLAN_PATH: &str = "config/deploy.toml";

#[derive(Debug, Args)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DeployArgs {
    /// The network to deploy to: devnet, sepolia or mainnet.
    #[arg(long, value_name = "NETWORK")]
    pub network: NetworkName,

    /// Discard the previous manifest of the network instead of archiving it.
    #[arg(long, overrides_with = "no_reset")]
    reset: bool,

    /// Archive the previous manifest and merge the new deployments into it.
    #[arg(long, overrides_with = "reset")]
    no_reset: bool,

    /// Token the transaction fees are paid in.
    #[arg(long, value_name = "TOKEN", default_value_t = FeeToken::Eth)]
    pub fee: FeeToken,

    /// Path to the deployment plan.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PLAN_PATH)]
    pub plan: PathBuf,

    /// Path to the networks file. Built-in defaults and environment variables are used if
    /// not provided.
    #[arg(long, value_name = "PATH")]
    pub networks: Option<PathBuf>,

    /// Directory containing the compiled contract classes.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub contracts_dir: PathBuf,

    /// Directory the deployment manifests are written to.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments_dir: PathBuf,

    #[command(flatten)]
    pub tx: TransactionArgs,
}

#[derive(Debug, Args)]
#[cfg_attr(test, derive(PartialEq))]
#[command(next_help_heading = "Transaction options")]
pub struct TransactionArgs {
    /// Maximum time to wait for a transaction to be accepted, in seconds.
    #[arg(long = "tx.wait-timeout", value_name = "SECONDS")]
    pub wait_timeout: Option<u64>,

    /// Interval between two transaction status polls, in milliseconds.
    #[arg(long = "tx.poll-interval", value_name = "MILLISECONDS")]
    pub poll_interval: Option<u64>,
}

impl DeployArgs {
    /// Whether the previous manifest is discarded. Defaults to `true`; the last of `--reset` and
    /// `--no-reset` wins.
    pub fn reset(&self) -> bool {
        self.reset || !self.no_reset
    }

    pub async fn execute(self) -> Result<()> {
        let networks = match &self.networks {
            Some(path) => NetworksConfig::read(path)
                .with_context(|| format!("Failed to read networks file {}", path.display()))?,
            None => NetworksConfig::default(),
        };
        let network = networks.resolve(self.network)?;

        let plan = DeploymentPlan::read(&self.plan).with_context(|| {
            format!("Failed to read deployment plan {}", self.plan.display())
        })?;
        let artifacts = ArtifactStore::new(&self.contracts_dir, &plan.package);
        let manifests = ManifestStore::new(&self.deployments_dir, network.name);

        let mut client = StarknetClient::connect(&network).await.with_context(|| {
            format!("Failed to connect to {} at {}", network.name, network.rpc_url)
        })?;
        if let Some(secs) = self.tx.wait_timeout {
            client = client.with_wait_timeout(Duration::from_secs(secs));
        }
        if let Some(millis) = self.tx.poll_interval {
            client = client.with_wait_interval(Duration::from_millis(millis));
        }

        let options = SessionOptions { fee_token: self.fee, reset: self.reset() };
        let summary = session::run(&client, &network, &plan, artifacts, &manifests, options).await?;

        for (name, record) in &summary.outcome.deployments {
            println!("{name}: {:#x} (class {:#x})", record.address, record.class_hash);
        }

        match &summary.saved {
            Some(saved) => {
                if let Some(archive) = &saved.archived {
                    let path = archive.display();
                    info!(target: "cofi_deploy", %path, "Previous manifest archived.");
                }
                println!("Manifest written to {}", saved.path.display());
            }
            None => println!("No contract was deployed, manifest left untouched."),
        }

        summary.outcome.report.ensure_success()?;
        Ok(())
    }
}
