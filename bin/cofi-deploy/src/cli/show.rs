use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cofi_deployer::manifest::{ManifestStore, DEFAULT_DEPLOYMENTS_DIR};
use cofi_deployer::network::NetworkName;

#[derive(Debug, Args)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ShowArgs {
    /// The network whose manifest to print.
    #[arg(long, value_name = "NETWORK")]
    pub network: NetworkName,

    /// Directory the deployment manifests are read from.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments_dir: PathBuf,
}

impl ShowArgs {
    pub fn execute(self) -> Result<()> {
        let store = ManifestStore::new(&self.deployments_dir, self.network);
        let manifest = store.load()?;

        if manifest.is_empty() {
            println!("No deployments recorded for {}.", self.network);
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&manifest).context("Failed to format manifest")?;
        println!("{json}");
        Ok(())
    }
}
