//! Per-network deployment manifests.
//!
//! The latest deployment of a network lives in `<dir>/<network>_latest.json`. Saving a new
//! manifest either archives the previous one as `<dir>/<network>_<unix-epoch-ms>.json` or
//! deletes it, depending on the reset mode.
//!
//! Saving is not atomic: a crash between moving the previous manifest away and writing the new
//! one leaves the network without a latest manifest.

use std::fs;
use std::path::{Path, PathBuf};

use cofi_primitives::Felt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::network::NetworkName;
use crate::{Error, Result};

pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// A deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub class_hash: Felt,
    pub address: Felt,
    /// Name of the contract artifact the class was built from.
    pub contract: String,
}

/// Deployment records keyed by their logical name, in deployment order.
pub type Manifest = IndexMap<String, DeploymentRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Path of the written manifest.
    pub path: PathBuf,
    /// Where the previous manifest was moved to, if it was archived.
    pub archived: Option<PathBuf>,
    /// Whether a previous manifest was deleted.
    pub removed_previous: bool,
}

#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
    network: NetworkName,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>, network: NetworkName) -> Self {
        Self { dir: dir.into(), network }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(format!("{}_latest.json", self.network))
    }

    pub fn archive_path(&self, timestamp_ms: i64) -> PathBuf {
        self.dir.join(format!("{}_{timestamp_ms}.json", self.network))
    }

    /// Reads the latest manifest. A network that was never deployed to has an empty manifest.
    pub fn load(&self) -> Result<Manifest> {
        let path = self.latest_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::new()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Writes `manifest` as the latest manifest of the network.
    ///
    /// With `reset`, the previous latest manifest is deleted. Otherwise it is archived under the
    /// current time.
    pub fn save(&self, manifest: &Manifest, reset: bool) -> Result<SaveOutcome> {
        self.save_at(manifest, reset, chrono::Utc::now().timestamp_millis())
    }

    /// Same as [`ManifestStore::save`] but archives under `timestamp_ms`. If an archive already
    /// exists for that timestamp, the next free millisecond is used.
    pub fn save_at(
        &self,
        manifest: &Manifest,
        reset: bool,
        timestamp_ms: i64,
    ) -> Result<SaveOutcome> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let latest = self.latest_path();
        let mut outcome =
            SaveOutcome { path: latest.clone(), archived: None, removed_previous: false };

        if latest.exists() {
            if reset {
                fs::remove_file(&latest).map_err(|e| Error::io(&latest, e))?;
                debug!(target: "manifest", path = %latest.display(), "Removed previous manifest.");
                outcome.removed_previous = true;
            } else {
                let archive = self.free_archive_path(timestamp_ms);
                fs::rename(&latest, &archive).map_err(|e| Error::io(&archive, e))?;
                debug!(
                    target: "manifest",
                    path = %archive.display(),
                    "Archived previous manifest."
                );
                outcome.archived = Some(archive);
            }
        }

        let mut content = serde_json::to_string_pretty(manifest)?;
        content.push('\n');
        fs::write(&latest, content).map_err(|e| Error::io(&latest, e))?;

        info!(
            target: "manifest",
            network = %self.network,
            path = %latest.display(),
            contracts = manifest.len(),
            "Manifest written."
        );

        Ok(outcome)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn free_archive_path(&self, mut timestamp_ms: i64) -> PathBuf {
        loop {
            let path = self.archive_path(timestamp_ms);
            if !path.exists() {
                return path;
            }
            timestamp_ms += 1;
        }
    }
}
