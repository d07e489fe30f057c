//! Compiled contract artifacts.
//!
//! Scarb writes two files per contract of a package into its target directory:
//!
//! - `<package>_<contract>.contract_class.json`, the Sierra class that gets declared,
//! - `<package>_<contract>.compiled_contract_class.json`, the CASM class whose hash is committed to
//!   in the declare transaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cofi_primitives::Felt;
use serde::de::DeserializeOwned;
use starknet::core::types::contract::{AbiEntry, CompiledClass, SierraClass};
use starknet::core::types::FlattenedSierraClass;
use tracing::trace;

use crate::{Error, Result};

pub const DEFAULT_PACKAGE: &str = "contracts";
pub const DEFAULT_ARTIFACTS_DIR: &str = "contracts/target/dev";

const SIERRA_SUFFIX: &str = "contract_class.json";
const CASM_SUFFIX: &str = "compiled_contract_class.json";

/// A named input of a contract's constructor, as listed in the ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiInput {
    pub name: String,
    /// Fully qualified Cairo type, eg. `core::integer::u256`.
    pub ty: String,
}

/// A contract class ready to be declared.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub class_hash: Felt,
    pub compiled_class_hash: Felt,
    pub class: Arc<FlattenedSierraClass>,
    pub constructor_inputs: Vec<AbiInput>,
}

impl ContractArtifact {
    pub fn new(
        name: impl Into<String>,
        class_hash: Felt,
        compiled_class_hash: Felt,
        class: FlattenedSierraClass,
        constructor_inputs: Vec<AbiInput>,
    ) -> Self {
        Self {
            name: name.into(),
            class_hash,
            compiled_class_hash,
            class: Arc::new(class),
            constructor_inputs,
        }
    }
}

/// Outcome of looking up a contract's artifact.
#[derive(Debug, Clone)]
pub enum ArtifactLookup {
    Found(Box<ContractArtifact>),
    /// The Sierra class file doesn't exist, the contract was probably not built.
    Missing { name: String, path: PathBuf },
}

impl ArtifactLookup {
    /// Turns a missing artifact into an [`Error::MissingArtifact`].
    pub fn into_found(self) -> Result<ContractArtifact> {
        match self {
            Self::Found(artifact) => Ok(*artifact),
            Self::Missing { name, path } => Err(Error::MissingArtifact { name, path }),
        }
    }
}

/// Where contract artifacts are loaded from.
pub trait ArtifactSource: Send + Sync {
    fn lookup(&self, contract: &str) -> Result<ArtifactLookup>;
}

/// Reads contract artifacts from a Scarb target directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    package: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self { dir: dir.into(), package: package.into() }
    }

    pub fn sierra_path(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{}_{contract}.{SIERRA_SUFFIX}", self.package))
    }

    pub fn casm_path(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{}_{contract}.{CASM_SUFFIX}", self.package))
    }

    /// Loads the artifact of `contract` and computes its class hashes.
    ///
    /// A missing Sierra file is reported as [`ArtifactLookup::Missing`]. A Sierra class without
    /// its compiled counterpart, or a file that can't be decoded, is an error.
    pub fn lookup(&self, contract: &str) -> Result<ArtifactLookup> {
        let sierra_path = self.sierra_path(contract);
        if !sierra_path.exists() {
            return Ok(ArtifactLookup::Missing { name: contract.to_string(), path: sierra_path });
        }

        let casm_path = self.casm_path(contract);
        if !casm_path.exists() {
            return Err(Error::MissingArtifact { name: contract.to_string(), path: casm_path });
        }

        let sierra: SierraClass = read_json(&sierra_path)?;
        let casm: CompiledClass = read_json(&casm_path)?;

        let class_hash = sierra.class_hash().map_err(|e| malformed(&sierra_path, e))?;
        let compiled_class_hash = casm.class_hash().map_err(|e| malformed(&casm_path, e))?;
        let constructor_inputs = constructor_inputs(&sierra.abi);
        let class = sierra.flatten().map_err(|e| malformed(&sierra_path, e))?;

        trace!(
            target: "deployer",
            contract,
            class_hash = format!("{class_hash:#x}"),
            compiled_class_hash = format!("{compiled_class_hash:#x}"),
            "Loaded contract artifact."
        );

        let artifact = ContractArtifact::new(
            contract,
            class_hash,
            compiled_class_hash,
            class,
            constructor_inputs,
        );
        Ok(ArtifactLookup::Found(Box::new(artifact)))
    }
}

impl ArtifactSource for ArtifactStore {
    fn lookup(&self, contract: &str) -> Result<ArtifactLookup> {
        ArtifactStore::lookup(self, contract)
    }
}

/// Extracts the constructor inputs from a contract ABI. Contracts without a constructor take no
/// arguments.
pub fn constructor_inputs(abi: &[AbiEntry]) -> Vec<AbiInput> {
    abi.iter()
        .find_map(|entry| match entry {
            AbiEntry::Constructor(constructor) => Some(
                constructor
                    .inputs
                    .iter()
                    .map(|input| AbiInput { name: input.name.clone(), ty: input.r#type.clone() })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| malformed(path, e))
}

fn malformed(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::MalformedArtifact { path: path.to_path_buf(), reason: reason.to_string() }
}
