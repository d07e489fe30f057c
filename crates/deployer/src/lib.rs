//! Declaration and batched deployment of the marketplace's Starknet contracts.
//!
//! A deployment run goes through the following steps:
//!
//! 1. every contract of the [plan](plan::DeploymentPlan) is loaded from its compiled
//!    [artifact](artifact::ArtifactStore) and declared if its class isn't on-chain yet,
//! 2. its Universal Deployer call is appended to a [`DeployBatch`](batch::DeployBatch), which
//!    already knows the address the contract will be deployed at,
//! 3. the whole batch is submitted once by the [`BatchExecutor`](executor::BatchExecutor), which
//!    bisects the batch on failure to isolate the failing calls,
//! 4. the successful deployments are written to the network's
//!    [manifest](manifest::ManifestStore).

pub mod artifact;
pub mod batch;
pub mod client;
pub mod declare;
mod error;
pub mod executor;
pub mod manifest;
pub mod network;
pub mod plan;
pub mod resolver;
pub mod session;

pub use error::{Error, Result};
