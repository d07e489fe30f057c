//! A deployment run.
//!
//! [`DeploymentSession`] first loads and checks every planned contract, so a missing artifact or
//! a bad constructor argument aborts the run before any transaction is sent. It then declares the
//! classes one by one and stages the UDC calls in a single [`DeployBatch`]. Nothing is deployed
//! until [`DeploymentSession::execute`], which sends the whole batch at once and returns the
//! records of the contracts that were actually deployed.

use std::collections::HashSet;

use cofi_primitives::calldata::join_u256;
use cofi_primitives::fee::FeeToken;
use cofi_primitives::Felt;
use indexmap::IndexMap;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{error, info, warn};

use crate::artifact::{ArtifactSource, ArtifactStore, ContractArtifact};
use crate::batch::{DeployBatch, DeployRequest};
use crate::client::ChainClient;
use crate::declare::{declare_if_not_declared, DeclareOptions};
use crate::executor::{BatchExecutor, BatchReport, ExecutorOptions};
use crate::manifest::{DeploymentRecord, Manifest, ManifestStore, SaveOutcome};
use crate::network::NetworkDescriptor;
use crate::plan::{
    check_constructor_args, compile_constructor_args, random_salt, ArgContext, DeploymentPlan,
    PlannedContract,
};
use crate::resolver::resolve_tx_version;
use crate::{Error, Result};

const BALANCE_OF_ENTRYPOINT: &str = "balanceOf";

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub fee_token: FeeToken,
    /// Discard the previous manifest instead of archiving and merging it.
    pub reset: bool,
}

/// Result of executing a session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Records of the contracts whose deploy call succeeded, in plan order.
    pub deployments: Manifest,
    pub report: BatchReport,
}

/// Result of [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: SessionOutcome,
    /// Everything written to the manifest, including entries carried over from the previous one.
    pub manifest: Manifest,
    /// `None` if nothing was deployed and the manifest was left untouched.
    pub saved: Option<SaveOutcome>,
}

/// A planned contract whose artifact was found and whose constructor arguments match its ABI.
#[derive(Debug, Clone)]
pub struct LoadedContract<'p> {
    pub planned: &'p PlannedContract,
    pub artifact: ContractArtifact,
}

pub struct DeploymentSession<'a, C: ?Sized, A = ArtifactStore> {
    client: &'a C,
    network: &'a NetworkDescriptor,
    artifacts: A,
    options: SessionOptions,
    declared: HashSet<Felt>,
    batch: DeployBatch,
    /// One record per call of `batch`, at the same index.
    pending: Vec<(String, DeploymentRecord)>,
    addresses: IndexMap<String, Felt>,
}

impl<'a, C, A> DeploymentSession<'a, C, A>
where
    C: ChainClient + ?Sized,
    A: ArtifactSource,
{
    pub fn new(
        client: &'a C,
        network: &'a NetworkDescriptor,
        artifacts: A,
        options: SessionOptions,
    ) -> Self {
        let batch = DeployBatch::new(network.udc_address, client.account_address());
        Self {
            client,
            network,
            artifacts,
            options,
            declared: HashSet::new(),
            batch,
            pending: Vec::new(),
            addresses: IndexMap::new(),
        }
    }

    /// Addresses of the contracts staged so far, by manifest name.
    pub fn addresses(&self) -> &IndexMap<String, Felt> {
        &self.addresses
    }

    pub fn batch(&self) -> &DeployBatch {
        &self.batch
    }

    /// Stages every contract of the plan, in order.
    ///
    /// Every artifact is loaded and checked before the first class is declared.
    pub async fn deploy_plan(&mut self, plan: &DeploymentPlan) -> Result<()> {
        let loaded = self.load_plan(plan)?;
        self.stage_all(loaded).await
    }

    /// Validates the plan, loads the artifact of every contract and checks its constructor
    /// arguments. Nothing is sent.
    pub fn load_plan<'p>(&self, plan: &'p DeploymentPlan) -> Result<Vec<LoadedContract<'p>>> {
        plan.validate()?;
        plan.contracts.iter().map(|planned| self.load_contract(planned)).collect()
    }

    /// Declares and stages contracts returned by [`DeploymentSession::load_plan`], in order.
    pub async fn stage_all(&mut self, loaded: Vec<LoadedContract<'_>>) -> Result<()> {
        for contract in loaded {
            self.stage(contract).await?;
        }
        Ok(())
    }

    /// Declares the contract's class if needed and stages its deploy call. Returns the address
    /// the contract will be deployed at.
    pub async fn deploy_contract(&mut self, planned: &PlannedContract) -> Result<Felt> {
        let loaded = self.load_contract(planned)?;
        self.stage(loaded).await
    }

    fn load_contract<'p>(&self, planned: &'p PlannedContract) -> Result<LoadedContract<'p>> {
        let artifact = self.artifacts.lookup(&planned.contract)?.into_found().inspect_err(|e| {
            error!(
                target: "deployer",
                contract = %planned.contract,
                error = %e,
                "Cannot load artifact."
            );
        })?;

        check_constructor_args(
            planned.name(),
            &planned.constructor_args,
            &artifact.constructor_inputs,
        )?;

        Ok(LoadedContract { planned, artifact })
    }

    async fn stage(&mut self, loaded: LoadedContract<'_>) -> Result<Felt> {
        let LoadedContract { planned, artifact } = loaded;
        let name = planned.name();
        if self.addresses.contains_key(name) {
            return Err(Error::DuplicateContract(name.to_string()));
        }

        if !self.declared.contains(&artifact.class_hash) {
            let options = DeclareOptions {
                version: resolve_tx_version(self.network, self.options.fee_token, true)?,
                wait: self.network.has_finality(),
            };
            declare_if_not_declared(self.client, &artifact, options).await?;
            self.declared.insert(artifact.class_hash);
        }

        let ctx =
            ArgContext { deployer: self.client.account_address(), addresses: &self.addresses };
        let constructor_calldata = compile_constructor_args(name, &planned.constructor_args, ctx)?;

        let request = DeployRequest {
            salt: planned.salt.unwrap_or_else(random_salt),
            class_hash: artifact.class_hash,
            constructor_calldata,
            unique: planned.unique,
        };
        let address = self.batch.add_deploy_call(&request);

        info!(
            target: "deployer",
            %name,
            contract = %planned.contract,
            address = format!("{address:#x}"),
            "Contract staged for deployment."
        );

        let record = DeploymentRecord {
            class_hash: artifact.class_hash,
            address,
            contract: planned.contract.clone(),
        };
        self.addresses.insert(name.to_string(), address);
        self.pending.push((name.to_string(), record));

        Ok(address)
    }

    /// Reads the deployer's balance of the selected fee token.
    ///
    /// An empty balance is an error on networks with finality. On devnet it is only a warning.
    pub async fn check_fee_balance(&self) -> Result<BigUint> {
        let token = self.options.fee_token;
        let info = self.network.fee_token(token).ok_or(Error::UnsupportedFeeToken {
            network: self.network.name,
            token,
        })?;

        let account = self.client.account_address();
        let result = self.client.call(info.address, BALANCE_OF_ENTRYPOINT, &[account]).await?;
        let balance = match result.as_slice() {
            [low, high, ..] => join_u256(*low, *high)?,
            _ => {
                return Err(Error::UnexpectedCallResult {
                    entrypoint: BALANCE_OF_ENTRYPOINT,
                    len: result.len(),
                    expected: 2,
                })
            }
        };

        if balance.is_zero() {
            if self.network.has_finality() {
                return Err(Error::InsufficientBalance {
                    network: self.network.name,
                    token,
                    account,
                });
            }
            warn!(
                target: "deployer",
                %token,
                account = format!("{account:#x}"),
                "Deployer has no balance."
            );
        }

        Ok(balance)
    }

    /// Sends every staged deploy call and returns the deployed contracts.
    ///
    /// Contracts whose call permanently failed, or whose transaction couldn't be confirmed, are
    /// left out of the returned manifest and listed in the report.
    pub async fn execute(self) -> Result<SessionOutcome> {
        if self.batch.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let options = ExecutorOptions {
            version: resolve_tx_version(self.network, self.options.fee_token, false)?,
            wait: self.network.has_finality(),
        };
        let executor = BatchExecutor::new(self.client, options);
        let report = executor.execute_all(self.batch.calls()).await?;

        let succeeded: HashSet<usize> = report.succeeded.iter().copied().collect();
        let deployments = self
            .pending
            .into_iter()
            .enumerate()
            .filter(|(index, _)| succeeded.contains(index))
            .map(|(_, entry)| entry)
            .collect();

        for failure in &report.failed {
            error!(
                target: "deployer",
                index = failure.index,
                reason = %failure.reason,
                "Deploy call failed."
            );
        }

        if let Some(unconfirmed) = &report.unconfirmed {
            error!(
                target: "deployer",
                tx_hash = format!("{:#x}", unconfirmed.transaction_hash),
                calls = ?unconfirmed.calls,
                not_sent = ?report.not_sent,
                "Deploy transaction not confirmed, its contracts are not recorded."
            );
        }

        Ok(SessionOutcome { deployments, report })
    }
}

/// Deploys `plan` and records the result in the network's manifest.
///
/// Everything that can be checked locally is checked before the first transaction is sent: the
/// previous manifest, the artifacts and constructor arguments of every contract, and the
/// deployer's fee token balance.
///
/// Without `reset`, the previous manifest is merged with the new deployments, which override
/// entries of the same name. The manifest is only written if at least one contract was deployed.
/// Failed deploy calls are not an error here; use [`BatchReport::ensure_success`] on the
/// returned report.
pub async fn run<C, A>(
    client: &C,
    network: &NetworkDescriptor,
    plan: &DeploymentPlan,
    artifacts: A,
    manifests: &ManifestStore,
    options: SessionOptions,
) -> Result<RunSummary>
where
    C: ChainClient + ?Sized,
    A: ArtifactSource,
{
    info!(
        target: "deployer",
        network = %network.name,
        account = format!("{:#x}", client.account_address()),
        fee_token = %options.fee_token,
        contracts = plan.contracts.len(),
        "Starting deployment."
    );

    let mut manifest = if options.reset { Manifest::new() } else { manifests.load()? };

    let mut session = DeploymentSession::new(client, network, artifacts, options);
    let loaded = session.load_plan(plan)?;
    session.check_fee_balance().await?;
    session.stage_all(loaded).await?;
    let outcome = session.execute().await?;

    manifest.extend(outcome.deployments.clone());

    let saved = if outcome.deployments.is_empty() {
        warn!(target: "deployer", "Nothing was deployed, leaving the manifest untouched.");
        None
    } else {
        Some(manifests.save(&manifest, options.reset)?)
    };

    Ok(RunSummary { outcome, manifest, saved })
}
