//! In-memory [`ChainClient`] for tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use cofi_primitives::calldata::split_u256;
use cofi_primitives::fee::TxVersion;
use cofi_primitives::Felt;
use num_bigint::BigUint;
use parking_lot::Mutex;
use starknet::core::types::{EntryPointsByType, FlattenedSierraClass};

use super::{ChainClient, ClientError, DeclareResult, TxWaitingError};
use crate::artifact::{AbiInput, ArtifactLookup, ArtifactSource, ContractArtifact};
use crate::batch::DeployCall;

/// Builds an artifact with an empty class. Only its hashes and constructor inputs are
/// meaningful.
pub fn artifact(
    name: &str,
    class_hash: Felt,
    constructor_inputs: &[(&str, &str)],
) -> ContractArtifact {
    let class = FlattenedSierraClass {
        sierra_program: Vec::new(),
        contract_class_version: "0.1.0".to_string(),
        entry_points_by_type: EntryPointsByType {
            constructor: Vec::new(),
            external: Vec::new(),
            l1_handler: Vec::new(),
        },
        abi: "[]".to_string(),
    };

    let inputs = constructor_inputs
        .iter()
        .map(|(name, ty)| AbiInput { name: name.to_string(), ty: ty.to_string() })
        .collect();

    ContractArtifact::new(name, class_hash, class_hash + Felt::ONE, class, inputs)
}

/// Artifacts kept in memory, keyed by contract name.
#[derive(Debug, Default, Clone)]
pub struct MockArtifacts {
    artifacts: HashMap<String, ContractArtifact>,
}

impl MockArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, artifact: ContractArtifact) -> Self {
        self.artifacts.insert(artifact.name.clone(), artifact);
        self
    }
}

impl ArtifactSource for MockArtifacts {
    fn lookup(&self, contract: &str) -> crate::Result<ArtifactLookup> {
        Ok(match self.artifacts.get(contract) {
            Some(artifact) => ArtifactLookup::Found(Box::new(artifact.clone())),
            None => ArtifactLookup::Missing {
                name: contract.to_string(),
                path: PathBuf::from(format!("{contract}.contract_class.json")),
            },
        })
    }
}

/// A submitted multicall, as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub transaction_hash: Felt,
    pub calls: Vec<DeployCall>,
    pub version: TxVersion,
}

#[derive(Debug, Default)]
struct State {
    declared: HashSet<Felt>,
    declares: Vec<(String, TxVersion)>,
    declare_error: Option<String>,
    reported_class_hash: Option<Felt>,
    executions: Vec<Execution>,
    rejected: HashSet<DeployCall>,
    reverted: HashSet<DeployCall>,
    reverted_txs: HashSet<Felt>,
    timed_out: HashSet<DeployCall>,
    timed_out_txs: HashSet<Felt>,
    waits: Vec<Felt>,
    balances: HashMap<Felt, BigUint>,
    calls: Vec<(Felt, String)>,
    next_tx: u64,
}

/// A chain where every transaction is accepted unless it contains a call that was marked as
/// failing with [`MockChainClient::reject`] or [`MockChainClient::revert`].
#[derive(Debug)]
pub struct MockChainClient {
    account: Felt,
    state: Mutex<State>,
}

impl MockChainClient {
    pub fn new(account: Felt) -> Self {
        Self { account, state: Mutex::new(State::default()) }
    }

    /// Marks `class_hash` as already declared.
    pub fn with_declared(self, class_hash: Felt) -> Self {
        self.state.lock().declared.insert(class_hash);
        self
    }

    /// Makes every declare transaction fail with `reason`.
    pub fn with_declare_error(self, reason: impl Into<String>) -> Self {
        self.state.lock().declare_error = Some(reason.into());
        self
    }

    /// Makes declare transactions report `class_hash` instead of the artifact's.
    pub fn with_reported_class_hash(self, class_hash: Felt) -> Self {
        self.state.lock().reported_class_hash = Some(class_hash);
        self
    }

    /// Sets the balance `balanceOf` returns for the account on `token`.
    pub fn with_balance(self, token: Felt, amount: impl Into<BigUint>) -> Self {
        self.state.lock().balances.insert(token, amount.into());
        self
    }

    /// Any transaction containing `call` is rejected on submission, the way a failing fee
    /// estimation would.
    pub fn reject(&self, call: DeployCall) {
        self.state.lock().rejected.insert(call);
    }

    /// Any transaction containing `call` is accepted but reverts on-chain.
    pub fn revert(&self, call: DeployCall) {
        self.state.lock().reverted.insert(call);
    }

    /// Any transaction containing `call` is accepted but waiting for it times out.
    pub fn time_out(&self, call: DeployCall) {
        self.state.lock().timed_out.insert(call);
    }

    pub fn declares(&self) -> Vec<(String, TxVersion)> {
        self.state.lock().declares.clone()
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.state.lock().executions.clone()
    }

    /// Number of `execute` attempts, including rejected ones.
    pub fn execute_attempts(&self) -> usize {
        self.state.lock().executions.len()
    }

    pub fn waits(&self) -> Vec<Felt> {
        self.state.lock().waits.clone()
    }

    pub fn view_calls(&self) -> Vec<(Felt, String)> {
        self.state.lock().calls.clone()
    }

    fn next_tx_hash(state: &mut State) -> Felt {
        state.next_tx += 1;
        Felt::from(0x7800_0000u64 + state.next_tx)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn account_address(&self) -> Felt {
        self.account
    }

    async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError> {
        Ok(self.state.lock().declared.contains(&class_hash))
    }

    async fn declare(
        &self,
        artifact: &ContractArtifact,
        version: TxVersion,
    ) -> Result<DeclareResult, ClientError> {
        let mut state = self.state.lock();
        state.declares.push((artifact.name.clone(), version));

        if let Some(reason) = &state.declare_error {
            return Err(ClientError::Account(reason.clone()));
        }

        let class_hash = state.reported_class_hash.unwrap_or(artifact.class_hash);
        state.declared.insert(class_hash);
        let transaction_hash = Self::next_tx_hash(&mut state);

        Ok(DeclareResult { transaction_hash, class_hash })
    }

    async fn execute(&self, calls: &[DeployCall], version: TxVersion) -> Result<Felt, ClientError> {
        let mut state = self.state.lock();
        let transaction_hash = Self::next_tx_hash(&mut state);
        state.executions.push(Execution { transaction_hash, calls: calls.to_vec(), version });

        if calls.iter().any(|call| state.rejected.contains(call)) {
            return Err(ClientError::Account("execution reverted during fee estimation".into()));
        }

        if calls.iter().any(|call| state.reverted.contains(call)) {
            state.reverted_txs.insert(transaction_hash);
        }

        if calls.iter().any(|call| state.timed_out.contains(call)) {
            state.timed_out_txs.insert(transaction_hash);
        }

        Ok(transaction_hash)
    }

    async fn wait_for_transaction(&self, transaction_hash: Felt) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.waits.push(transaction_hash);

        if state.timed_out_txs.contains(&transaction_hash) {
            return Err(TxWaitingError::Timeout(transaction_hash).into());
        }

        if state.reverted_txs.contains(&transaction_hash) {
            return Err(TxWaitingError::TransactionReverted {
                hash: transaction_hash,
                reason: "Error in the called contract".into(),
            }
            .into());
        }

        Ok(())
    }

    async fn call(
        &self,
        contract_address: Felt,
        entrypoint: &str,
        _calldata: &[Felt],
    ) -> Result<Vec<Felt>, ClientError> {
        let mut state = self.state.lock();
        state.calls.push((contract_address, entrypoint.to_string()));

        match entrypoint {
            "balanceOf" | "balance_of" => {
                let balance = state
                    .balances
                    .get(&contract_address)
                    .cloned()
                    .unwrap_or_else(|| BigUint::from(10u64).pow(21));
                let (low, high) = split_u256(&balance)
                    .map_err(|e| ClientError::Account(format!("bad mock balance: {e}")))?;
                Ok(vec![low, high])
            }
            _ => Err(ClientError::InvalidEntrypoint(entrypoint.to_string())),
        }
    }
}
