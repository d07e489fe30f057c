use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cofi_primitives::fee::TxVersion;
use cofi_primitives::Felt;
use starknet::accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet::core::types::{BlockId, BlockTag, Call, FunctionCall, StarknetError};
use starknet::core::utils::get_selector_from_name;
use starknet::providers::jsonrpc::HttpTransport;
use starknet::providers::{JsonRpcClient, Provider, ProviderError};
use starknet::signers::{LocalWallet, SigningKey};
use tracing::{debug, trace};

use super::{ChainClient, ClientError, DeclareResult, TxWaiter};
use crate::artifact::ContractArtifact;
use crate::batch::DeployCall;
use crate::network::NetworkDescriptor;

type RpcProvider = Arc<JsonRpcClient<HttpTransport>>;

/// A [`ChainClient`] signing with a single-owner account over Starknet JSON-RPC.
pub struct StarknetClient {
    provider: RpcProvider,
    account: SingleOwnerAccount<RpcProvider, LocalWallet>,
    wait_timeout: Duration,
    wait_interval: Duration,
}

impl StarknetClient {
    /// Connects to the network's RPC endpoint and sets up the deployer account.
    ///
    /// The chain id is fetched from the node so the account signs for the network it is actually
    /// talking to.
    pub async fn connect(network: &NetworkDescriptor) -> Result<Self, ClientError> {
        let provider = Arc::new(JsonRpcClient::new(HttpTransport::new(network.rpc_url.clone())));
        let chain_id = provider.chain_id().await?;

        debug!(
            target: "rpc",
            network = %network.name,
            rpc_url = %network.rpc_url,
            chain_id = format!("{chain_id:#x}"),
            "Connected to network."
        );

        let signer = LocalWallet::from(SigningKey::from_secret_scalar(network.private_key));
        let mut account = SingleOwnerAccount::new(
            provider.clone(),
            signer,
            network.account_address,
            chain_id,
            ExecutionEncoding::New,
        );

        // Nonces and fee estimates must account for transactions that are not in a block yet.
        account.set_block_id(BlockId::Tag(BlockTag::Pending));

        Ok(Self {
            provider,
            account,
            wait_timeout: TxWaiter::<RpcProvider>::DEFAULT_TIMEOUT,
            wait_interval: TxWaiter::<RpcProvider>::DEFAULT_INTERVAL,
        })
    }

    pub fn with_wait_timeout(self, wait_timeout: Duration) -> Self {
        Self { wait_timeout, ..self }
    }

    pub fn with_wait_interval(self, wait_interval: Duration) -> Self {
        Self { wait_interval, ..self }
    }

    pub fn provider(&self) -> &JsonRpcClient<HttpTransport> {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for StarknetClient {
    fn account_address(&self) -> Felt {
        self.account.address()
    }

    async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError> {
        match self.provider.get_class(BlockId::Tag(BlockTag::Pending), class_hash).await {
            Ok(_) => Ok(true),
            Err(ProviderError::StarknetError(StarknetError::ClassHashNotFound)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn declare(
        &self,
        artifact: &ContractArtifact,
        version: TxVersion,
    ) -> Result<DeclareResult, ClientError> {
        let class = artifact.class.clone();
        let compiled_class_hash = artifact.compiled_class_hash;

        let result = match version {
            TxVersion::V2 => self.account.declare_v2(class, compiled_class_hash).send().await,
            TxVersion::V3 => self.account.declare_v3(class, compiled_class_hash).send().await,
            TxVersion::V1 => {
                return Err(ClientError::UnsupportedVersion { kind: "sierra declare", version });
            }
        }
        .map_err(|e| ClientError::Account(e.to_string()))?;

        trace!(
            target: "rpc",
            contract = %artifact.name,
            tx_hash = format!("{:#x}", result.transaction_hash),
            "Declare transaction submitted."
        );

        Ok(DeclareResult {
            transaction_hash: result.transaction_hash,
            class_hash: result.class_hash,
        })
    }

    async fn execute(&self, calls: &[DeployCall], version: TxVersion) -> Result<Felt, ClientError> {
        let calls = calls.iter().map(into_call).collect::<Result<Vec<_>, _>>()?;

        let result = match version {
            TxVersion::V1 => self.account.execute_v1(calls).send().await,
            TxVersion::V3 => self.account.execute_v3(calls).send().await,
            TxVersion::V2 => {
                return Err(ClientError::UnsupportedVersion { kind: "invoke", version });
            }
        }
        .map_err(|e| ClientError::Account(e.to_string()))?;

        trace!(
            target: "rpc",
            tx_hash = format!("{:#x}", result.transaction_hash),
            "Invoke transaction submitted."
        );

        Ok(result.transaction_hash)
    }

    async fn wait_for_transaction(&self, transaction_hash: Felt) -> Result<(), ClientError> {
        TxWaiter::new(transaction_hash, self.provider.as_ref())
            .with_timeout(self.wait_timeout)
            .with_interval(self.wait_interval)
            .wait()
            .await?;
        Ok(())
    }

    async fn call(
        &self,
        contract_address: Felt,
        entrypoint: &str,
        calldata: &[Felt],
    ) -> Result<Vec<Felt>, ClientError> {
        let entry_point_selector = get_selector_from_name(entrypoint)
            .map_err(|_| ClientError::InvalidEntrypoint(entrypoint.to_string()))?;

        let request =
            FunctionCall { contract_address, entry_point_selector, calldata: calldata.to_vec() };
        Ok(self.provider.call(request, BlockId::Tag(BlockTag::Pending)).await?)
    }
}

fn into_call(call: &DeployCall) -> Result<Call, ClientError> {
    let selector = get_selector_from_name(&call.entrypoint)
        .map_err(|_| ClientError::InvalidEntrypoint(call.entrypoint.clone()))?;
    Ok(Call { to: call.contract_address, selector, calldata: call.calldata.clone() })
}
