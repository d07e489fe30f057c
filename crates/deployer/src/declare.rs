use cofi_primitives::fee::TxVersion;
use cofi_primitives::Felt;
use tracing::{debug, error, info};

use crate::artifact::ContractArtifact;
use crate::client::ChainClient;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct DeclareOptions {
    pub version: TxVersion,
    /// Wait for the declare transaction to be accepted before returning.
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareOutcome {
    /// The class was found on-chain and nothing was sent.
    AlreadyDeclared { class_hash: Felt },
    Declared { class_hash: Felt, transaction_hash: Felt },
}

impl DeclareOutcome {
    pub fn class_hash(&self) -> Felt {
        match self {
            Self::AlreadyDeclared { class_hash } | Self::Declared { class_hash, .. } => *class_hash,
        }
    }
}

/// Declares the artifact's class unless a class with the same hash is already on-chain.
///
/// Errors are logged before being returned; a contract whose class couldn't be declared must not
/// be deployed.
pub async fn declare_if_not_declared<C>(
    client: &C,
    artifact: &ContractArtifact,
    options: DeclareOptions,
) -> Result<DeclareOutcome>
where
    C: ChainClient + ?Sized,
{
    let contract = artifact.name.as_str();
    let class_hash = artifact.class_hash;

    let declared = client.is_declared(class_hash).await.map_err(|source| {
        error!(target: "declare", %contract, error = %source, "Failed to query class.");
        Error::Declare { contract: contract.to_string(), source }
    })?;

    if declared {
        info!(
            target: "declare",
            %contract,
            class_hash = format!("{class_hash:#x}"),
            "Class already declared."
        );
        return Ok(DeclareOutcome::AlreadyDeclared { class_hash });
    }

    debug!(
        target: "declare",
        %contract,
        class_hash = format!("{class_hash:#x}"),
        version = %options.version,
        "Declaring class."
    );

    let result = client.declare(artifact, options.version).await.map_err(|source| {
        error!(target: "declare", %contract, error = %source, "Failed to declare class.");
        Error::Declare { contract: contract.to_string(), source }
    })?;

    if result.class_hash != class_hash {
        error!(
            target: "declare",
            %contract,
            expected = format!("{class_hash:#x}"),
            actual = format!("{:#x}", result.class_hash),
            "Declared class hash mismatch."
        );
        return Err(Error::ClassHashMismatch {
            contract: contract.to_string(),
            expected: class_hash,
            actual: result.class_hash,
        });
    }

    if options.wait {
        client.wait_for_transaction(result.transaction_hash).await.map_err(|source| {
            error!(target: "declare", %contract, error = %source, "Declare transaction failed.");
            Error::Declare { contract: contract.to_string(), source }
        })?;
    }

    info!(
        target: "declare",
        %contract,
        class_hash = format!("{class_hash:#x}"),
        tx_hash = format!("{:#x}", result.transaction_hash),
        "Class declared."
    );

    Ok(DeclareOutcome::Declared { class_hash, transaction_hash: result.transaction_hash })
}
