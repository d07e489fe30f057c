use std::path::PathBuf;

use cofi_primitives::calldata::CalldataError;
use cofi_primitives::fee::FeeToken;
use cofi_primitives::Felt;

use crate::client::ClientError;
use crate::network::NetworkName;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nothing to deploy: the call batch is empty")]
    EmptyBatch,

    #[error("artifact of contract '{name}' not found at {}", path.display())]
    MissingArtifact { name: String, path: PathBuf },

    #[error("malformed artifact {}: {reason}", path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("failed to declare contract '{contract}': {source}")]
    Declare {
        contract: String,
        #[source]
        source: ClientError,
    },

    #[error(
        "contract '{contract}' was declared with class hash {actual:#x}, expected {expected:#x}"
    )]
    ClassHashMismatch { contract: String, expected: Felt, actual: Felt },

    #[error("fee token '{token}' is not available on {network}")]
    UnsupportedFeeToken { network: NetworkName, token: FeeToken },

    #[error("deployer account {account:#x} has no {token} balance on {network}")]
    InsufficientBalance { network: NetworkName, token: FeeToken, account: Felt },

    #[error("'{entrypoint}' returned {len} felt(s), expected at least {expected}")]
    UnexpectedCallResult { entrypoint: &'static str, len: usize, expected: usize },

    #[error("{} deploy call(s) failed permanently (indices {failed:?})", failed.len())]
    CallsFailed { failed: Vec<usize> },

    #[error(
        "transaction {transaction_hash:#x} was sent but not confirmed: {reason}; its calls \
         (indices {calls:?}) may still be deployed and {} call(s) were not sent",
        not_sent.len()
    )]
    TransactionUnconfirmed {
        transaction_hash: Felt,
        calls: Vec<usize>,
        not_sent: Vec<usize>,
        reason: String,
    },

    #[error("contract '{contract}' expects {expected} constructor argument(s), got {actual}")]
    ConstructorArity { contract: String, expected: usize, actual: usize },

    #[error("constructor input '{input}' of contract '{contract}' expects a {expected} argument")]
    ConstructorArgType { contract: String, input: String, expected: &'static str },

    #[error("contract '{0}' is already part of this deployment")]
    DuplicateContract(String),

    #[error("contract '{contract}' references '{reference}' which is not deployed before it")]
    UnknownReference { contract: String, reference: String },

    #[error("deployment plan is empty")]
    EmptyPlan,

    #[error("missing {setting} for {network}: set it in the networks file or via {env}")]
    MissingNetworkSetting { network: NetworkName, setting: &'static str, env: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Calldata(#[from] CalldataError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
