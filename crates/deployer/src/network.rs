//! Network descriptors.
//!
//! Every network the contracts can be deployed to is described by a [`NetworkDescriptor`]. The
//! descriptor is resolved once per run from three layers, in order of precedence:
//!
//! 1. environment variables: `RPC_URL_<NETWORK>`, `ACCOUNT_ADDRESS_<NETWORK>` and
//!    `PRIVATE_KEY_<NETWORK>` (eg. `RPC_URL_SEPOLIA`),
//! 2. the networks configuration file (see [`NetworksConfig`]),
//! 3. built-in defaults. Only `devnet` has a complete set of defaults, matching the first
//!    predeployed account of `starknet-devnet --seed 0`.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use cofi_primitives::fee::FeeToken;
use cofi_primitives::Felt;
use serde::{Deserialize, Serialize};
use starknet::macros::felt;
use url::Url;

use crate::{Error, Result};

/// The Universal Deployer Contract, at the same address on every public network and on devnet.
pub const DEFAULT_UDC_ADDRESS: Felt =
    felt!("0x041a78e741e5af2fec34b695679bc6891742439f7afb8484ecd7766661ad02bf");

/// The ETH fee token contract address.
/// See https://github.com/starknet-io/starknet-addresses/blob/master/bridged_tokens/mainnet.json
pub const DEFAULT_ETH_FEE_TOKEN_ADDRESS: Felt =
    felt!("0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7");

/// The STRK fee token contract address.
/// See https://github.com/starknet-io/starknet-addresses/blob/master/bridged_tokens/mainnet.json
pub const DEFAULT_STRK_FEE_TOKEN_ADDRESS: Felt =
    felt!("0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d");

pub const DEFAULT_DEVNET_RPC_URL: &str = "http://127.0.0.1:5050/rpc";

/// First predeployed account of `starknet-devnet --seed 0`.
pub const DEFAULT_DEVNET_ACCOUNT_ADDRESS: Felt =
    felt!("0x064b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691");

/// Private key of [`DEFAULT_DEVNET_ACCOUNT_ADDRESS`].
pub const DEFAULT_DEVNET_PRIVATE_KEY: Felt = felt!("0x71d7bb07b9a64f6f78ac4c816aff4da9");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkName {
    Devnet,
    Sepolia,
    Mainnet,
}

impl NetworkName {
    /// Whether transactions on this network must be waited for before their effects are
    /// observable. A local devnet includes transactions immediately.
    pub fn has_finality(&self) -> bool {
        !matches!(self, Self::Devnet)
    }

    /// Suffix of the environment variables overriding this network's settings.
    pub fn env_suffix(&self) -> &'static str {
        match self {
            Self::Devnet => "DEVNET",
            Self::Sepolia => "SEPOLIA",
            Self::Mainnet => "MAINNET",
        }
    }
}

impl Display for NetworkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Devnet => write!(f, "devnet"),
            Self::Sepolia => write!(f, "sepolia"),
            Self::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for NetworkName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "sepolia" | "sn_sepolia" => Ok(Self::Sepolia),
            "mainnet" | "sn_mainnet" => Ok(Self::Mainnet),
            _ => Err(format!(
                "invalid network: '{s}'. Valid options are 'devnet', 'sepolia' or 'mainnet'"
            )),
        }
    }
}

/// A fee token and the address of its ERC20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTokenInfo {
    pub symbol: FeeToken,
    pub address: Felt,
}

/// Everything needed to talk to, and deploy on, a network.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub name: NetworkName,
    pub rpc_url: Url,
    pub account_address: Felt,
    pub private_key: Felt,
    pub udc_address: Felt,
    pub fee_tokens: Vec<FeeTokenInfo>,
}

impl NetworkDescriptor {
    pub fn fee_token(&self, symbol: FeeToken) -> Option<&FeeTokenInfo> {
        self.fee_tokens.iter().find(|token| token.symbol == symbol)
    }

    pub fn has_finality(&self) -> bool {
        self.name.has_finality()
    }
}

// Omits the private key.
impl std::fmt::Debug for NetworkDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkDescriptor")
            .field("name", &self.name)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("account_address", &format_args!("{:#x}", self.account_address))
            .field("udc_address", &format_args!("{:#x}", self.udc_address))
            .field("fee_tokens", &self.fee_tokens)
            .finish_non_exhaustive()
    }
}

/// Per-network settings read from the networks file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    pub rpc_url: Option<Url>,
    pub account_address: Option<Felt>,
    pub private_key: Option<Felt>,
    pub udc_address: Option<Felt>,
    pub fee_tokens: Option<Vec<FeeTokenInfo>>,
}

/// The networks configuration file.
///
/// ```toml
/// [sepolia]
/// rpc_url = "https://starknet-sepolia.public.blastapi.io/rpc/v0_7"
/// account_address = "0x123..."
/// ```
///
/// Private keys are better supplied through `PRIVATE_KEY_<NETWORK>` than stored in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworksConfig {
    pub devnet: Option<NetworkSettings>,
    pub sepolia: Option<NetworkSettings>,
    pub mainnet: Option<NetworkSettings>,
}

impl NetworksConfig {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(toml::from_str(&file)?)
    }

    pub fn settings(&self, network: NetworkName) -> Option<&NetworkSettings> {
        match network {
            NetworkName::Devnet => self.devnet.as_ref(),
            NetworkName::Sepolia => self.sepolia.as_ref(),
            NetworkName::Mainnet => self.mainnet.as_ref(),
        }
    }

    /// Resolves the descriptor of `network` using the process environment.
    pub fn resolve(&self, network: NetworkName) -> Result<NetworkDescriptor> {
        self.resolve_with_env(network, |key| std::env::var(key).ok())
    }

    /// Resolves the descriptor of `network`, looking environment variables up with `env`.
    pub fn resolve_with_env<F>(&self, network: NetworkName, env: F) -> Result<NetworkDescriptor>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = self.settings(network).cloned().unwrap_or_default();
        let suffix = network.env_suffix();
        let is_devnet = network == NetworkName::Devnet;

        let rpc_key = format!("RPC_URL_{suffix}");
        let rpc_url = match env(&rpc_key) {
            Some(value) => Url::parse(&value).map_err(|e| Error::InvalidSetting {
                key: rpc_key.clone(),
                reason: e.to_string(),
            })?,
            None => match settings.rpc_url {
                Some(url) => url,
                None if is_devnet => Url::parse(DEFAULT_DEVNET_RPC_URL).map_err(|e| {
                    Error::InvalidSetting { key: rpc_key.clone(), reason: e.to_string() }
                })?,
                None => return Err(missing(network, "rpc url", rpc_key)),
            },
        };

        let account_key = format!("ACCOUNT_ADDRESS_{suffix}");
        let account_address = match env_felt(&env, &account_key)? {
            Some(address) => address,
            None => match settings.account_address {
                Some(address) => address,
                None if is_devnet => DEFAULT_DEVNET_ACCOUNT_ADDRESS,
                None => return Err(missing(network, "account address", account_key)),
            },
        };

        let key_key = format!("PRIVATE_KEY_{suffix}");
        let private_key = match env_felt(&env, &key_key)? {
            Some(key) => key,
            None => match settings.private_key {
                Some(key) => key,
                None if is_devnet => DEFAULT_DEVNET_PRIVATE_KEY,
                None => return Err(missing(network, "private key", key_key)),
            },
        };

        Ok(NetworkDescriptor {
            name: network,
            rpc_url,
            account_address,
            private_key,
            udc_address: settings.udc_address.unwrap_or(DEFAULT_UDC_ADDRESS),
            fee_tokens: settings.fee_tokens.unwrap_or_else(default_fee_tokens),
        })
    }
}

pub fn default_fee_tokens() -> Vec<FeeTokenInfo> {
    vec![
        FeeTokenInfo { symbol: FeeToken::Eth, address: DEFAULT_ETH_FEE_TOKEN_ADDRESS },
        FeeTokenInfo { symbol: FeeToken::Strk, address: DEFAULT_STRK_FEE_TOKEN_ADDRESS },
    ]
}

fn env_felt<F>(env: &F, key: &str) -> Result<Option<Felt>>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(value) => Felt::from_hex(value.trim())
            .map(Some)
            .map_err(|e| Error::InvalidSetting { key: key.to_string(), reason: e.to_string() }),
        None => Ok(None),
    }
}

fn missing(network: NetworkName, setting: &'static str, env: String) -> Error {
    Error::MissingNetworkSetting { network, setting, env }
}
