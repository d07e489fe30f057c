use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Token used to pay transaction fees.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeToken {
    /// Fees paid in ETH (wei).
    #[default]
    Eth,
    /// Fees paid in STRK (fri).
    Strk,
}

impl Display for FeeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eth => write!(f, "eth"),
            Self::Strk => write!(f, "strk"),
        }
    }
}

impl FromStr for FeeToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eth" => Ok(FeeToken::Eth),
            "strk" => Ok(FeeToken::Strk),
            _ => Err(format!("invalid fee token: '{s}'. Valid options are 'eth' or 'strk'")),
        }
    }
}

/// Transaction version a declare or invoke transaction is sent with.
///
/// `V1` and `V2` pay fees in ETH, `V3` pays fees in STRK.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TxVersion {
    V1,
    V2,
    V3,
}

impl TxVersion {
    /// The fee token implied by this version.
    pub fn fee_token(&self) -> FeeToken {
        match self {
            Self::V1 | Self::V2 => FeeToken::Eth,
            Self::V3 => FeeToken::Strk,
        }
    }
}

impl Display for TxVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::V3 => write!(f, "v3"),
        }
    }
}
