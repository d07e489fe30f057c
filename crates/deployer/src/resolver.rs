use cofi_primitives::fee::{FeeToken, TxVersion};

use crate::network::NetworkDescriptor;
use crate::{Error, Result};

/// Picks the transaction version for paying fees with `fee_token` on `network`.
///
/// STRK fees require `V3` transactions. ETH fees are paid with `V2` for Sierra class
/// declarations and `V1` for invokes. The fee token must be one of the network's listed tokens.
pub fn resolve_tx_version(
    network: &NetworkDescriptor,
    fee_token: FeeToken,
    sierra: bool,
) -> Result<TxVersion> {
    if network.fee_token(fee_token).is_none() {
        return Err(Error::UnsupportedFeeToken { network: network.name, token: fee_token });
    }

    Ok(match fee_token {
        FeeToken::Strk => TxVersion::V3,
        FeeToken::Eth if sierra => TxVersion::V2,
        FeeToken::Eth => TxVersion::V1,
    })
}
