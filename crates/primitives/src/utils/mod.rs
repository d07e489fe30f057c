use starknet_types_core::felt::NonZeroFelt;
use starknet_types_core::hash::{Pedersen, StarkHash};

use crate::Felt;

/// How the Universal Deployer Contract derives the address of a deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdcUniqueness {
    /// The address only depends on the salt, class hash and constructor calldata.
    NotUnique,
    /// The salt is first hashed with the caller's address so that two callers using the same
    /// salt end up with different addresses.
    Unique {
        /// The account calling the UDC.
        deployer_address: Felt,
        /// The address of the UDC itself.
        udc_address: Felt,
    },
}

/// This function can be used to calculate target addresses from `DEPLOY_ACCOUNT` transactions or
/// invoking the `deploy` syscall. The `deployer_address` parameter should be set to `0` for
/// `DEPLOY_ACCOUNT` transactions, and in other cases, to the address of the contract where the
/// `deploy` syscall is invoked.
///
/// Implementation reference: https://github.com/starkware-libs/cairo-lang/blob/v0.14.0/src/starkware/starknet/core/os/contract_address/contract_address.cairo
pub fn get_contract_address(
    salt: Felt,
    class_hash: Felt,
    constructor_calldata: &[Felt],
    deployer_address: Felt,
) -> Felt {
    // Cairo string of 'STARKNET_CONTRACT_ADDRESS'
    const CONTRACT_ADDRESS_PREFIX: Felt = Felt::from_raw([
        533439743893157637,
        8635008616843941496,
        17289941567720117366,
        3829237882463328880,
    ]);

    let address = Pedersen::hash_array(&[
        CONTRACT_ADDRESS_PREFIX,
        deployer_address,
        salt,
        class_hash,
        Pedersen::hash_array(constructor_calldata),
    ]);

    normalize_address(address)
}

/// Computes the address of a contract deployed through the UDC's `deployContract` entrypoint.
pub fn get_udc_deployed_address(
    salt: Felt,
    class_hash: Felt,
    uniqueness: &UdcUniqueness,
    constructor_calldata: &[Felt],
) -> Felt {
    match uniqueness {
        UdcUniqueness::NotUnique => {
            get_contract_address(salt, class_hash, constructor_calldata, Felt::ZERO)
        }
        UdcUniqueness::Unique { deployer_address, udc_address } => {
            let salt = Pedersen::hash(deployer_address, &salt);
            get_contract_address(salt, class_hash, constructor_calldata, *udc_address)
        }
    }
}

/// Valid storage addresses should satisfy `address + offset < 2**251` where `offset <
/// 256` and `address < ADDR_BOUND`.
///
/// 2 ** 251 - 256
const ADDR_BOUND: NonZeroFelt = NonZeroFelt::from_raw([
    576459263475590224,
    18446744073709255680,
    160989183,
    18446743986131443745,
]);

/// Computes addr % [`ADDR_BOUND`] so that the result will form a valid storage item address in the
/// storage tree.
fn normalize_address(address: Felt) -> Felt {
    address.mod_floor(&ADDR_BOUND)
}

#[cfg(test)]
mod tests {
    use starknet::core::utils as sn;

    use super::*;

    fn felt(hex: &str) -> Felt {
        Felt::from_hex(hex).unwrap()
    }

    #[test]
    fn contract_address_matches_starknet_rs() {
        let salt = felt("0x1234");
        let class_hash = felt("0x5400e90f7e0ae78bd02c77cd75527280470e2fe19c54970dd79dc37a9d3645c");
        let calldata = [felt("0x1"), felt("0xabc"), Felt::from(1_000_000u64)];
        let deployer = felt("0x41a78e741e5af2fec34b695679bc6891742439f7afb8484ecd7766661ad02bf");

        let ours = get_contract_address(salt, class_hash, &calldata, deployer);
        let theirs = sn::get_contract_address(salt, class_hash, &calldata, deployer);
        assert_eq!(ours, theirs);
    }

    #[test]
    fn udc_address_matches_starknet_rs() {
        let salt = felt("0x99");
        let class_hash = felt("0x2b2b");
        let calldata = [felt("0x64b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691")];
        let account = felt("0x64b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691");
        let udc = felt("0x41a78e741e5af2fec34b695679bc6891742439f7afb8484ecd7766661ad02bf");

        let unique = UdcUniqueness::Unique { deployer_address: account, udc_address: udc };
        let expected = sn::get_udc_deployed_address(
            salt,
            class_hash,
            &sn::UdcUniqueness::Unique(sn::UdcUniqueSettings {
                deployer_address: account,
                udc_contract_address: udc,
            }),
            &calldata,
        );
        assert_eq!(get_udc_deployed_address(salt, class_hash, &unique, &calldata), expected);

        let expected = sn::get_udc_deployed_address(
            salt,
            class_hash,
            &sn::UdcUniqueness::NotUnique,
            &calldata,
        );
        let ours = get_udc_deployed_address(salt, class_hash, &UdcUniqueness::NotUnique, &calldata);
        assert_eq!(ours, expected);
    }

    #[test]
    fn uniqueness_changes_the_address() {
        let salt = felt("0x1");
        let class_hash = felt("0x2");
        let unique =
            UdcUniqueness::Unique { deployer_address: felt("0x3"), udc_address: felt("0x4") };

        assert_ne!(
            get_udc_deployed_address(salt, class_hash, &unique, &[]),
            get_udc_deployed_address(salt, class_hash, &UdcUniqueness::NotUnique, &[]),
        );
    }
}
