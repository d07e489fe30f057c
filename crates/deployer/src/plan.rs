//! Deployment plans.
//!
//! A plan lists the contracts to deploy, in order, together with their constructor arguments:
//!
//! ```toml
//! package = "contracts"
//!
//! [[contract]]
//! contract = "CofiCollection"
//! constructor_args = [
//!     { type = "deployer" },
//!     { type = "string", value = "https://cofiblocks.com/metadata/" },
//! ]
//!
//! [[contract]]
//! contract = "Marketplace"
//! constructor_args = [
//!     { type = "address_of", value = "CofiCollection" },
//!     { type = "deployer" },
//!     { type = "u256", value = "50" },
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use cofi_primitives::calldata::{encode_byte_array, encode_short_string, parse_integer, split_u256};
use cofi_primitives::Felt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::artifact::{AbiInput, DEFAULT_PACKAGE};
use crate::{Error, Result};

const U256_TYPE: &str = "core::integer::u256";
const BYTE_ARRAY_TYPE: &str = "core::byte_array::ByteArray";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentPlan {
    /// Scarb package the contracts belong to. Prefixes the artifact file names.
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default, rename = "contract")]
    pub contracts: Vec<PlannedContract>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannedContract {
    /// Name of the contract in the package, ie. of its artifact.
    pub contract: String,
    /// Name of the deployment in the manifest. Defaults to the contract name.
    #[serde(default)]
    pub name: Option<String>,
    /// Deployment salt. A random one is used if not set.
    #[serde(default)]
    pub salt: Option<Felt>,
    #[serde(default = "default_unique")]
    pub unique: bool,
    #[serde(default)]
    pub constructor_args: Vec<ConstructorArg>,
}

impl PlannedContract {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.contract)
    }
}

/// A typed constructor argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstructorArg {
    Felt(Felt),
    /// A decimal or hexadecimal literal, serialized as two limbs.
    U256(String),
    /// Serialized as a `ByteArray`.
    String(String),
    ShortString(String),
    Bool(bool),
    /// The address of the deploying account.
    Deployer,
    /// The address of a contract deployed earlier in the same plan.
    AddressOf(String),
}

impl ConstructorArg {
    fn kind(&self) -> ArgKind {
        match self {
            Self::U256(_) => ArgKind::U256,
            Self::String(_) => ArgKind::ByteArray,
            _ => ArgKind::Felt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    Felt,
    U256,
    ByteArray,
}

impl ArgKind {
    fn of_input(input: &AbiInput) -> Self {
        match input.ty.as_str() {
            U256_TYPE => Self::U256,
            BYTE_ARRAY_TYPE => Self::ByteArray,
            _ => Self::Felt,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Felt => "single felt",
            Self::U256 => "u256",
            Self::ByteArray => "string",
        }
    }
}

/// What constructor arguments can refer to.
#[derive(Debug, Clone, Copy)]
pub struct ArgContext<'a> {
    pub deployer: Felt,
    /// Addresses of the contracts deployed so far, by manifest name.
    pub addresses: &'a IndexMap<String, Felt>,
}

impl DeploymentPlan {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let plan: Self = toml::from_str(&content)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Checks that the plan is not empty, that deployment names are unique and that every
    /// `address_of` argument refers to a contract deployed before.
    pub fn validate(&self) -> Result<()> {
        if self.contracts.is_empty() {
            return Err(Error::EmptyPlan);
        }

        let mut seen = HashSet::new();
        for planned in &self.contracts {
            for arg in &planned.constructor_args {
                if let ConstructorArg::AddressOf(reference) = arg {
                    if !seen.contains(reference.as_str()) {
                        return Err(Error::UnknownReference {
                            contract: planned.name().to_string(),
                            reference: reference.clone(),
                        });
                    }
                }
            }

            if !seen.insert(planned.name()) {
                return Err(Error::DuplicateContract(planned.name().to_string()));
            }
        }

        Ok(())
    }
}

/// Checks `args` against the constructor inputs declared in the contract's ABI.
pub fn check_constructor_args(
    contract: &str,
    args: &[ConstructorArg],
    inputs: &[AbiInput],
) -> Result<()> {
    if args.len() != inputs.len() {
        return Err(Error::ConstructorArity {
            contract: contract.to_string(),
            expected: inputs.len(),
            actual: args.len(),
        });
    }

    for (arg, input) in args.iter().zip(inputs) {
        let expected = ArgKind::of_input(input);
        if arg.kind() != expected {
            return Err(Error::ConstructorArgType {
                contract: contract.to_string(),
                input: input.name.clone(),
                expected: expected.describe(),
            });
        }
    }

    Ok(())
}

/// Serializes constructor arguments into calldata.
pub fn compile_constructor_args(
    contract: &str,
    args: &[ConstructorArg],
    ctx: ArgContext<'_>,
) -> Result<Vec<Felt>> {
    let mut calldata = Vec::with_capacity(args.len());

    for arg in args {
        match arg {
            ConstructorArg::Felt(value) => calldata.push(*value),
            ConstructorArg::U256(literal) => {
                let (low, high) = split_u256(&parse_integer(literal)?)?;
                calldata.extend([low, high]);
            }
            ConstructorArg::String(value) => calldata.extend(encode_byte_array(value)),
            ConstructorArg::ShortString(value) => calldata.push(encode_short_string(value)?),
            ConstructorArg::Bool(value) => {
                calldata.push(if *value { Felt::ONE } else { Felt::ZERO });
            }
            ConstructorArg::Deployer => calldata.push(ctx.deployer),
            ConstructorArg::AddressOf(reference) => {
                let address = ctx.addresses.get(reference).copied().ok_or_else(|| {
                    Error::UnknownReference {
                        contract: contract.to_string(),
                        reference: reference.clone(),
                    }
                })?;
                calldata.push(address);
            }
        }
    }

    Ok(calldata)
}

/// A random salt.
pub fn random_salt() -> Felt {
    // 31 bytes always fit below the field modulus.
    let bytes: [u8; 31] = rand::random();
    Felt::from_bytes_be_slice(&bytes)
}

fn default_package() -> String {
    DEFAULT_PACKAGE.to_string()
}

fn default_unique() -> bool {
    true
}
