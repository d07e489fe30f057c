use cofi_primitives::utils::{get_udc_deployed_address, UdcUniqueness};
use cofi_primitives::Felt;
use tracing::trace;

/// Name of the Universal Deployer Contract's deploy entrypoint.
pub const UDC_DEPLOY_ENTRYPOINT: &str = "deployContract";

/// A chain call that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployCall {
    pub contract_address: Felt,
    pub entrypoint: String,
    pub calldata: Vec<Felt>,
}

/// Parameters of a single UDC deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub salt: Felt,
    pub class_hash: Felt,
    pub constructor_calldata: Vec<Felt>,
    /// Whether the deployer's address is mixed into the salt.
    pub unique: bool,
}

/// Accumulates UDC deploy calls to be sent together as a single multicall.
#[derive(Debug, Clone)]
pub struct DeployBatch {
    udc_address: Felt,
    deployer_address: Felt,
    calls: Vec<DeployCall>,
}

impl DeployBatch {
    /// Creates an empty batch of calls to the UDC at `udc_address`, sent by `deployer_address`.
    pub fn new(udc_address: Felt, deployer_address: Felt) -> Self {
        Self { udc_address, deployer_address, calls: Vec::new() }
    }

    /// Appends the UDC call deploying `request` and returns the address the contract will be
    /// deployed at.
    ///
    /// The address is known before anything is sent, so later constructor arguments can
    /// reference it.
    pub fn add_deploy_call(&mut self, request: &DeployRequest) -> Felt {
        let DeployRequest { salt, class_hash, ref constructor_calldata, unique } = *request;

        let uniqueness = if unique {
            UdcUniqueness::Unique {
                deployer_address: self.deployer_address,
                udc_address: self.udc_address,
            }
        } else {
            UdcUniqueness::NotUnique
        };

        let address = get_udc_deployed_address(salt, class_hash, &uniqueness, constructor_calldata);

        let mut calldata = Vec::with_capacity(constructor_calldata.len() + 4);
        calldata.push(class_hash);
        calldata.push(salt);
        calldata.push(if unique { Felt::ONE } else { Felt::ZERO });
        calldata.push(Felt::from(constructor_calldata.len()));
        calldata.extend_from_slice(constructor_calldata);

        trace!(
            target: "deployer",
            index = self.calls.len(),
            class_hash = format!("{class_hash:#x}"),
            salt = format!("{salt:#x}"),
            address = format!("{address:#x}"),
            "Added deploy call."
        );

        self.calls.push(DeployCall {
            contract_address: self.udc_address,
            entrypoint: UDC_DEPLOY_ENTRYPOINT.to_string(),
            calldata,
        });

        address
    }

    pub fn calls(&self) -> &[DeployCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn into_calls(self) -> Vec<DeployCall> {
        self.calls
    }
}
