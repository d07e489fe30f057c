use assert_matches::assert_matches;
use cofi_deployer::client::mock::{artifact, MockArtifacts, MockChainClient};
use cofi_deployer::manifest::ManifestStore;
use cofi_deployer::network::{
    default_fee_tokens, NetworkDescriptor, NetworkName, NetworksConfig,
    DEFAULT_STRK_FEE_TOKEN_ADDRESS, DEFAULT_UDC_ADDRESS,
};
use cofi_deployer::plan::{ConstructorArg, DeploymentPlan, PlannedContract};
use cofi_deployer::session::{run, DeploymentSession, SessionOptions};
use cofi_deployer::Error;
use cofi_primitives::fee::{FeeToken, TxVersion};
use cofi_primitives::utils::{get_udc_deployed_address, UdcUniqueness};
use cofi_primitives::Felt;
use starknet::macros::felt;
use url::Url;

const ACCOUNT: Felt = felt!("0x64b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691");
const COLLECTION_CLASS: Felt = felt!("0xc011ec7");
const MARKETPLACE_CLASS: Felt = felt!("0x3a4be7");

const ADDRESS_TYPE: &str = "core::starknet::contract_address::ContractAddress";
const U256_TYPE: &str = "core::integer::u256";
const BYTE_ARRAY_TYPE: &str = "core::byte_array::ByteArray";

fn devnet() -> NetworkDescriptor {
    NetworksConfig::default().resolve_with_env(NetworkName::Devnet, |_| None).unwrap()
}

fn sepolia() -> NetworkDescriptor {
    NetworkDescriptor {
        name: NetworkName::Sepolia,
        rpc_url: Url::parse("http://sepolia.example/rpc").unwrap(),
        account_address: ACCOUNT,
        private_key: felt!("0x1"),
        udc_address: DEFAULT_UDC_ADDRESS,
        fee_tokens: default_fee_tokens(),
    }
}

fn artifacts() -> MockArtifacts {
    MockArtifacts::new()
        .with(artifact(
            "CofiCollection",
            COLLECTION_CLASS,
            &[("default_admin", ADDRESS_TYPE), ("base_uri", BYTE_ARRAY_TYPE)],
        ))
        .with(artifact(
            "Marketplace",
            MARKETPLACE_CLASS,
            &[("cofi_collection", ADDRESS_TYPE), ("admin", ADDRESS_TYPE), ("fee", U256_TYPE)],
        ))
}

fn plan() -> DeploymentPlan {
    toml::from_str(
        r#"
        [[contract]]
        contract = "CofiCollection"
        salt = "0x1"
        constructor_args = [
            { type = "deployer" },
            { type = "string", value = "https://cofiblocks.com/metadata/" },
        ]

        [[contract]]
        contract = "Marketplace"
        salt = "0x2"
        constructor_args = [
            { type = "address_of", value = "CofiCollection" },
            { type = "deployer" },
            { type = "u256", value = "50" },
        ]
        "#,
    )
    .unwrap()
}

fn options(reset: bool) -> SessionOptions {
    SessionOptions { fee_token: FeeToken::Eth, reset }
}

#[tokio::test]
async fn already_declared_classes_are_not_declared_again() {
    let client = MockChainClient::new(ACCOUNT)
        .with_declared(COLLECTION_CLASS)
        .with_declared(MARKETPLACE_CLASS);
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let summary =
        run(&client, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap();

    assert!(client.declares().is_empty());
    assert!(summary.outcome.report.is_success());
    assert_eq!(client.execute_attempts(), 1);

    let collection = &summary.manifest["CofiCollection"];
    assert_eq!(collection.class_hash, COLLECTION_CLASS);
    assert_eq!(collection.contract, "CofiCollection");
    assert_eq!(manifests.load().unwrap(), summary.manifest);
}

#[tokio::test]
async fn addresses_are_known_before_execution() {
    let client = MockChainClient::new(ACCOUNT);
    let network = devnet();
    let mut session = DeploymentSession::new(&client, &network, artifacts(), options(true));
    session.deploy_plan(&plan()).await.unwrap();

    let collection = session.addresses()["CofiCollection"];
    let mut calldata = vec![ACCOUNT];
    calldata.extend(cofi_primitives::calldata::encode_byte_array(
        "https://cofiblocks.com/metadata/",
    ));
    let uniqueness =
        UdcUniqueness::Unique { deployer_address: ACCOUNT, udc_address: DEFAULT_UDC_ADDRESS };
    assert_eq!(
        collection,
        get_udc_deployed_address(felt!("0x1"), COLLECTION_CLASS, &uniqueness, &calldata)
    );

    // The marketplace constructor receives the collection's address.
    let marketplace_call = &session.batch().calls()[1];
    assert_eq!(marketplace_call.calldata[4..], [collection, ACCOUNT, Felt::from(50u8), Felt::ZERO]);

    assert_eq!(client.execute_attempts(), 0);
}

#[tokio::test]
async fn classes_are_declared_once_per_run() {
    let client = MockChainClient::new(ACCOUNT);
    let network = devnet();
    let mut plan = plan();
    let second = PlannedContract {
        name: Some("SecondMarketplace".to_string()),
        salt: Some(felt!("0x3")),
        ..plan.contracts[1].clone()
    };
    plan.contracts.push(second);

    let mut session = DeploymentSession::new(&client, &network, artifacts(), options(true));
    session.deploy_plan(&plan).await.unwrap();

    let declared: Vec<String> = client.declares().into_iter().map(|(name, _)| name).collect();
    assert_eq!(declared, vec!["CofiCollection", "Marketplace"]);
    assert_eq!(session.batch().len(), 3);
}

#[tokio::test]
async fn fee_token_selects_transaction_versions() {
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let eth = MockChainClient::new(ACCOUNT);
    run(&eth, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap();
    assert!(eth.declares().iter().all(|(_, version)| *version == TxVersion::V2));
    assert_eq!(eth.executions()[0].version, TxVersion::V1);

    let strk = MockChainClient::new(ACCOUNT);
    let options = SessionOptions { fee_token: FeeToken::Strk, reset: true };
    run(&strk, &network, &plan(), artifacts(), &manifests, options).await.unwrap();
    assert!(strk.declares().iter().all(|(_, version)| *version == TxVersion::V3));
    assert_eq!(strk.executions()[0].version, TxVersion::V3);
    assert!(strk.view_calls().contains(&(DEFAULT_STRK_FEE_TOKEN_ADDRESS, "balanceOf".to_string())));
}

#[tokio::test]
async fn missing_artifact_aborts_before_any_transaction() {
    let client = MockChainClient::new(ACCOUNT);
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);
    let artifacts = MockArtifacts::new();

    let err =
        run(&client, &network, &plan(), artifacts, &manifests, options(true)).await.unwrap_err();

    assert_matches!(err, Error::MissingArtifact { name, .. } if name == "CofiCollection");
    assert!(client.declares().is_empty());
    assert_eq!(client.execute_attempts(), 0);
    assert!(!manifests.latest_path().exists());
}

#[tokio::test]
async fn constructor_mismatch_is_rejected_before_declaring() {
    let client = MockChainClient::new(ACCOUNT);
    let network = devnet();
    let mut session = DeploymentSession::new(&client, &network, artifacts(), options(true));

    let planned = PlannedContract {
        contract: "Marketplace".to_string(),
        name: None,
        salt: None,
        unique: true,
        constructor_args: vec![ConstructorArg::Deployer],
    };

    let err = session.deploy_contract(&planned).await.unwrap_err();
    assert_matches!(err, Error::ConstructorArity { expected: 3, actual: 1, .. });
    assert!(client.declares().is_empty());
}

#[tokio::test]
async fn failed_deployments_are_left_out_of_the_manifest() {
    let client = MockChainClient::new(ACCOUNT);
    let network = sepolia();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let mut session = DeploymentSession::new(&client, &network, artifacts(), options(true));
    session.deploy_plan(&plan()).await.unwrap();
    client.revert(session.batch().calls()[1].clone());

    let outcome = session.execute().await.unwrap();

    assert_eq!(outcome.report.failed_indices(), vec![1]);
    assert!(outcome.deployments.contains_key("CofiCollection"));
    assert!(!outcome.deployments.contains_key("Marketplace"));
    assert_matches!(outcome.report.ensure_success(), Err(Error::CallsFailed { .. }));
}

#[tokio::test]
async fn previous_manifest_is_merged_without_reset() {
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let first = MockChainClient::new(ACCOUNT);
    run(&first, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap();
    let previous = manifests.load().unwrap();

    let mut only_marketplace = plan();
    only_marketplace.contracts.remove(0);
    only_marketplace.contracts[0].constructor_args[0] = ConstructorArg::Felt(felt!("0x777"));
    only_marketplace.contracts[0].salt = Some(felt!("0x9"));

    let second = MockChainClient::new(ACCOUNT);
    let summary =
        run(&second, &network, &only_marketplace, artifacts(), &manifests, options(false))
            .await
            .unwrap();

    assert_eq!(summary.manifest["CofiCollection"], previous["CofiCollection"]);
    assert_ne!(summary.manifest["Marketplace"].address, previous["Marketplace"].address);
    assert!(summary.saved.unwrap().archived.is_some());
    assert_eq!(manifests.load().unwrap(), summary.manifest);
}

#[tokio::test]
async fn empty_balance_is_fatal_only_on_finality_networks() {
    let network = sepolia();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);
    let client = MockChainClient::new(ACCOUNT).with_balance(network.fee_tokens[0].address, 0u8);

    let err =
        run(&client, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap_err();

    // The balance is read before any class is declared.
    assert_matches!(err, Error::InsufficientBalance { .. });
    assert!(client.declares().is_empty());
    assert_eq!(client.execute_attempts(), 0);

    let network = devnet();
    let manifests = ManifestStore::new(dir.path(), network.name);
    let client = MockChainClient::new(ACCOUNT).with_balance(network.fee_tokens[0].address, 0u8);

    let summary =
        run(&client, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap();
    assert!(summary.outcome.report.is_success());
}

#[tokio::test]
async fn unreadable_previous_manifest_aborts_before_sending() {
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);
    std::fs::write(manifests.latest_path(), "{ not json").unwrap();
    let client = MockChainClient::new(ACCOUNT);

    let err =
        run(&client, &network, &plan(), artifacts(), &manifests, options(false)).await.unwrap_err();

    assert_matches!(err, Error::Json(_));
    assert!(client.declares().is_empty());
    assert_eq!(client.execute_attempts(), 0);
    assert_eq!(std::fs::read_to_string(manifests.latest_path()).unwrap(), "{ not json");
}

#[tokio::test]
async fn later_contracts_are_checked_before_the_first_declare() {
    let network = devnet();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let mut bad_arity = plan();
    bad_arity.contracts[1].constructor_args.truncate(1);
    let client = MockChainClient::new(ACCOUNT);

    let err = run(&client, &network, &bad_arity, artifacts(), &manifests, options(true))
        .await
        .unwrap_err();
    assert_matches!(err, Error::ConstructorArity { contract, expected: 3, actual: 1 } => {
        assert_eq!(contract, "Marketplace");
    });
    assert!(client.declares().is_empty());

    let only_collection = MockArtifacts::new().with(artifact(
        "CofiCollection",
        COLLECTION_CLASS,
        &[("default_admin", ADDRESS_TYPE), ("base_uri", BYTE_ARRAY_TYPE)],
    ));
    let client = MockChainClient::new(ACCOUNT);

    let err = run(&client, &network, &plan(), only_collection, &manifests, options(true))
        .await
        .unwrap_err();
    assert_matches!(err, Error::MissingArtifact { name, .. } if name == "Marketplace");
    assert!(client.declares().is_empty());
    assert!(client.view_calls().is_empty());
}

#[tokio::test]
async fn unconfirmed_deployments_are_left_out_of_the_manifest() {
    let client = MockChainClient::new(ACCOUNT);
    let network = sepolia();
    let mut plan = plan();
    let second = PlannedContract {
        name: Some("SecondMarketplace".to_string()),
        salt: Some(felt!("0x3")),
        ..plan.contracts[1].clone()
    };
    plan.contracts.push(second);

    let mut session = DeploymentSession::new(&client, &network, artifacts(), options(true));
    session.deploy_plan(&plan).await.unwrap();
    let calls = session.batch().calls().to_vec();
    client.reject(calls[0].clone());
    client.time_out(calls[2].clone());

    let outcome = session.execute().await.unwrap();

    // [0..3] and [0..2] are rejected, [0..1] fails, [1..2] succeeds and [2..3] times out.
    assert_eq!(outcome.report.failed_indices(), vec![0]);
    assert_eq!(outcome.report.succeeded, vec![1]);
    assert_eq!(outcome.report.unconfirmed.as_ref().map(|u| u.calls.clone()), Some(vec![2]));
    assert_eq!(outcome.deployments.keys().collect::<Vec<_>>(), vec!["Marketplace"]);
    assert_matches!(
        outcome.report.ensure_success(),
        Err(Error::TransactionUnconfirmed { .. })
    );
}

#[tokio::test]
async fn declare_failure_aborts_the_run() {
    let client = MockChainClient::new(ACCOUNT).with_declare_error("class too large");
    let network = sepolia();
    let dir = tempfile::tempdir().unwrap();
    let manifests = ManifestStore::new(dir.path(), network.name);

    let err =
        run(&client, &network, &plan(), artifacts(), &manifests, options(true)).await.unwrap_err();

    assert_matches!(err, Error::Declare { contract, .. } if contract == "CofiCollection");
    assert_eq!(client.execute_attempts(), 0);
}
