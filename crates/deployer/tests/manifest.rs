use std::fs;

use cofi_deployer::manifest::{DeploymentRecord, Manifest, ManifestStore};
use cofi_deployer::network::NetworkName;
use starknet::macros::felt;

fn manifest(name: &str) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.insert(
        name.to_string(),
        DeploymentRecord {
            class_hash: felt!("0x1a2b"),
            address: felt!("0x3c4d"),
            contract: name.to_string(),
        },
    );
    manifest
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn save_without_reset_archives_the_previous_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path(), NetworkName::Sepolia);

    store.save(&manifest("CofiCollection"), true).unwrap();
    let previous = fs::read(store.latest_path()).unwrap();

    let outcome = store.save_at(&manifest("Marketplace"), false, 1_700_000_000_000).unwrap();

    let archive = store.archive_path(1_700_000_000_000);
    assert_eq!(outcome.archived.as_ref(), Some(&archive));
    assert!(!outcome.removed_previous);

    // The previous manifest is kept byte for byte.
    assert_eq!(fs::read(&archive).unwrap(), previous);
    assert_eq!(
        files_in(dir.path()),
        vec!["sepolia_1700000000000.json".to_string(), "sepolia_latest.json".to_string()]
    );
    assert_eq!(store.load().unwrap(), manifest("Marketplace"));
}

#[test]
fn save_with_reset_leaves_only_the_new_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path(), NetworkName::Mainnet);

    store.save(&manifest("CofiCollection"), true).unwrap();
    let outcome = store.save(&manifest("Marketplace"), true).unwrap();

    assert!(outcome.removed_previous);
    assert!(outcome.archived.is_none());
    assert_eq!(files_in(dir.path()), vec!["mainnet_latest.json".to_string()]);
    assert_eq!(store.load().unwrap(), manifest("Marketplace"));
}

#[test]
fn written_manifest_is_pretty_printed_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path(), NetworkName::Devnet);
    store.save(&manifest("Marketplace"), true).unwrap();

    let content = fs::read_to_string(store.latest_path()).unwrap();
    similar_asserts::assert_eq!(
        content,
        r#"{
  "Marketplace": {
    "classHash": "0x1a2b",
    "address": "0x3c4d",
    "contract": "Marketplace"
  }
}
"#
    );
}

#[test]
fn networks_do_not_share_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let devnet = ManifestStore::new(dir.path(), NetworkName::Devnet);
    let sepolia = ManifestStore::new(dir.path(), NetworkName::Sepolia);

    devnet.save(&manifest("Marketplace"), false).unwrap();

    assert!(sepolia.load().unwrap().is_empty());
    assert_eq!(devnet.load().unwrap().len(), 1);
}
