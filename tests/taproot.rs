//! Taproot end-to-end tests against a local regtest node: one output with
//! two script-path unlock conditions next to its key path, spent all three
//! ways.
//!
//! Ignored by default; see tests/e2e.rs for the node setup, then
//!
//! ```text
//! cargo test --test taproot -- --ignored --test-threads 1
//! ```

use mjolnir::taproot::{Leaf, Node};
use mjolnir::wallet::{P2pkh, P2tr, P2trScript};
use mjolnir::{amount, rpc, script, Network, PriKey, Signer, Wallet};
use mjolnir::script::Builder;
use serde_json::json;

fn prikey(n: u64) -> PriKey {
    PriKey::from_u64(n).unwrap()
}

/// A p2pk leaf for key 2 next to a 2-of-2 CHECKSIGADD leaf for keys 3 and 4.
fn leaves() -> (Leaf, Leaf) {
    let p2pk = Leaf::new(
        Builder::new()
            .push_data(&prikey(2).pubkey().x())
            .push_opcode(script::OP_CHECKSIG)
            .into_script(),
    );
    let p2ms = Leaf::new(
        Builder::new()
            .push_data(&prikey(3).pubkey().x())
            .push_opcode(script::OP_CHECKSIG)
            .push_data(&prikey(4).pubkey().x())
            .push_opcode(script::OP_CHECKSIGADD)
            .push_num(2)
            .push_opcode(script::OP_EQUAL)
            .into_script(),
    );
    (p2pk, p2ms)
}

#[test]
#[ignore]
fn script_path_spending() {
    let network = Network::regtest();
    let client = rpc::Client::new(&network);

    let mate = Wallet::new(&network, P2pkh::new(&network, prikey(1)).into());
    let _ = client.call(
        "createwallet",
        json!(["main", true, true, null, null, null, true]),
    );
    let descriptor = client
        .get_descriptor_info(&format!("pkh({})", hex::encode(prikey(1).pubkey().sec())))
        .unwrap();
    client
        .import_descriptors(&[json!({ "desc": descriptor, "timestamp": 0 })])
        .unwrap();
    client.generate_to_address(110, mate.address()).unwrap();

    let (p2pk_leaf, p2ms_leaf) = leaves();
    let mast = Node::new(p2pk_leaf.clone(), p2ms_leaf.clone());
    let internal = prikey(1);

    let key_path = Wallet::new(
        &network,
        P2tr::new(&network, internal, Some(mast.hash())).unwrap().into(),
    );
    let descriptor = client
        .get_descriptor_info(&format!("addr({})", key_path.address()))
        .unwrap();
    client
        .import_descriptors(&[json!({ "desc": descriptor, "timestamp": "now" })])
        .unwrap();

    // Key path.
    mate.transfer(key_path.script_pubkey(), amount::COIN).unwrap();
    assert_eq!(key_path.balance().unwrap(), amount::COIN);
    key_path.transfer_all(mate.script_pubkey()).unwrap();
    assert_eq!(key_path.balance().unwrap(), 0);

    // Script path, p2pk leaf: one signature by key 2, sibling is the
    // multisig leaf hash.
    mate.transfer(key_path.script_pubkey(), amount::COIN).unwrap();
    let p2pk_spender = Wallet::new(
        &network,
        Signer::from(
            P2trScript::new(
                &network,
                vec![prikey(2)],
                internal.pubkey(),
                p2pk_leaf.clone(),
                vec![p2ms_leaf.hash()],
            )
            .unwrap(),
        ),
    );
    assert_eq!(p2pk_spender.address(), key_path.address());
    p2pk_spender.transfer_all(mate.script_pubkey()).unwrap();
    assert_eq!(key_path.balance().unwrap(), 0);

    // Script path, CHECKSIGADD leaf: signatures stack in reverse script
    // order, so key 4 first.
    mate.transfer(key_path.script_pubkey(), amount::COIN).unwrap();
    let p2ms_spender = Wallet::new(
        &network,
        Signer::from(
            P2trScript::new(
                &network,
                vec![prikey(4), prikey(3)],
                internal.pubkey(),
                p2ms_leaf,
                vec![p2pk_leaf.hash()],
            )
            .unwrap(),
        ),
    );
    p2ms_spender.transfer_all(mate.script_pubkey()).unwrap();
    assert_eq!(key_path.balance().unwrap(), 0);
}
