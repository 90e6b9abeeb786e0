//! Address derivation for the standard script families, and the reverse
//! mapping from an address string to its locking script.

use crate::hashes::hash160;
use crate::keys::PubKey;
use crate::network::Network;
use crate::script::{self, Builder};
use crate::{base58, bech32, taproot};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Base58(#[from] base58::Error),
    #[error(transparent)]
    Bech32(#[from] bech32::Error),
    #[error("address version byte does not match the network")]
    BadPrefix,
    #[error("address payload has the wrong length")]
    BadLength,
    #[error("witness program does not fit a known script family")]
    BadProgram,
}

/// Legacy pay-to-pubkey-hash.
pub fn p2pkh(pubkey: &PubKey, network: &Network) -> String {
    let mut payload = vec![network.p2pkh_prefix];
    payload.extend_from_slice(&hash160(&pubkey.sec()));
    base58::check_encode(&payload)
}

/// Pay-to-script-hash of an arbitrary redeem script.
pub fn p2sh(redeem: &[u8], network: &Network) -> String {
    let mut payload = vec![network.p2sh_prefix];
    payload.extend_from_slice(&hash160(redeem));
    base58::check_encode(&payload)
}

/// The k-of-n CHECKMULTISIG redeem script.
pub fn p2ms_redeem(k: u8, pubkeys: &[PubKey]) -> Vec<u8> {
    let mut builder = Builder::new().push_num(k);
    for pubkey in pubkeys {
        builder = builder.push_data(&pubkey.sec());
    }
    builder
        .push_num(pubkeys.len() as u8)
        .push_opcode(script::OP_CHECKMULTISIG)
        .into_script()
}

/// P2SH wrapping a k-of-n multisig redeem script.
pub fn p2sh_p2ms(k: u8, pubkeys: &[PubKey], network: &Network) -> String {
    p2sh(&p2ms_redeem(k, pubkeys), network)
}

/// The v0 witness program `OP_0 <pubkey hash>` used as a P2SH redeem script.
pub fn p2wpkh_redeem(pubkey: &PubKey) -> Vec<u8> {
    Builder::new()
        .push_opcode(script::OP_0)
        .push_data(&hash160(&pubkey.sec()))
        .into_script()
}

/// P2SH wrapping a v0 witness program, the compatibility form of segwit.
pub fn p2sh_p2wpkh(pubkey: &PubKey, network: &Network) -> String {
    p2sh(&p2wpkh_redeem(pubkey), network)
}

/// Native segwit v0 pay-to-witness-pubkey-hash.
pub fn p2wpkh(pubkey: &PubKey, network: &Network) -> String {
    bech32::segwit_encode(network.hrp, 0, &hash160(&pubkey.sec())).expect("cannot fail")
}

/// Taproot: the tweaked output key as a v1 witness program.
pub fn p2tr(
    pubkey: &PubKey,
    root: Option<[u8; 32]>,
    network: &Network,
) -> Result<String, taproot::Error> {
    let output = taproot::output_key(pubkey, root)?;
    Ok(bech32::segwit_encode(network.hrp, 1, &output.x()).expect("cannot fail"))
}

/// Locking script of a P2PKH address.
pub fn script_pubkey_p2pkh(addr: &str, network: &Network) -> Result<Vec<u8>, Error> {
    let payload = base58::check_decode(addr)?;
    if payload.len() != 21 {
        return Err(Error::BadLength);
    }
    if payload[0] != network.p2pkh_prefix {
        return Err(Error::BadPrefix);
    }
    Ok(Builder::new()
        .push_opcode(script::OP_DUP)
        .push_opcode(script::OP_HASH160)
        .push_data(&payload[1..])
        .push_opcode(script::OP_EQUALVERIFY)
        .push_opcode(script::OP_CHECKSIG)
        .into_script())
}

/// Locking script of a P2SH address.
pub fn script_pubkey_p2sh(addr: &str, network: &Network) -> Result<Vec<u8>, Error> {
    let payload = base58::check_decode(addr)?;
    if payload.len() != 21 {
        return Err(Error::BadLength);
    }
    if payload[0] != network.p2sh_prefix {
        return Err(Error::BadPrefix);
    }
    Ok(Builder::new()
        .push_opcode(script::OP_HASH160)
        .push_data(&payload[1..])
        .push_opcode(script::OP_EQUAL)
        .into_script())
}

/// Locking script of a P2WPKH address.
pub fn script_pubkey_p2wpkh(addr: &str, network: &Network) -> Result<Vec<u8>, Error> {
    let (version, program) = bech32::segwit_decode(network.hrp, addr)?;
    if version != 0 || program.len() != 20 {
        return Err(Error::BadProgram);
    }
    Ok(Builder::new()
        .push_opcode(script::OP_0)
        .push_data(&program)
        .into_script())
}

/// Locking script of a P2TR address.
pub fn script_pubkey_p2tr(addr: &str, network: &Network) -> Result<Vec<u8>, Error> {
    let (version, program) = bech32::segwit_decode(network.hrp, addr)?;
    if version != 1 || program.len() != 32 {
        return Err(Error::BadProgram);
    }
    Ok(Builder::new()
        .push_opcode(script::OP_1)
        .push_data(&program)
        .into_script())
}

/// Locking script of any supported address: base58check P2PKH/P2SH, bech32
/// P2WPKH/P2WSH, bech32m P2TR.
pub fn script_pubkey(addr: &str, network: &Network) -> Result<Vec<u8>, Error> {
    let mut separator = network.hrp.to_string();
    separator.push('1');
    if addr.to_lowercase().starts_with(&separator) {
        let (version, program) = bech32::segwit_decode(network.hrp, addr)?;
        return match (version, program.len()) {
            (0, 20) | (0, 32) => Ok(Builder::new()
                .push_opcode(script::OP_0)
                .push_data(&program)
                .into_script()),
            (1, 32) => Ok(Builder::new()
                .push_opcode(script::OP_1)
                .push_data(&program)
                .into_script()),
            _ => Err(Error::BadProgram),
        };
    }
    let payload = base58::check_decode(addr)?;
    if payload.len() != 21 {
        return Err(Error::BadLength);
    }
    if payload[0] == network.p2pkh_prefix {
        script_pubkey_p2pkh(addr, network)
    } else if payload[0] == network.p2sh_prefix {
        script_pubkey_p2sh(addr, network)
    } else {
        Err(Error::BadPrefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PriKey;

    fn pubkey_one() -> PubKey {
        PriKey::from_u64(1).unwrap().pubkey()
    }

    #[test]
    fn p2pkh_addresses() {
        assert_eq!(
            p2pkh(&pubkey_one(), &Network::mainnet()),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
        assert_eq!(
            p2pkh(&pubkey_one(), &Network::testnet()),
            "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r"
        );
    }

    // https://en.bitcoin.it/wiki/Pay_to_script_hash
    #[test]
    fn p2sh_address() {
        let mut sec = vec![0x04];
        sec.extend(hex::decode("2f90074d7a5bf30c72cf3a8dfd1381bdbd30407010e878f3a11269d5f74a5878").unwrap());
        sec.extend(hex::decode("8505cdca22ea6eab7cfb40dc0e07aba200424ab0d79122a653ad0c7ec9896bdf").unwrap());
        let redeem = Builder::new()
            .push_opcode(script::OP_1)
            .push_data(&sec)
            .push_opcode(script::OP_1)
            .push_opcode(script::OP_CHECKMULTISIG)
            .into_script();
        assert_eq!(
            p2sh(&redeem, &Network::mainnet()),
            "3P14159f73E4gFr7JterCCQh9QjiTjiZrG"
        );
    }

    #[test]
    fn p2sh_p2ms_address() {
        let pubkeys: Vec<PubKey> = [
            "03150176a55b6d77eec5740c1f87f434cf416d5bbde1704bd816288a4466afb7bb",
            "02c3b2d3baf90e559346895b43253407fbb345c146910837b61f301f4c9a7edfe5",
            "02c6e3e94f7ff77457da9e76cf0779ca7c1e8575db064a2ea55400e6a9d8190225",
        ]
        .iter()
        .map(|s| PubKey::sec_decode(&hex::decode(s).unwrap()).unwrap())
        .collect();
        assert_eq!(
            p2sh_p2ms(2, &pubkeys, &Network::regtest()),
            "2MyxShnGQ5NifGb8CHYrtmzosRySxZ9pZo5"
        );
    }

    #[test]
    fn p2sh_p2wpkh_addresses() {
        assert_eq!(
            p2sh_p2wpkh(&pubkey_one(), &Network::mainnet()),
            "3JvL6Ymt8MVWiCNHC7oWU6nLeHNJKLZGLN"
        );
        assert_eq!(
            p2sh_p2wpkh(&pubkey_one(), &Network::testnet()),
            "2NAUYAHhujozruyzpsFRP63mbrdaU5wnEpN"
        );
    }

    #[test]
    fn p2wpkh_addresses() {
        assert_eq!(
            p2wpkh(&pubkey_one(), &Network::mainnet()),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
        assert_eq!(
            p2wpkh(&pubkey_one(), &Network::testnet()),
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
        );
    }

    #[test]
    fn p2tr_addresses() {
        assert_eq!(
            p2tr(&pubkey_one(), None, &Network::mainnet()).unwrap(),
            "bc1pmfr3p9j00pfxjh0zmgp99y8zftmd3s5pmedqhyptwy6lm87hf5sspknck9"
        );
        assert_eq!(
            p2tr(&pubkey_one(), None, &Network::testnet()).unwrap(),
            "tb1pmfr3p9j00pfxjh0zmgp99y8zftmd3s5pmedqhyptwy6lm87hf5ssk79hv2"
        );
    }

    #[test]
    fn script_pubkey_shapes() {
        let mainnet = Network::mainnet();
        let pubkey = pubkey_one();

        let script = script_pubkey(&p2pkh(&pubkey, &mainnet), &mainnet).unwrap();
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], script::OP_DUP);
        assert_eq!(&script[3..23], &hash160(&pubkey.sec()));

        let script = script_pubkey(&p2sh_p2wpkh(&pubkey, &mainnet), &mainnet).unwrap();
        assert_eq!(script.len(), 23);
        assert_eq!(script[0], script::OP_HASH160);

        let script = script_pubkey(&p2wpkh(&pubkey, &mainnet), &mainnet).unwrap();
        assert_eq!(script.len(), 22);
        assert_eq!(&script[..2], &[script::OP_0, 20]);
        assert_eq!(&script[2..], &hash160(&pubkey.sec()));

        let script = script_pubkey(&p2tr(&pubkey, None, &mainnet).unwrap(), &mainnet).unwrap();
        assert_eq!(script.len(), 34);
        assert_eq!(script[0], script::OP_1);
    }

    #[test]
    fn script_pubkey_rejects_wrong_network() {
        let addr = p2pkh(&pubkey_one(), &Network::mainnet());
        assert_eq!(
            script_pubkey(&addr, &Network::testnet()),
            Err(Error::BadPrefix)
        );
        let addr = p2wpkh(&pubkey_one(), &Network::mainnet());
        assert!(script_pubkey(&addr, &Network::testnet()).is_err());
    }
}
