//! Network profiles.
//!
//! A [`Network`] value is threaded explicitly through address derivation,
//! WIF handling and the wallet; nothing in the crate reads process-global
//! state. Pick one of the three profiles up front and pass it around.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    /// Version byte of base58check P2PKH addresses.
    pub p2pkh_prefix: u8,
    /// Version byte of base58check P2SH addresses.
    pub p2sh_prefix: u8,
    /// Version byte of wallet import format private keys.
    pub wif_prefix: u8,
    /// Human readable part of bech32 segwit addresses.
    pub hrp: &'static str,
    pub rpc: RpcEndpoint,
}

impl Network {
    pub fn mainnet() -> Network {
        Network {
            p2pkh_prefix: 0x00,
            p2sh_prefix: 0x05,
            wif_prefix: 0x80,
            hrp: "bc",
            rpc: RpcEndpoint {
                url: "https://bitcoin.drpc.org".to_string(),
                username: String::new(),
                password: String::new(),
            },
        }
    }

    pub fn testnet() -> Network {
        Network {
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            wif_prefix: 0xef,
            hrp: "tb",
            rpc: RpcEndpoint {
                url: "https://bitcoin-testnet.drpc.org".to_string(),
                username: String::new(),
                password: String::new(),
            },
        }
    }

    pub fn regtest() -> Network {
        Network {
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            wif_prefix: 0xef,
            hrp: "bcrt",
            rpc: RpcEndpoint {
                url: "http://127.0.0.1:18443".to_string(),
                username: "user".to_string(),
                password: "pass".to_string(),
            },
        }
    }
}
