//! Client-side bitcoin toolkit: address derivation for the standard script
//! families, transaction construction and wire codecs, the signature digest
//! algorithms of every spending generation, ECDSA and BIP-340 Schnorr
//! signing, taproot script trees, and a small wallet that selects coins,
//! estimates fees and broadcasts through a bitcoind JSON-RPC node.
//!
//! ```no_run
//! use mjolnir::{wallet, Network, PriKey};
//!
//! let network = Network::regtest();
//! let prikey = PriKey::from_u64(1).unwrap();
//! let user = wallet::Wallet::new(
//!     &network,
//!     wallet::P2wpkh::new(&network, prikey).into(),
//! );
//! println!("{} holds {} sat", user.address(), user.balance().unwrap());
//! ```

#![warn(
    unused_extern_crates,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::fallible_impl_from,
    clippy::dbg_macro
)]
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![forbid(unsafe_code)]

pub mod address;
pub mod amount;
pub mod base58;
pub mod bech32;
pub mod ecdsa;
pub mod hashes;
pub mod keys;
pub mod message;
pub mod network;
pub mod rpc;
pub mod schnorr;
pub mod script;
pub mod taproot;
pub mod transaction;
pub mod wallet;

pub use crate::keys::{PriKey, PubKey};
pub use crate::message::Message;
pub use crate::network::Network;
pub use crate::transaction::{HashType, OutPoint, Transaction, TxIn, TxOut};
pub use crate::wallet::{Analyzer, Signer, Utxo, Wallet};
