//! "Bitcoin Signed Message" signatures: a recoverable ECDSA signature over
//! a tagged double-SHA256 of the text, carried as base64.

use crate::hashes::hash256;
use crate::keys::{PriKey, PubKey};
use crate::transaction::compact_size_encode;
use crate::ecdsa;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const PREFIX: &[u8] = b"Bitcoin Signed Message:\n";

/// The header byte is 31 + recovery id; this range marks a signature made
/// with a compressed-pubkey P2PKH key, the only form produced here.
const HEADER_BASE: u8 = 31;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("signature is not valid base64")]
    BadBase64(#[from] base64::DecodeError),
    #[error("signature must decode to 65 bytes")]
    BadLength,
    #[error("header byte is outside the compressed-pubkey p2pkh range")]
    BadHeader,
    #[error("signature scalar is out of range")]
    BadScalar,
    #[error(transparent)]
    Recovery(#[from] ecdsa::RecoveryError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Message {
        Message { text: text.into() }
    }

    /// hash256(cs(24) ‖ "Bitcoin Signed Message:\n" ‖ cs(|m|) ‖ m).
    pub fn digest(&self) -> [u8; 32] {
        let mut data = compact_size_encode(PREFIX.len() as u64);
        data.extend_from_slice(PREFIX);
        data.extend(compact_size_encode(self.text.len() as u64));
        data.extend_from_slice(self.text.as_bytes());
        hash256(&data)
    }

    /// base64((31 + v) ‖ r ‖ s).
    pub fn sign(&self, prikey: &PriKey) -> String {
        let (r, s, v) = prikey.sign_ecdsa(&self.digest());
        let mut data = Vec::with_capacity(65);
        data.push(HEADER_BASE + v);
        data.extend_from_slice(&r.to_bytes());
        data.extend_from_slice(&s.to_bytes());
        STANDARD.encode(data)
    }

    /// Recover the public key that made this signature.
    pub fn recover(&self, signature: &str) -> Result<PubKey, Error> {
        let data = STANDARD.decode(signature)?;
        if data.len() != 65 {
            return Err(Error::BadLength);
        }
        if !(HEADER_BASE..HEADER_BASE + 4).contains(&data[0]) {
            return Err(Error::BadHeader);
        }
        let v = data[0] - HEADER_BASE;
        let mut r_bytes = [0u8; 32];
        r_bytes.copy_from_slice(&data[1..33]);
        let mut s_bytes = [0u8; 32];
        s_bytes.copy_from_slice(&data[33..65]);
        let r = ecdsa::scalar_from_be_bytes(&r_bytes).ok_or(Error::BadScalar)?;
        let s = ecdsa::scalar_from_be_bytes(&s_bytes).ok_or(Error::BadScalar)?;
        Ok(PubKey::recover(&self.digest(), &r, &s, v)?)
    }

    /// Check that the signature was made by `pubkey`.
    pub fn verify(&self, signature: &str, pubkey: &PubKey) -> Result<bool, Error> {
        Ok(self.recover(signature)? == *pubkey)
    }
}
