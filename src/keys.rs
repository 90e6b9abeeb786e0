use crate::network::Network;
use crate::{base58, ecdsa, schnorr};
use k256::elliptic_curve::{
    point::AffineCoordinates,
    scalar::IsHigh,
    sec1::{FromEncodedPoint, ToEncodedPoint},
    Field,
};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use std::fmt;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("private key scalar must be in [1, n-1]")]
    ScalarRange,
    #[error("sec1 prefix byte must be 0x02, 0x03 or 0x04")]
    BadSec1Prefix,
    #[error("sec1 encoding has the wrong length for its prefix")]
    BadSec1Length,
    #[error("point is not on the secp256k1 curve")]
    OffCurve,
    #[error("wallet import format payload is malformed")]
    BadWif,
    #[error(transparent)]
    Base58(#[from] base58::Error),
}

/// A private scalar in [1, n-1]. Immutable after construction.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PriKey {
    scalar: Scalar,
}

impl PriKey {
    pub fn new(bytes: [u8; 32]) -> Result<PriKey, Error> {
        let scalar = ecdsa::scalar_from_be_bytes(&bytes).ok_or(Error::ScalarRange)?;
        PriKey::from_scalar(scalar)
    }

    pub(crate) fn from_scalar(scalar: Scalar) -> Result<PriKey, Error> {
        if bool::from(scalar.is_zero()) {
            return Err(Error::ScalarRange);
        }
        Ok(PriKey { scalar })
    }

    /// Small-integer constructor, mostly useful in tests and examples.
    pub fn from_u64(n: u64) -> Result<PriKey, Error> {
        PriKey::from_scalar(Scalar::from(n))
    }

    pub fn random() -> PriKey {
        loop {
            if let Ok(prikey) = PriKey::from_scalar(Scalar::random(&mut OsRng)) {
                return prikey;
            }
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.scalar.to_bytes().into()
    }

    pub(crate) fn scalar(&self) -> Scalar {
        self.scalar
    }

    pub fn pubkey(&self) -> PubKey {
        PubKey {
            point: (ProjectivePoint::GENERATOR * self.scalar).to_affine(),
        }
    }

    /// Wallet import format: base58check(prefix ‖ scalar ‖ 0x01). The
    /// trailing 0x01 marks a compressed public key.
    pub fn wif(&self, network: &Network) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(network.wif_prefix);
        payload.extend_from_slice(&self.to_bytes());
        payload.push(0x01);
        base58::check_encode(&payload)
    }

    pub fn from_wif(network: &Network, wif: &str) -> Result<PriKey, Error> {
        let payload = base58::check_decode(wif)?;
        if payload.len() != 34 || payload[0] != network.wif_prefix || payload[33] != 0x01 {
            return Err(Error::BadWif);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload[1..33]);
        PriKey::new(bytes)
    }

    /// ECDSA with low-S enforcement. Negating s flips the parity bit of the
    /// recovery id, so recovery keeps working on the canonical half.
    pub fn sign_ecdsa(&self, digest: &[u8; 32]) -> (Scalar, Scalar, u8) {
        let m = ecdsa::scalar_reduce(digest);
        let (r, mut s, mut v) = ecdsa::sign(&self.scalar, &m);
        if bool::from(s.is_high()) {
            s = -s;
            v ^= 1;
        }
        (r, s, v)
    }

    pub fn sign_ecdsa_der(&self, digest: &[u8; 32]) -> Vec<u8> {
        let (r, s, _) = self.sign_ecdsa(digest);
        ecdsa::der_encode(&r, &s)
    }

    pub fn sign_schnorr(&self, digest: &[u8; 32]) -> [u8; 64] {
        schnorr::sign(&self.scalar, digest)
    }
}

impl fmt::Debug for PriKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Not printing key material.
        write!(f, "PriKey(..)")
    }
}

/// An affine point on secp256k1. Construction rejects anything off the
/// curve.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PubKey {
    point: AffinePoint,
}

impl PubKey {
    pub fn new(x: [u8; 32], y: [u8; 32]) -> Result<PubKey, Error> {
        let mut sec = [0u8; 65];
        sec[0] = 0x04;
        sec[1..33].copy_from_slice(&x);
        sec[33..].copy_from_slice(&y);
        PubKey::sec_decode(&sec)
    }

    /// SEC1 compressed form: parity prefix then the x coordinate.
    pub fn sec(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out.copy_from_slice(self.point.to_encoded_point(true).as_bytes());
        out
    }

    /// Parse SEC1 bytes, compressed (0x02/0x03) or uncompressed (0x04).
    pub fn sec_decode(data: &[u8]) -> Result<PubKey, Error> {
        let expected_len = match data.first() {
            Some(0x02) | Some(0x03) => 33,
            Some(0x04) => 65,
            _ => return Err(Error::BadSec1Prefix),
        };
        if data.len() != expected_len {
            return Err(Error::BadSec1Length);
        }
        let encoded = EncodedPoint::from_bytes(data).map_err(|_| Error::OffCurve)?;
        let point = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or(Error::OffCurve)?;
        Ok(PubKey { point })
    }

    /// Decompress an x-only key to its even-Y point, per BIP-340.
    pub fn lift_x(x: [u8; 32]) -> Result<PubKey, Error> {
        let mut sec = [0u8; 33];
        sec[0] = 0x02;
        sec[1..].copy_from_slice(&x);
        PubKey::sec_decode(&sec)
    }

    pub fn x(&self) -> [u8; 32] {
        self.point.x().into()
    }

    pub fn y(&self) -> [u8; 32] {
        let encoded = self.point.to_encoded_point(false);
        let mut out = [0u8; 32];
        out.copy_from_slice(&encoded.as_bytes()[33..65]);
        out
    }

    pub fn y_is_odd(&self) -> bool {
        self.point.y_is_odd().into()
    }

    /// The even-Y twin of this key: itself, or its negation when y is odd.
    pub fn even_y(&self) -> PubKey {
        if self.y_is_odd() {
            PubKey {
                point: (-self.point()).to_affine(),
            }
        } else {
            *self
        }
    }

    pub(crate) fn point(&self) -> ProjectivePoint {
        ProjectivePoint::from(self.point)
    }

    pub(crate) fn from_point(point: ProjectivePoint) -> Result<PubKey, Error> {
        if bool::from(k256::elliptic_curve::group::Group::is_identity(&point)) {
            return Err(Error::OffCurve);
        }
        Ok(PubKey {
            point: point.to_affine(),
        })
    }

    pub fn verify_ecdsa(&self, digest: &[u8; 32], r: &Scalar, s: &Scalar) -> bool {
        ecdsa::verify(&self.point(), &ecdsa::scalar_reduce(digest), r, s)
    }

    pub fn verify_schnorr(&self, digest: &[u8; 32], sig: &[u8; 64]) -> bool {
        schnorr::verify(self, digest, sig)
    }

    /// Recover the signing key from an ECDSA signature and recovery id.
    pub fn recover(
        digest: &[u8; 32],
        r: &Scalar,
        s: &Scalar,
        v: u8,
    ) -> Result<PubKey, ecdsa::RecoveryError> {
        let point = ecdsa::recover(&ecdsa::scalar_reduce(digest), r, s, v)?;
        PubKey::from_point(point).map_err(|_| ecdsa::RecoveryError::BadPoint)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", hex::encode(self.sec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prikey_one_pubkey() -> PubKey {
        PriKey::from_u64(1).unwrap().pubkey()
    }

    #[test]
    fn generator_coordinates() {
        let pubkey = prikey_one_pubkey();
        assert_eq!(
            hex::encode(pubkey.x()),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(pubkey.y()),
            "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn sec_compressed_round_trip() {
        let pubkey = prikey_one_pubkey();
        assert_eq!(
            hex::encode(pubkey.sec()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(PubKey::sec_decode(&pubkey.sec()).unwrap(), pubkey);
    }

    #[test]
    fn sec_uncompressed_decode() {
        let pubkey = prikey_one_pubkey();
        let mut sec = vec![0x04];
        sec.extend_from_slice(&pubkey.x());
        sec.extend_from_slice(&pubkey.y());
        assert_eq!(PubKey::sec_decode(&sec).unwrap(), pubkey);
    }

    #[test]
    fn sec_decode_rejects_bad_prefix() {
        assert_eq!(
            PubKey::sec_decode(&[0x05; 33]),
            Err(Error::BadSec1Prefix)
        );
    }

    #[test]
    fn rejects_zero_scalar() {
        assert_eq!(PriKey::new([0u8; 32]), Err(Error::ScalarRange));
        assert_eq!(PriKey::from_u64(0), Err(Error::ScalarRange));
    }

    #[test]
    fn rejects_off_curve_point() {
        // x = 5 has no square root of x^3 + 7.
        let mut x = [0u8; 32];
        x[31] = 5;
        assert_eq!(PubKey::lift_x(x), Err(Error::OffCurve));
    }

    #[test]
    fn wif_round_trip() {
        let prikey = PriKey::from_u64(1).unwrap();
        let mainnet = Network::mainnet();
        assert_eq!(
            prikey.wif(&mainnet),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
        );
        assert_eq!(PriKey::from_wif(&mainnet, &prikey.wif(&mainnet)).unwrap(), prikey);
        let testnet = Network::testnet();
        assert_eq!(
            prikey.wif(&testnet),
            "cMahea7zqjxrtgAbB7LSGbcQUr1uX1ojuat9jZodMN87JcbXMTcA"
        );
        assert_eq!(PriKey::from_wif(&testnet, &prikey.wif(&testnet)).unwrap(), prikey);
    }

    #[test]
    fn ecdsa_through_keys() {
        let prikey = PriKey::random();
        let digest = crate::hashes::hash256(b"message");
        let (r, s, v) = prikey.sign_ecdsa(&digest);
        assert!(!bool::from(s.is_high()));
        assert!(prikey.pubkey().verify_ecdsa(&digest, &r, &s));
        assert_eq!(PubKey::recover(&digest, &r, &s, v).unwrap(), prikey.pubkey());
    }

    #[test]
    fn even_y_has_even_y() {
        for n in 1u64..=16 {
            let pubkey = PriKey::from_u64(n).unwrap().pubkey().even_y();
            assert!(!pubkey.y_is_odd());
        }
    }
}
