//! ECDSA over secp256k1, following SEC 1 v2 §4.1: signing with a recovery
//! id, verification, and public key recovery. Only the field and group
//! arithmetic comes from `k256`; the protocol lives here.

use k256::elliptic_curve::{
    bigint::Encoding,
    group::Group,
    ops::Reduce,
    point::AffineCoordinates,
    sec1::FromEncodedPoint,
    Curve, Field, PrimeField,
};
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar, Secp256k1, U256};
use rand::rngs::OsRng;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("recovery id must be in 0..=3")]
    BadRecoveryId,
    #[error("signature does not describe a curve point")]
    BadPoint,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DerError {
    #[error("der signature does not start with a sequence tag")]
    BadSequence,
    #[error("der length field does not match the data")]
    BadLength,
    #[error("der integer is missing, negative, or padded")]
    BadInteger,
    #[error("der integer is not a valid scalar")]
    BadScalar,
}

pub(crate) fn scalar_from_be_bytes(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_repr((*bytes).into()))
}

pub(crate) fn scalar_reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&(*bytes).into())
}

/// Sign `m` with `prikey`, redrawing the nonce until both signature halves
/// are non-zero. Returns `(r, s, v)` where the recovery id `v` carries the
/// parity of `y(kG)` in bit 0 and the `x(kG) >= n` overflow in bit 1. The
/// low-S rule is applied by the caller.
pub fn sign(prikey: &Scalar, m: &Scalar) -> (Scalar, Scalar, u8) {
    loop {
        let k = Scalar::random(&mut OsRng);
        if bool::from(k.is_zero()) {
            continue;
        }
        let point = (ProjectivePoint::GENERATOR * k).to_affine();
        let x = point.x();
        let r = <Scalar as Reduce<U256>>::reduce_bytes(&x);
        if bool::from(r.is_zero()) {
            continue;
        }
        let k_inv = match Option::<Scalar>::from(k.invert()) {
            Some(k_inv) => k_inv,
            None => continue,
        };
        let s = (*m + r * prikey) * k_inv;
        if bool::from(s.is_zero()) {
            continue;
        }
        let mut v = point.y_is_odd().unwrap_u8();
        if U256::from_be_slice(x.as_slice()) >= Secp256k1::ORDER {
            v |= 2;
        }
        return (r, s, v);
    }
}

pub fn verify(pubkey: &ProjectivePoint, m: &Scalar, r: &Scalar, s: &Scalar) -> bool {
    let s_inv = match Option::<Scalar>::from(s.invert()) {
        Some(s_inv) => s_inv,
        None => return false,
    };
    let u1 = *m * s_inv;
    let u2 = *r * s_inv;
    let point = ProjectivePoint::GENERATOR * u1 + *pubkey * u2;
    if bool::from(point.is_identity()) {
        return false;
    }
    <Scalar as Reduce<U256>>::reduce_bytes(&point.to_affine().x()) == *r
}

/// Reconstruct the public key from a signature and its recovery id:
/// Q = (sR - mG) / r, where R is rebuilt from `r` and the two bits of `v`.
pub fn recover(m: &Scalar, r: &Scalar, s: &Scalar, v: u8) -> Result<ProjectivePoint, RecoveryError> {
    if v > 3 {
        return Err(RecoveryError::BadRecoveryId);
    }
    if bool::from(r.is_zero()) {
        return Err(RecoveryError::BadPoint);
    }
    let mut x = U256::from_be_slice(r.to_bytes().as_slice());
    if v & 2 != 0 {
        x = x.wrapping_add(&Secp256k1::ORDER);
    }
    let mut sec = [0u8; 33];
    sec[0] = 0x02 + (v & 1);
    sec[1..].copy_from_slice(&x.to_be_bytes());
    let encoded = EncodedPoint::from_bytes(sec).map_err(|_| RecoveryError::BadPoint)?;
    let big_r = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(RecoveryError::BadPoint)?;
    let r_inv = Option::<Scalar>::from(r.invert()).ok_or(RecoveryError::BadPoint)?;
    Ok((ProjectivePoint::from(big_r) * s - ProjectivePoint::GENERATOR * m) * r_inv)
}

fn trimmed(bytes: &[u8; 32]) -> Vec<u8> {
    let start = bytes.iter().take_while(|&&b| b == 0).count().min(31);
    let mut out = Vec::with_capacity(34);
    if bytes[start] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

/// DER-encode a signature: each scalar big-endian with leading zeros
/// stripped, re-padded with a single 0x00 when the high bit would read as a
/// sign bit.
pub fn der_encode(r: &Scalar, s: &Scalar) -> Vec<u8> {
    let r = trimmed(&r.to_bytes().into());
    let s = trimmed(&s.to_bytes().into());
    let mut out = Vec::with_capacity(r.len() + s.len() + 6);
    out.push(0x30);
    out.push((r.len() + s.len() + 4) as u8);
    out.push(0x02);
    out.push(r.len() as u8);
    out.extend_from_slice(&r);
    out.push(0x02);
    out.push(s.len() as u8);
    out.extend_from_slice(&s);
    out
}

fn der_read_scalar(data: &[u8]) -> Result<(Scalar, &[u8]), DerError> {
    if data.len() < 3 || data[0] != 0x02 {
        return Err(DerError::BadInteger);
    }
    let len = usize::from(data[1]);
    if len == 0 || data.len() < 2 + len {
        return Err(DerError::BadInteger);
    }
    let bytes = &data[2..2 + len];
    if bytes[0] & 0x80 != 0 {
        return Err(DerError::BadInteger);
    }
    if len > 1 && bytes[0] == 0x00 && bytes[1] & 0x80 == 0 {
        return Err(DerError::BadInteger);
    }
    let bytes = if bytes[0] == 0x00 { &bytes[1..] } else { bytes };
    if bytes.len() > 32 {
        return Err(DerError::BadScalar);
    }
    let mut repr = [0u8; 32];
    repr[32 - bytes.len()..].copy_from_slice(bytes);
    let scalar = scalar_from_be_bytes(&repr).ok_or(DerError::BadScalar)?;
    Ok((scalar, &data[2 + len..]))
}

pub fn der_decode(data: &[u8]) -> Result<(Scalar, Scalar), DerError> {
    if data.len() < 2 || data[0] != 0x30 {
        return Err(DerError::BadSequence);
    }
    if usize::from(data[1]) != data.len() - 2 {
        return Err(DerError::BadLength);
    }
    let (r, rest) = der_read_scalar(&data[2..])?;
    let (s, rest) = der_read_scalar(rest)?;
    if !rest.is_empty() {
        return Err(DerError::BadLength);
    }
    Ok((r, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn random_scalar() -> Scalar {
        loop {
            let scalar = Scalar::random(&mut OsRng);
            if !bool::from(scalar.is_zero()) {
                return scalar;
            }
        }
    }

    #[test]
    fn sign_verify_recover() {
        for _ in 0..8 {
            let prikey = random_scalar();
            let pubkey = ProjectivePoint::GENERATOR * prikey;
            let m = random_scalar();
            let (r, s, v) = sign(&prikey, &m);
            assert!(verify(&pubkey, &m, &r, &s));
            assert_eq!(recover(&m, &r, &s, v).unwrap(), pubkey);
        }
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let prikey = random_scalar();
        let pubkey = ProjectivePoint::GENERATOR * prikey;
        let m = random_scalar();
        let (r, s, _) = sign(&prikey, &m);
        assert!(!verify(&pubkey, &(m + Scalar::ONE), &r, &s));
    }

    #[test]
    fn low_s_flip_recovers_same_key() {
        // Whichever half of the group s lands in, negating it and flipping
        // the recovery parity must point back to the same key.
        let prikey = random_scalar();
        let pubkey = ProjectivePoint::GENERATOR * prikey;
        let m = random_scalar();
        let (r, s, v) = sign(&prikey, &m);
        assert_eq!(recover(&m, &r, &(-s), v ^ 1).unwrap(), pubkey);
    }

    #[test]
    fn der_known_shape() {
        let r = Scalar::ONE;
        let s = Scalar::from(0x80u64);
        let der = der_encode(&r, &s);
        // 0x80 needs a sign-padding zero, 1 does not.
        assert_eq!(der, vec![0x30, 0x07, 0x02, 0x01, 0x01, 0x02, 0x02, 0x00, 0x80]);
        assert_eq!(der_decode(&der).unwrap(), (r, s));
    }

    #[test]
    fn der_rejects_non_canonical_padding() {
        // 0x02 0x02 0x00 0x01 is a padded form of the integer 1.
        let data = [0x30, 0x08, 0x02, 0x02, 0x00, 0x01, 0x02, 0x02, 0x00, 0x80];
        assert_eq!(der_decode(&data), Err(DerError::BadInteger));
    }

    proptest! {
        #[test]
        fn der_round_trip(r_bytes in any::<[u8; 32]>(), s_bytes in any::<[u8; 32]>()) {
            let r = scalar_reduce(&r_bytes);
            let s = scalar_reduce(&s_bytes);
            prop_assert_eq!(der_decode(&der_encode(&r, &s)).unwrap(), (r, s));
        }
    }
}
