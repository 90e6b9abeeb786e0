//! BIP-340 Schnorr signatures over secp256k1.
//!
//! Keys are implicitly even-Y: whenever a point with an odd y coordinate
//! shows up, the private side negates its scalar and the public side negates
//! the point before anything is hashed.

use crate::hashes::tag_hash;
use crate::keys::PubKey;
use k256::elliptic_curve::{point::AffineCoordinates, Field};
use k256::{ProjectivePoint, Scalar};
use rand::rngs::OsRng;

/// Negate the scalar when its public point has an odd y coordinate.
pub(crate) fn even_scalar(scalar: Scalar) -> Scalar {
    let point = (ProjectivePoint::GENERATOR * scalar).to_affine();
    if bool::from(point.y_is_odd()) {
        -scalar
    } else {
        scalar
    }
}

fn challenge(rx: &[u8; 32], px: &[u8; 32], m: &[u8; 32]) -> Scalar {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(rx);
    data.extend_from_slice(px);
    data.extend_from_slice(m);
    crate::ecdsa::scalar_reduce(&tag_hash("BIP0340/challenge", &data))
}

/// Sign a 32-byte message, returning `x(R) ‖ s`.
pub fn sign(prikey: &Scalar, m: &[u8; 32]) -> [u8; 64] {
    let d = even_scalar(*prikey);
    let px: [u8; 32] = (ProjectivePoint::GENERATOR * d).to_affine().x().into();
    loop {
        let k = Scalar::random(&mut OsRng);
        if bool::from(k.is_zero()) {
            continue;
        }
        let k = even_scalar(k);
        let rx: [u8; 32] = (ProjectivePoint::GENERATOR * k).to_affine().x().into();
        let e = challenge(&rx, &px, m);
        let s = k + e * d;
        if bool::from(s.is_zero()) {
            continue;
        }
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&rx);
        sig[32..].copy_from_slice(&s.to_bytes());
        return sig;
    }
}

/// Verify `s·G = R + e·P` with the even-Y normalized public key.
pub fn verify(pubkey: &PubKey, m: &[u8; 32], sig: &[u8; 64]) -> bool {
    let pubkey = pubkey.even_y();
    let mut rx = [0u8; 32];
    rx.copy_from_slice(&sig[..32]);
    let big_r = match PubKey::lift_x(rx) {
        Ok(point) => point,
        Err(_) => return false,
    };
    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&sig[32..]);
    let s = match crate::ecdsa::scalar_from_be_bytes(&s_bytes) {
        Some(s) => s,
        None => return false,
    };
    let e = challenge(&rx, &pubkey.x(), m);
    ProjectivePoint::GENERATOR * s == big_r.point() + pubkey.point() * e
}
