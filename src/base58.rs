use crate::hashes::hash256;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("character is not part of the base58 alphabet")]
    BadCharacter,
    #[error("base58check payload is too short to contain a checksum")]
    TooShort,
    #[error("base58check checksum mismatch")]
    BadChecksum,
}

/// Encode bytes as a base58 string. The input is treated as a big-endian
/// integer; each leading zero byte becomes a leading '1'.
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    // Base58 digits, least significant first.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(char::from(ALPHABET[usize::from(digit)]));
    }
    out
}

/// Decode a base58 string, returning bytes.
pub fn decode(s: &str) -> Result<Vec<u8>, Error> {
    let zeros = s.bytes().take_while(|&c| c == b'1').count();
    // Bytes of the big-endian integer, least significant first.
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len() * 733 / 1000 + 1);
    for c in s.bytes().skip(zeros) {
        let mut carry = ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or(Error::BadCharacter)? as u32;
        for byte in bytes.iter_mut() {
            carry += u32::from(*byte) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// Encode with a trailing hash256 checksum, as used by addresses and WIF.
pub fn check_encode(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&hash256(payload)[..4]);
    encode(&data)
}

/// Decode and verify a base58check string, returning the payload without
/// its checksum.
pub fn check_decode(s: &str) -> Result<Vec<u8>, Error> {
    let mut data = decode(s)?;
    if data.len() < 4 {
        return Err(Error::TooShort);
    }
    let payload_len = data.len() - 4;
    if data[payload_len..] != hash256(&data[..payload_len])[..4] {
        return Err(Error::BadChecksum);
    }
    data.truncate(payload_len);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_known_value() {
        assert_eq!(encode(&hex::decode("626262").unwrap()), "a3gV");
        assert_eq!(decode("a3gV").unwrap(), hex::decode("626262").unwrap());
    }

    #[test]
    fn leading_zeros_are_preserved() {
        assert_eq!(encode(&[0, 0, 1]), "112");
        assert_eq!(decode("112").unwrap(), vec![0, 0, 1]);
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_bad_character() {
        assert_eq!(decode("0O"), Err(Error::BadCharacter));
    }

    #[test]
    fn check_round_trip() {
        let payload = b"payload".to_vec();
        assert_eq!(check_decode(&check_encode(&payload)).unwrap(), payload);
    }

    #[test]
    fn check_rejects_corruption() {
        let mut s = check_encode(b"payload").into_bytes();
        s[0] = if s[0] == b'2' { b'3' } else { b'2' };
        let s = String::from_utf8(s).unwrap();
        assert_eq!(check_decode(&s), Err(Error::BadChecksum));
    }

    proptest! {
        #[test]
        fn round_trip(data in proptest::collection::vec(any::<u8>(), 0..128)) {
            prop_assert_eq!(decode(&encode(&data)).unwrap(), data);
        }
    }
}
