//! Bech32 and Bech32m codecs for segwit addresses, per BIP-173 and BIP-350.
//! Witness version 0 uses the Bech32 checksum constant, versions 1..=16 use
//! the Bech32m constant.

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
const CONST_BECH32: u32 = 1;
const CONST_BECH32M: u32 = 0x2bc830a3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Bech32,
    Bech32m,
}

impl Variant {
    /// The checksum variant a segwit witness version must use.
    fn of_version(version: u8) -> Variant {
        if version == 0 {
            Variant::Bech32
        } else {
            Variant::Bech32m
        }
    }

    fn constant(self) -> u32 {
        match self {
            Variant::Bech32 => CONST_BECH32,
            Variant::Bech32m => CONST_BECH32M,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("bech32 string is longer than 90 characters")]
    TooLong,
    #[error("bech32 string contains a character outside the us-ascii printable range")]
    BadCharacterRange,
    #[error("bech32 string has no separator, an empty hrp, or a short checksum")]
    BadSeparator,
    #[error("bech32 data part contains a character outside the bech32 alphabet")]
    BadCharacter,
    #[error("bech32 checksum mismatch")]
    BadChecksum,
    #[error("witness version must be in 0..=16")]
    BadVersion,
    #[error("witness program must be 2 to 40 bytes")]
    BadProgramLength,
    #[error("bit regrouping left more than 4 bits or a non-zero remainder")]
    BadPadding,
    #[error("human readable part mismatch")]
    BadHrp,
    #[error("checksum variant does not match the witness version")]
    BadVariant,
}

fn polymod(data: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &value in data {
        let top = chk >> 25;
        chk = (chk & 0x1ffffff) << 5 ^ u32::from(value);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(hrp.len() * 2 + 1);
    out.extend(hrp.bytes().map(|c| c >> 5));
    out.push(0);
    out.extend(hrp.bytes().map(|c| c & 31));
    out
}

fn create_checksum(hrp: &str, variant: Variant, data: &[u8]) -> [u8; 6] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; 6]);
    let pmod = polymod(&values) ^ variant.constant();
    let mut out = [0u8; 6];
    for (i, item) in out.iter_mut().enumerate() {
        *item = ((pmod >> (5 * (5 - i))) & 31) as u8;
    }
    out
}

/// Regroup 8-bit bytes into 5-bit symbols, zero-padding the tail.
fn regroup_5(data: &[u8]) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(data.len() * 8 / 5 + 1);
    for &byte in data {
        acc = (acc << 8 | u32::from(byte)) & 0xfff;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    out
}

/// Regroup 5-bit symbols into 8-bit bytes. The incomplete tail group must be
/// at most 4 bits and all zeroes.
fn regroup_8(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(data.len() * 5 / 8);
    for &symbol in data {
        debug_assert!(symbol <= 0x1f);
        acc = (acc << 5 | u32::from(symbol)) & 0xfff;
        bits += 5;
        while bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    if bits >= 5 || acc & ((1 << bits) - 1) != 0 {
        return Err(Error::BadPadding);
    }
    Ok(out)
}

/// Assemble `hrp ‖ '1' ‖ data ‖ checksum` from 5-bit data symbols.
pub fn encode(hrp: &str, variant: Variant, data: &[u8]) -> String {
    let checksum = create_checksum(hrp, variant, data);
    let mut out = String::with_capacity(hrp.len() + 1 + data.len() + 6);
    out.push_str(hrp);
    out.push('1');
    for &symbol in data.iter().chain(checksum.iter()) {
        out.push(char::from(CHARSET[usize::from(symbol)]));
    }
    out
}

/// Validate a bech32 string and split it into hrp, 5-bit data symbols with
/// the checksum removed, and the checksum variant that verified.
pub fn decode(bech: &str) -> Result<(String, Vec<u8>, Variant), Error> {
    if bech.len() > 90 {
        return Err(Error::TooLong);
    }
    if bech.bytes().any(|c| !(b'!'..=b'~').contains(&c)) {
        return Err(Error::BadCharacterRange);
    }
    let bech = bech.to_lowercase();
    let pos = bech.rfind('1').ok_or(Error::BadSeparator)?;
    if pos == 0 || pos + 7 > bech.len() {
        return Err(Error::BadSeparator);
    }
    let hrp = &bech[..pos];
    let mut data = Vec::with_capacity(bech.len() - pos - 1);
    for c in bech.bytes().skip(pos + 1) {
        let symbol = CHARSET
            .iter()
            .position(|&a| a == c)
            .ok_or(Error::BadCharacter)?;
        data.push(symbol as u8);
    }
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(&data);
    let variant = match polymod(&values) {
        CONST_BECH32 => Variant::Bech32,
        CONST_BECH32M => Variant::Bech32m,
        _ => return Err(Error::BadChecksum),
    };
    data.truncate(data.len() - 6);
    Ok((hrp.to_string(), data, variant))
}

/// Encode a segwit address from the witness version and 8-bit program.
pub fn segwit_encode(hrp: &str, version: u8, program: &[u8]) -> Result<String, Error> {
    if version > 16 {
        return Err(Error::BadVersion);
    }
    if !(2..=40).contains(&program.len()) {
        return Err(Error::BadProgramLength);
    }
    let mut data = vec![version];
    data.extend(regroup_5(program));
    Ok(encode(hrp, Variant::of_version(version), &data))
}

/// Decode a segwit address into its witness version and 8-bit program.
pub fn segwit_decode(hrp: &str, addr: &str) -> Result<(u8, Vec<u8>), Error> {
    let (decoded_hrp, data, variant) = decode(addr)?;
    if decoded_hrp != hrp {
        return Err(Error::BadHrp);
    }
    let version = *data.first().ok_or(Error::BadSeparator)?;
    if version > 16 {
        return Err(Error::BadVersion);
    }
    if variant != Variant::of_version(version) {
        return Err(Error::BadVariant);
    }
    let program = regroup_8(&data[1..])?;
    if !(2..=40).contains(&program.len()) {
        return Err(Error::BadProgramLength);
    }
    Ok((version, program))
}
