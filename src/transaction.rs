//! The transaction model, its two wire encodings and the signature digest
//! algorithms for every spending generation: legacy, segwit v0 (BIP-143)
//! and segwit v1 key/script path (BIP-341).

use crate::hashes::{hash256, sha256, tag_hash};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("input ended before the structure was complete")]
    ShortRead,
    #[error("trailing bytes after the structure")]
    TrailingBytes,
    #[error("segwit marker is not followed by flag 0x01")]
    BadSegwitFlag,
    #[error("hash type byte is not in the allowed set")]
    BadHashType,
}

/// Encode the 1/3/5/9-byte variable length prefix.
pub fn compact_size_encode(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x10000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}

/// Decode a complete compact size encoding.
pub fn compact_size_decode(data: &[u8]) -> Result<u64, DecodeError> {
    let mut reader = Reader::new(data);
    let n = reader.compact_size()?;
    reader.finish()?;
    Ok(n)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::ShortRead)?;
        if end > self.data.len() {
            return Err(DecodeError::ShortRead);
        }
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32_le(&mut self) -> Result<u32, DecodeError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64_le(&mut self) -> Result<u64, DecodeError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn compact_size(&mut self) -> Result<u64, DecodeError> {
        match self.u8()? {
            0xfd => {
                let mut bytes = [0u8; 2];
                bytes.copy_from_slice(self.take(2)?);
                Ok(u64::from(u16::from_le_bytes(bytes)))
            }
            0xfe => Ok(u64::from(self.u32_le()?)),
            0xff => self.u64_le(),
            n => Ok(u64::from(n)),
        }
    }

    fn bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.compact_size()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn txid(&mut self) -> Result<[u8; 32], DecodeError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn finish(&self) -> Result<(), DecodeError> {
        if self.pos != self.data.len() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(())
    }
}

/// A reference to a previous transaction output. The txid is kept in
/// internal byte order, the reverse of the hex that explorers and the node
/// display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> OutPoint {
        OutPoint { txid, vout }
    }

    pub fn serialize(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(&self.txid);
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }

    /// Fetch the output this points at from the node.
    pub fn load(&self, client: &crate::rpc::Client) -> anyhow::Result<TxOut> {
        client.tx_out(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub out_point: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// The segwit witness stack. An input is segwit iff this is non-empty.
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn new(out_point: OutPoint, script_sig: Vec<u8>, sequence: u32, witness: Vec<Vec<u8>>) -> TxIn {
        TxIn {
            out_point,
            script_sig,
            sequence,
            witness,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> TxOut {
        TxOut {
            value,
            script_pubkey,
        }
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend(compact_size_encode(self.script_pubkey.len() as u64));
        out.extend_from_slice(&self.script_pubkey);
    }
}

/// Encode one input's witness stack.
pub fn witness_encode(witness: &[Vec<u8>]) -> Vec<u8> {
    let mut out = compact_size_encode(witness.len() as u64);
    for item in witness {
        out.extend(compact_size_encode(item.len() as u64));
        out.extend_from_slice(item);
    }
    out
}

/// Decode one input's witness stack.
pub fn witness_decode(data: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut reader = Reader::new(data);
    let witness = read_witness(&mut reader)?;
    reader.finish()?;
    Ok(witness)
}

fn read_witness(reader: &mut Reader<'_>) -> Result<Vec<Vec<u8>>, DecodeError> {
    let count = reader.compact_size()? as usize;
    let mut witness = Vec::with_capacity(count.min(0xff));
    for _ in 0..count {
        witness.push(reader.bytes()?);
    }
    Ok(witness)
}

/// The sighash byte carried behind each signature. The high bit selects
/// ANYONECANPAY, the low two bits select which outputs are committed.
/// 0x00 is taproot's DEFAULT and behaves as ALL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashType(u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outputs {
    All,
    None,
    Single,
}

impl HashType {
    pub const DEFAULT: HashType = HashType(0x00);
    pub const ALL: HashType = HashType(0x01);
    pub const NONE: HashType = HashType(0x02);
    pub const SINGLE: HashType = HashType(0x03);

    pub fn from_byte(byte: u8) -> Result<HashType, DecodeError> {
        match byte {
            0x00..=0x03 | 0x81..=0x83 => Ok(HashType(byte)),
            _ => Err(DecodeError::BadHashType),
        }
    }

    pub const fn to_byte(self) -> u8 {
        self.0
    }

    pub const fn with_anyone_can_pay(self) -> HashType {
        HashType(self.0 | 0x80)
    }

    pub const fn is_anyone_can_pay(self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn outputs(self) -> Outputs {
        match self.0 & 0x03 {
            0x02 => Outputs::None,
            0x03 => Outputs::Single,
            _ => Outputs::All,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub locktime: u32,
}

impl Transaction {
    pub fn new(version: u32, vin: Vec<TxIn>, vout: Vec<TxOut>, locktime: u32) -> Transaction {
        Transaction {
            version,
            vin,
            vout,
            locktime,
        }
    }

    pub fn is_segwit(&self) -> bool {
        self.vin.iter().any(|input| !input.witness.is_empty())
    }

    /// The pre-segwit encoding; witnesses are not represented.
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(10 + self.vin.len() * 41 + self.vout.len() * 34);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend(compact_size_encode(self.vin.len() as u64));
        for input in &self.vin {
            out.extend_from_slice(&input.out_point.serialize());
            out.extend(compact_size_encode(input.script_sig.len() as u64));
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        out.extend(compact_size_encode(self.vout.len() as u64));
        for output in &self.vout {
            output.serialize_into(&mut out);
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// The wire encoding: segwit form when any input carries a witness,
    /// legacy form otherwise.
    pub fn serialize(&self) -> Vec<u8> {
        if !self.is_segwit() {
            return self.serialize_legacy();
        }
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.push(0x00);
        out.push(0x01);
        out.extend(compact_size_encode(self.vin.len() as u64));
        for input in &self.vin {
            out.extend_from_slice(&input.out_point.serialize());
            out.extend(compact_size_encode(input.script_sig.len() as u64));
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        out.extend(compact_size_encode(self.vout.len() as u64));
        for output in &self.vout {
            output.serialize_into(&mut out);
        }
        for input in &self.vin {
            out.extend(witness_encode(&input.witness));
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Parse either wire form; the zero marker byte at position 4 selects
    /// segwit.
    pub fn deserialize(data: &[u8]) -> Result<Transaction, DecodeError> {
        let mut reader = Reader::new(data);
        let version = reader.u32_le()?;
        let segwit = data.get(4) == Some(&0x00);
        if segwit {
            reader.u8()?;
            if reader.u8()? != 0x01 {
                return Err(DecodeError::BadSegwitFlag);
            }
        }
        let vin_count = reader.compact_size()? as usize;
        let mut vin = Vec::with_capacity(vin_count.min(0xff));
        for _ in 0..vin_count {
            let out_point = OutPoint::new(reader.txid()?, reader.u32_le()?);
            let script_sig = reader.bytes()?;
            let sequence = reader.u32_le()?;
            vin.push(TxIn::new(out_point, script_sig, sequence, Vec::new()));
        }
        let vout_count = reader.compact_size()? as usize;
        let mut vout = Vec::with_capacity(vout_count.min(0xff));
        for _ in 0..vout_count {
            let value = reader.u64_le()?;
            vout.push(TxOut::new(value, reader.bytes()?));
        }
        if segwit {
            for input in &mut vin {
                input.witness = read_witness(&mut reader)?;
            }
        }
        let locktime = reader.u32_le()?;
        reader.finish()?;
        Ok(Transaction {
            version,
            vin,
            vout,
            locktime,
        })
    }

    /// hash256 of the legacy serialization, in internal byte order,
    /// regardless of which form the transaction serializes to.
    pub fn txid(&self) -> [u8; 32] {
        hash256(&self.serialize_legacy())
    }

    /// weight = 4·|legacy bytes| + |witness bytes|, where the witness bytes
    /// include the segwit marker and flag.
    pub fn weight(&self) -> usize {
        let legacy = self.serialize_legacy().len();
        if self.is_segwit() {
            legacy * 4 + (self.serialize().len() - legacy)
        } else {
            legacy * 4
        }
    }

    pub fn vbytes(&self) -> usize {
        self.weight().div_ceil(4)
    }

    /// The original signature digest: script_sigs cleared, the signed
    /// input's script_sig replaced by `script_code`, hash-type adjustments
    /// applied, then hash256 over the legacy serialization plus the
    /// hash-type word.
    pub fn digest_legacy(&self, i: usize, hash_type: HashType, script_code: &[u8]) -> [u8; 32] {
        let mut tx = self.clone();
        for input in &mut tx.vin {
            input.script_sig.clear();
            input.witness.clear();
        }
        tx.vin[i].script_sig = script_code.to_vec();
        if hash_type.is_anyone_can_pay() {
            tx.vin = vec![tx.vin[i].clone()];
        }
        match hash_type.outputs() {
            Outputs::All => {}
            Outputs::None => tx.vout.clear(),
            Outputs::Single => tx.vout = tx.vout.get(i).cloned().into_iter().collect(),
        }
        let mut data = tx.serialize_legacy();
        data.extend_from_slice(&u32::from(hash_type.to_byte()).to_le_bytes());
        hash256(&data)
    }

    /// BIP-143. `script_code` arrives with its length prefix already in
    /// place and `value` is the amount of the output being spent.
    pub fn digest_segwit_v0(
        &self,
        i: usize,
        hash_type: HashType,
        script_code: &[u8],
        value: u64,
    ) -> [u8; 32] {
        let zero = [0u8; 32];
        let mut data = Vec::with_capacity(156 + script_code.len());
        data.extend_from_slice(&self.version.to_le_bytes());
        if hash_type.is_anyone_can_pay() {
            data.extend_from_slice(&zero);
        } else {
            let mut prevouts = Vec::with_capacity(self.vin.len() * 36);
            for input in &self.vin {
                prevouts.extend_from_slice(&input.out_point.serialize());
            }
            data.extend_from_slice(&hash256(&prevouts));
        }
        if !hash_type.is_anyone_can_pay() && hash_type.outputs() == Outputs::All {
            let mut sequences = Vec::with_capacity(self.vin.len() * 4);
            for input in &self.vin {
                sequences.extend_from_slice(&input.sequence.to_le_bytes());
            }
            data.extend_from_slice(&hash256(&sequences));
        } else {
            data.extend_from_slice(&zero);
        }
        data.extend_from_slice(&self.vin[i].out_point.serialize());
        data.extend_from_slice(script_code);
        data.extend_from_slice(&value.to_le_bytes());
        data.extend_from_slice(&self.vin[i].sequence.to_le_bytes());
        match hash_type.outputs() {
            Outputs::All => {
                let mut outputs = Vec::new();
                for output in &self.vout {
                    output.serialize_into(&mut outputs);
                }
                data.extend_from_slice(&hash256(&outputs));
            }
            Outputs::Single if i < self.vout.len() => {
                let mut output = Vec::new();
                self.vout[i].serialize_into(&mut output);
                data.extend_from_slice(&hash256(&output));
            }
            _ => data.extend_from_slice(&zero),
        }
        data.extend_from_slice(&self.locktime.to_le_bytes());
        data.extend_from_slice(&u32::from(hash_type.to_byte()).to_le_bytes());
        hash256(&data)
    }

    /// BIP-341, for both the key path (`leaf_script` = None) and the script
    /// path. `prevouts` are the outputs being spent, one per input.
    pub fn digest_segwit_v1(
        &self,
        i: usize,
        hash_type: HashType,
        prevouts: &[TxOut],
        leaf_script: Option<&[u8]>,
    ) -> [u8; 32] {
        let mut data = Vec::with_capacity(212);
        data.push(0x00);
        data.push(hash_type.to_byte());
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.locktime.to_le_bytes());
        if !hash_type.is_anyone_can_pay() {
            let mut outpoints = Vec::with_capacity(self.vin.len() * 36);
            let mut values = Vec::with_capacity(self.vin.len() * 8);
            let mut scripts = Vec::new();
            let mut sequences = Vec::with_capacity(self.vin.len() * 4);
            for (input, prevout) in self.vin.iter().zip(prevouts) {
                outpoints.extend_from_slice(&input.out_point.serialize());
                values.extend_from_slice(&prevout.value.to_le_bytes());
                scripts.extend(compact_size_encode(prevout.script_pubkey.len() as u64));
                scripts.extend_from_slice(&prevout.script_pubkey);
                sequences.extend_from_slice(&input.sequence.to_le_bytes());
            }
            data.extend_from_slice(&sha256(&outpoints));
            data.extend_from_slice(&sha256(&values));
            data.extend_from_slice(&sha256(&scripts));
            data.extend_from_slice(&sha256(&sequences));
        }
        if hash_type.outputs() == Outputs::All {
            let mut outputs = Vec::new();
            for output in &self.vout {
                output.serialize_into(&mut outputs);
            }
            data.extend_from_slice(&sha256(&outputs));
        }
        let spend_type: u8 = if leaf_script.is_some() { 2 } else { 0 };
        data.push(spend_type);
        if hash_type.is_anyone_can_pay() {
            data.extend_from_slice(&self.vin[i].out_point.serialize());
            data.extend_from_slice(&prevouts[i].value.to_le_bytes());
            data.extend(compact_size_encode(prevouts[i].script_pubkey.len() as u64));
            data.extend_from_slice(&prevouts[i].script_pubkey);
            data.extend_from_slice(&self.vin[i].sequence.to_le_bytes());
        } else {
            data.extend_from_slice(&(i as u32).to_le_bytes());
        }
        if hash_type.outputs() == Outputs::Single {
            if let Some(output) = self.vout.get(i) {
                let mut single = Vec::new();
                output.serialize_into(&mut single);
                data.extend_from_slice(&sha256(&single));
            }
        }
        if let Some(script) = leaf_script {
            let mut leaf = Vec::with_capacity(script.len() + 4);
            leaf.push(crate::taproot::LEAF_VERSION);
            leaf.extend(compact_size_encode(script.len() as u64));
            leaf.extend_from_slice(script);
            data.extend_from_slice(&tag_hash("TapLeaf", &leaf));
            data.push(0x00);
            data.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
        }
        #[cfg(debug_assertions)]
        {
            let mut expect: usize = 175;
            if hash_type.is_anyone_can_pay() {
                expect -= 132;
                expect += 48
                    + compact_size_encode(prevouts[i].script_pubkey.len() as u64).len()
                    + prevouts[i].script_pubkey.len();
            }
            match hash_type.outputs() {
                Outputs::None => expect -= 32,
                Outputs::Single if i >= self.vout.len() => expect -= 32,
                _ => {}
            }
            if leaf_script.is_some() {
                expect += 37;
            }
            debug_assert_eq!(data.len(), expect);
        }
        tag_hash("TapSighash", &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Mastering bitcoin, chapter 6, alice's serialized transaction.
    const ALICE_TX: &str = "01000000000101eb3ae38f27191aa5f3850dc9cad00492b88b72404f9da135\
        698679268041c54a0100000000ffffffff02204e0000000000002251203b41daba4c9ace57836974\
        0f15e5ec880c28279ee7f51b07dca69c7061e07068f8240100000000001600147752c165ea7be772\
        b2c0acb7f4d6047ae6f4768e0141cf5efe2d8ef13ed0af21d4f4cb82422d6252d70324f6f4576b72\
        7b7d918e521c00b51be739df2f899c49dc267c0ad280aca6dab0d2fa2b42a45182fc83e817130100\
        000000";

    fn alice_tx_bytes() -> Vec<u8> {
        hex::decode(ALICE_TX.replace(char::is_whitespace, "")).unwrap()
    }

    #[test]
    fn compact_size_vectors() {
        for (n, bytes) in [
            (0xbbu64, vec![0xbbu8]),
            (0xff, vec![0xfd, 0xff, 0x00]),
            (0x3419, vec![0xfd, 0x19, 0x34]),
            (0xdc4591, vec![0xfe, 0x91, 0x45, 0xdc, 0x00]),
            (0x8008_1e5, vec![0xfe, 0xe5, 0x81, 0x00, 0x08]),
            (
                0xb4da_564e_2857,
                vec![0xff, 0x57, 0x28, 0x4e, 0x56, 0xda, 0xb4, 0x00, 0x00],
            ),
            (
                0x4bf5_83a1_7d59_c158,
                vec![0xff, 0x58, 0xc1, 0x59, 0x7d, 0xa1, 0x83, 0xf5, 0x4b],
            ),
        ] {
            assert_eq!(compact_size_encode(n), bytes);
            assert_eq!(compact_size_decode(&bytes).unwrap(), n);
        }
    }

    #[test]
    fn compact_size_rejects_short_and_trailing() {
        assert_eq!(compact_size_decode(&[0xfd, 0x01]), Err(DecodeError::ShortRead));
        assert_eq!(
            compact_size_decode(&[0x01, 0x02]),
            Err(DecodeError::TrailingBytes)
        );
    }

    #[test]
    fn alice_transaction_round_trip() {
        let data = alice_tx_bytes();
        let tx = Transaction::deserialize(&data).unwrap();
        assert_eq!(tx.serialize(), data);
        assert_eq!(tx.version, 1);
        assert_eq!(tx.vin.len(), 1);
        assert_eq!(tx.vout.len(), 2);
        assert_eq!(tx.locktime, 0);
        assert_eq!(tx.weight(), 569);
        assert_eq!(tx.vbytes(), 143);
        assert_eq!(
            hex::encode(tx.txid()),
            "7761f9d1ecbcf9c129802aaadfdfec38419aa441519d94bc5b21968630006246"
        );
    }

    #[test]
    fn legacy_transaction_round_trip() {
        let data = alice_tx_bytes();
        let mut tx = Transaction::deserialize(&data).unwrap();
        tx.vin[0].witness.clear();
        let legacy = tx.serialize();
        assert_eq!(legacy, tx.serialize_legacy());
        assert_eq!(Transaction::deserialize(&legacy).unwrap(), tx);
    }

    #[test]
    fn deserialize_rejects_bad_flag() {
        let mut data = alice_tx_bytes();
        data[5] = 0x02;
        assert_eq!(Transaction::deserialize(&data), Err(DecodeError::BadSegwitFlag));
    }

    #[test]
    fn deserialize_rejects_trailing_bytes() {
        let mut data = alice_tx_bytes();
        data.push(0x00);
        assert_eq!(Transaction::deserialize(&data), Err(DecodeError::TrailingBytes));
    }

    #[test]
    fn hash_type_modes() {
        assert_eq!(HashType::DEFAULT.outputs(), Outputs::All);
        assert_eq!(HashType::ALL.outputs(), Outputs::All);
        assert_eq!(HashType::NONE.outputs(), Outputs::None);
        assert_eq!(HashType::SINGLE.outputs(), Outputs::Single);
        assert!(HashType::ALL.with_anyone_can_pay().is_anyone_can_pay());
        assert_eq!(HashType::from_byte(0x81).unwrap(), HashType::ALL.with_anyone_can_pay());
        assert_eq!(HashType::from_byte(0x04), Err(DecodeError::BadHashType));
        assert_eq!(HashType::from_byte(0x80), Err(DecodeError::BadHashType));
    }

    // BIP-143, native P2WPKH example: the second input spends 6 BTC from a
    // P2WPKH output.
    #[test]
    fn bip143_digest() {
        let data = hex::decode(
            "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f00\
             00000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90e\
             c68a0100000000ffffffff02202cb206000000001976a914a30741f8145e5acadf23f7518641\
             67f32e0963f788ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa\
             815988ac11000000",
        )
        .unwrap();
        let tx = Transaction::deserialize(&data).unwrap();
        assert_eq!(tx.vin.len(), 2);
        let script_code =
            hex::decode("1976a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap();
        let digest = tx.digest_segwit_v0(1, HashType::ALL, &script_code, 600_000_000);
        assert_eq!(
            hex::encode(digest),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
    }

    #[test]
    fn legacy_digest_hash_type_adjustments() {
        let data = alice_tx_bytes();
        let tx = Transaction::deserialize(&data).unwrap();
        let script_code = tx.vout[1].script_pubkey.clone();
        let all = tx.digest_legacy(0, HashType::ALL, &script_code);
        let none = tx.digest_legacy(0, HashType::NONE, &script_code);
        let single = tx.digest_legacy(0, HashType::SINGLE, &script_code);
        let acp = tx.digest_legacy(0, HashType::ALL.with_anyone_can_pay(), &script_code);
        assert_ne!(all, none);
        assert_ne!(all, single);
        assert_ne!(all, acp);
    }

    #[test]
    fn taproot_digest_covers_all_inputs() {
        let data = alice_tx_bytes();
        let tx = Transaction::deserialize(&data).unwrap();
        let prevouts = vec![TxOut::new(
            100_000,
            hex::decode("51203b41daba4c9ace578369740f15e5ec880c28279ee7f51b07dca69c7061e07068")
                .unwrap(),
        )];
        let key_path = tx.digest_segwit_v1(0, HashType::DEFAULT, &prevouts, None);
        let explicit_all = tx.digest_segwit_v1(0, HashType::ALL, &prevouts, None);
        // DEFAULT commits to the same data but a different hash-type byte.
        assert_ne!(key_path, explicit_all);
        let script = vec![0x51];
        let script_path = tx.digest_segwit_v1(0, HashType::DEFAULT, &prevouts, Some(&script));
        assert_ne!(key_path, script_path);
        let acp = tx.digest_segwit_v1(
            0,
            HashType::ALL.with_anyone_can_pay(),
            &prevouts,
            None,
        );
        assert_ne!(explicit_all, acp);
    }

    fn arb_txin() -> impl Strategy<Value = TxIn> {
        (
            any::<[u8; 32]>(),
            any::<u32>(),
            proptest::collection::vec(any::<u8>(), 0..64),
            any::<u32>(),
            proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..4),
        )
            .prop_map(|(txid, vout, script_sig, sequence, witness)| {
                TxIn::new(OutPoint::new(txid, vout), script_sig, sequence, witness)
            })
    }

    fn arb_txout() -> impl Strategy<Value = TxOut> {
        (any::<u64>(), proptest::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(value, script_pubkey)| TxOut::new(value, script_pubkey))
    }

    proptest! {
        #[test]
        fn witness_round_trip(
            witness in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..16)
        ) {
            prop_assert_eq!(witness_decode(&witness_encode(&witness)).unwrap(), witness);
        }

        #[test]
        fn compact_size_round_trip(n in any::<u64>()) {
            prop_assert_eq!(compact_size_decode(&compact_size_encode(n)).unwrap(), n);
        }

        #[test]
        fn transaction_round_trip(
            version in any::<u32>(),
            vin in proptest::collection::vec(arb_txin(), 1..4),
            vout in proptest::collection::vec(arb_txout(), 0..4),
            locktime in any::<u32>(),
        ) {
            let tx = Transaction::new(version, vin, vout, locktime);
            prop_assert_eq!(Transaction::deserialize(&tx.serialize()).unwrap(), tx);
        }
    }
}
