//! Wallet: binds a signer strategy to a UTXO source and drives coin
//! selection, fee iteration, signing and broadcast.
//!
//! Every strategy exposes the same surface: an address, its locking script,
//! a `sign` pass that stamps final script_sigs/witnesses into a transaction,
//! and a `txin` factory producing inputs whose script_sig and witness are
//! zero-filled but already sized to their signed length, so `vbytes()`
//! during coin selection equals the size of the transaction that is
//! eventually broadcast.

use crate::address;
use crate::amount::DUST_LIMIT;
use crate::hashes::hash160;
use crate::keys::{PriKey, PubKey};
use crate::network::Network;
use crate::rpc;
use crate::script::{self, pushdata, Builder};
use crate::taproot;
use crate::transaction::{HashType, OutPoint, Transaction, TxIn, TxOut};
use anyhow::{ensure, Context, Result};

/// Default absurd-fee bound in satoshi per vbyte.
pub const DEFAULT_FEE_RATE_LIMIT: u64 = 50;

/// The confirmation target handed to the fee estimator.
const FEE_TARGET: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub out_point: OutPoint,
    pub out: TxOut,
}

/// Legacy pay-to-pubkey-hash spending.
#[derive(Clone, Debug)]
pub struct P2pkh {
    prikey: PriKey,
    pubkey: PubKey,
    addr: String,
    script: Vec<u8>,
}

impl P2pkh {
    pub fn new(network: &Network, prikey: PriKey) -> P2pkh {
        let pubkey = prikey.pubkey();
        let addr = address::p2pkh(&pubkey, network);
        let script = address::script_pubkey_p2pkh(&addr, network).expect("cannot fail");
        P2pkh {
            prikey,
            pubkey,
            addr,
            script,
        }
    }

    fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        for i in 0..tx.vin.len() {
            let prev = tx.vin[i].out_point.load(client)?;
            let digest = tx.digest_legacy(i, HashType::ALL, &prev.script_pubkey);
            let mut sig = self.prikey.sign_ecdsa_der(&digest);
            sig.push(HashType::ALL.to_byte());
            tx.vin[i].script_sig = Builder::new()
                .push_data(&sig)
                .push_data(&self.pubkey.sec())
                .into_script();
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        // push(der sig + hash type, at most 72) + push(sec pubkey, 33).
        TxIn::new(out_point, vec![0; 107], 0xffff_ffff, Vec::new())
    }
}

/// P2SH-wrapped k-of-n CHECKMULTISIG spending.
#[derive(Clone, Debug)]
pub struct P2shP2ms {
    prikey: Vec<PriKey>,
    redeem: Vec<u8>,
    addr: String,
    script: Vec<u8>,
}

impl P2shP2ms {
    /// `prikey` are the k keys that will sign, `pubkey` the n keys of the
    /// redeem script, in script order.
    pub fn new(network: &Network, pubkey: Vec<PubKey>, prikey: Vec<PriKey>) -> P2shP2ms {
        let redeem = address::p2ms_redeem(prikey.len() as u8, &pubkey);
        let addr = address::p2sh(&redeem, network);
        let script = address::script_pubkey_p2sh(&addr, network).expect("cannot fail");
        P2shP2ms {
            prikey,
            redeem,
            addr,
            script,
        }
    }

    fn sign(&self, _client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        for i in 0..tx.vin.len() {
            let digest = tx.digest_legacy(i, HashType::ALL, &self.redeem);
            // The extra OP_0 feeds CHECKMULTISIG's off-by-one pop.
            let mut builder = Builder::new().push_opcode(script::OP_0);
            for prikey in &self.prikey {
                let mut sig = prikey.sign_ecdsa_der(&digest);
                sig.push(HashType::ALL.to_byte());
                builder = builder.push_data(&sig);
            }
            tx.vin[i].script_sig = builder.push_data(&self.redeem).into_script();
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        let mut builder = Builder::new().push_opcode(script::OP_0);
        for _ in &self.prikey {
            builder = builder.push_data(&[0; 72]);
        }
        let script_sig = builder.push_data(&self.redeem).into_script();
        TxIn::new(out_point, script_sig, 0xffff_ffff, Vec::new())
    }
}

/// P2WPKH nested in P2SH, the compatibility form of segwit v0.
#[derive(Clone, Debug)]
pub struct P2shP2wpkh {
    prikey: PriKey,
    pubkey: PubKey,
    addr: String,
    script: Vec<u8>,
}

impl P2shP2wpkh {
    pub fn new(network: &Network, prikey: PriKey) -> P2shP2wpkh {
        let pubkey = prikey.pubkey();
        let addr = address::p2sh_p2wpkh(&pubkey, network);
        let script = address::script_pubkey_p2sh(&addr, network).expect("cannot fail");
        P2shP2wpkh {
            prikey,
            pubkey,
            addr,
            script,
        }
    }

    fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        let script_sig = pushdata(&address::p2wpkh_redeem(&self.pubkey));
        for i in 0..tx.vin.len() {
            let value = tx.vin[i].out_point.load(client)?.value;
            let digest = tx.digest_segwit_v0(
                i,
                HashType::ALL,
                &segwit_v0_script_code(&self.pubkey),
                value,
            );
            let mut sig = self.prikey.sign_ecdsa_der(&digest);
            sig.push(HashType::ALL.to_byte());
            tx.vin[i].script_sig = script_sig.clone();
            tx.vin[i].witness = vec![sig, self.pubkey.sec().to_vec()];
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        TxIn::new(
            out_point,
            vec![0; 23],
            0xffff_ffff,
            vec![vec![0; 72], vec![0; 33]],
        )
    }
}

/// Native segwit v0 pay-to-witness-pubkey-hash spending.
#[derive(Clone, Debug)]
pub struct P2wpkh {
    prikey: PriKey,
    pubkey: PubKey,
    addr: String,
    script: Vec<u8>,
}

impl P2wpkh {
    pub fn new(network: &Network, prikey: PriKey) -> P2wpkh {
        let pubkey = prikey.pubkey();
        let addr = address::p2wpkh(&pubkey, network);
        let script = address::script_pubkey_p2wpkh(&addr, network).expect("cannot fail");
        P2wpkh {
            prikey,
            pubkey,
            addr,
            script,
        }
    }

    fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        for i in 0..tx.vin.len() {
            let value = tx.vin[i].out_point.load(client)?.value;
            let digest = tx.digest_segwit_v0(
                i,
                HashType::ALL,
                &segwit_v0_script_code(&self.pubkey),
                value,
            );
            let mut sig = self.prikey.sign_ecdsa_der(&digest);
            sig.push(HashType::ALL.to_byte());
            tx.vin[i].witness = vec![sig, self.pubkey.sec().to_vec()];
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        TxIn::new(
            out_point,
            Vec::new(),
            0xffff_ffff,
            vec![vec![0; 72], vec![0; 33]],
        )
    }
}

/// Taproot key-path spending with an optional script tree commitment.
#[derive(Clone, Debug)]
pub struct P2tr {
    prikey: PriKey,
    root: Option<[u8; 32]>,
    addr: String,
    script: Vec<u8>,
}

impl P2tr {
    pub fn new(
        network: &Network,
        prikey: PriKey,
        root: Option<[u8; 32]>,
    ) -> Result<P2tr, taproot::Error> {
        let addr = address::p2tr(&prikey.pubkey(), root, network)?;
        let script = address::script_pubkey_p2tr(&addr, network).expect("cannot fail");
        Ok(P2tr {
            prikey,
            root,
            addr,
            script,
        })
    }

    fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        let output_prikey =
            taproot::output_prikey(&self.prikey, self.root).context("taproot tweak failed")?;
        let prevouts = load_prevouts(client, tx)?;
        for i in 0..tx.vin.len() {
            let digest = tx.digest_segwit_v1(i, HashType::ALL, &prevouts, None);
            let mut sig = output_prikey.sign_schnorr(&digest).to_vec();
            sig.push(HashType::ALL.to_byte());
            tx.vin[i].witness = vec![sig];
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        // 64-byte schnorr signature plus the hash type byte.
        TxIn::new(out_point, Vec::new(), 0xffff_ffff, vec![vec![0; 65]])
    }
}

/// Taproot script-path spending of one leaf under a MAST commitment.
///
/// `prikey` holds the keys that sign, in the order their signatures appear
/// on the witness stack; with CHECKSIGADD scripts that is the reverse of
/// the order the keys appear in the leaf script.
#[derive(Clone, Debug)]
pub struct P2trScript {
    prikey: Vec<PriKey>,
    leaf: taproot::Leaf,
    control: Vec<u8>,
    addr: String,
    script: Vec<u8>,
}

impl P2trScript {
    pub fn new(
        network: &Network,
        prikey: Vec<PriKey>,
        internal: PubKey,
        leaf: taproot::Leaf,
        path: Vec<[u8; 32]>,
    ) -> Result<P2trScript, taproot::Error> {
        let root = taproot::merkle_root(&leaf, &path);
        let addr = address::p2tr(&internal, Some(root), network)?;
        let script = address::script_pubkey_p2tr(&addr, network).expect("cannot fail");
        let control = taproot::control_block(&internal, &leaf, &path)?;
        Ok(P2trScript {
            prikey,
            leaf,
            control,
            addr,
            script,
        })
    }

    fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        let prevouts = load_prevouts(client, tx)?;
        for i in 0..tx.vin.len() {
            let digest = tx.digest_segwit_v1(i, HashType::ALL, &prevouts, Some(self.leaf.script()));
            let mut witness = Vec::with_capacity(self.prikey.len() + 2);
            for prikey in &self.prikey {
                let mut sig = prikey.sign_schnorr(&digest).to_vec();
                sig.push(HashType::ALL.to_byte());
                witness.push(sig);
            }
            witness.push(self.leaf.script().to_vec());
            witness.push(self.control.clone());
            tx.vin[i].witness = witness;
        }
        Ok(())
    }

    fn txin(&self, out_point: OutPoint) -> TxIn {
        let mut witness: Vec<Vec<u8>> = vec![vec![0; 65]; self.prikey.len()];
        witness.push(self.leaf.script().to_vec());
        witness.push(self.control.clone());
        TxIn::new(out_point, Vec::new(), 0xffff_ffff, witness)
    }
}

/// The BIP-143 script code of a P2WPKH spend: the implied P2PKH script,
/// wrapped in the length prefix the digest expects.
fn segwit_v0_script_code(pubkey: &PubKey) -> Vec<u8> {
    pushdata(
        &Builder::new()
            .push_opcode(script::OP_DUP)
            .push_opcode(script::OP_HASH160)
            .push_data(&hash160(&pubkey.sec()))
            .push_opcode(script::OP_EQUALVERIFY)
            .push_opcode(script::OP_CHECKSIG)
            .into_script(),
    )
}

fn load_prevouts(client: &rpc::Client, tx: &Transaction) -> Result<Vec<TxOut>> {
    tx.vin
        .iter()
        .map(|input| input.out_point.load(client))
        .collect()
}

/// One strategy per standard spend type.
#[derive(Clone, Debug)]
pub enum Signer {
    P2pkh(P2pkh),
    P2shP2ms(P2shP2ms),
    P2shP2wpkh(P2shP2wpkh),
    P2wpkh(P2wpkh),
    P2tr(P2tr),
    P2trScript(P2trScript),
}

impl Signer {
    pub fn address(&self) -> &str {
        match self {
            Signer::P2pkh(signer) => &signer.addr,
            Signer::P2shP2ms(signer) => &signer.addr,
            Signer::P2shP2wpkh(signer) => &signer.addr,
            Signer::P2wpkh(signer) => &signer.addr,
            Signer::P2tr(signer) => &signer.addr,
            Signer::P2trScript(signer) => &signer.addr,
        }
    }

    pub fn script_pubkey(&self) -> &[u8] {
        match self {
            Signer::P2pkh(signer) => &signer.script,
            Signer::P2shP2ms(signer) => &signer.script,
            Signer::P2shP2wpkh(signer) => &signer.script,
            Signer::P2wpkh(signer) => &signer.script,
            Signer::P2tr(signer) => &signer.script,
            Signer::P2trScript(signer) => &signer.script,
        }
    }

    /// Stamp final script_sigs and witnesses into every input.
    pub fn sign(&self, client: &rpc::Client, tx: &mut Transaction) -> Result<()> {
        match self {
            Signer::P2pkh(signer) => signer.sign(client, tx),
            Signer::P2shP2ms(signer) => signer.sign(client, tx),
            Signer::P2shP2wpkh(signer) => signer.sign(client, tx),
            Signer::P2wpkh(signer) => signer.sign(client, tx),
            Signer::P2tr(signer) => signer.sign(client, tx),
            Signer::P2trScript(signer) => signer.sign(client, tx),
        }
    }

    /// An input with zero-filled script_sig and witness sized exactly as
    /// they will be once signed.
    pub fn txin(&self, out_point: OutPoint) -> TxIn {
        match self {
            Signer::P2pkh(signer) => signer.txin(out_point),
            Signer::P2shP2ms(signer) => signer.txin(out_point),
            Signer::P2shP2wpkh(signer) => signer.txin(out_point),
            Signer::P2wpkh(signer) => signer.txin(out_point),
            Signer::P2tr(signer) => signer.txin(out_point),
            Signer::P2trScript(signer) => signer.txin(out_point),
        }
    }
}

impl From<P2pkh> for Signer {
    fn from(signer: P2pkh) -> Signer {
        Signer::P2pkh(signer)
    }
}

impl From<P2shP2ms> for Signer {
    fn from(signer: P2shP2ms) -> Signer {
        Signer::P2shP2ms(signer)
    }
}

impl From<P2shP2wpkh> for Signer {
    fn from(signer: P2shP2wpkh) -> Signer {
        Signer::P2shP2wpkh(signer)
    }
}

impl From<P2wpkh> for Signer {
    fn from(signer: P2wpkh) -> Signer {
        Signer::P2wpkh(signer)
    }
}

impl From<P2tr> for Signer {
    fn from(signer: P2tr) -> Signer {
        Signer::P2tr(signer)
    }
}

impl From<P2trScript> for Signer {
    fn from(signer: P2trScript) -> Signer {
        Signer::P2trScript(signer)
    }
}

/// Rejects transactions that are obviously wrong before they go out.
#[derive(Debug)]
pub struct Analyzer<'a> {
    tx: &'a Transaction,
    fee_rate_limit: u64,
}

impl<'a> Analyzer<'a> {
    pub fn new(tx: &'a Transaction) -> Analyzer<'a> {
        Analyzer::with_limit(tx, DEFAULT_FEE_RATE_LIMIT)
    }

    pub fn with_limit(tx: &'a Transaction, fee_rate_limit: u64) -> Analyzer<'a> {
        Analyzer { tx, fee_rate_limit }
    }

    pub fn analyze(&self, client: &rpc::Client) -> Result<()> {
        self.analyze_mining_fee(client)
    }

    /// An absurd fee is a rate far beyond what estimators expect for
    /// next-block confirmation; refuse to broadcast it.
    fn analyze_mining_fee(&self, client: &rpc::Client) -> Result<()> {
        let mut sender_value: u64 = 0;
        for input in &self.tx.vin {
            sender_value += input.out_point.load(client)?.value;
        }
        let output_value: u64 = self.tx.vout.iter().map(|output| output.value).sum();
        let fee = sender_value
            .checked_sub(output_value)
            .context("outputs exceed inputs")?;
        ensure!(
            fee <= self.tx.vbytes() as u64 * self.fee_rate_limit,
            "absurd fee: {} satoshi over {} vbytes",
            fee,
            self.tx.vbytes(),
        );
        Ok(())
    }
}

#[derive(Debug)]
pub struct Wallet {
    client: rpc::Client,
    signer: Signer,
}

impl Wallet {
    pub fn new(network: &Network, signer: Signer) -> Wallet {
        Wallet {
            client: rpc::Client::new(network),
            signer,
        }
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn script_pubkey(&self) -> &[u8] {
        self.signer.script_pubkey()
    }

    pub fn client(&self) -> &rpc::Client {
        &self.client
    }

    /// Spendable outputs in selection order: descending value, outpoint as
    /// the tie break. The node's listing order is not trusted.
    pub fn unspent(&self) -> Result<Vec<Utxo>> {
        let mut utxos: Vec<Utxo> = self
            .client
            .list_unspent(self.signer.address())?
            .into_iter()
            .map(|(out_point, out)| Utxo { out_point, out })
            .collect();
        utxos.sort_by(|a, b| {
            b.out
                .value
                .cmp(&a.out.value)
                .then(a.out_point.cmp(&b.out_point))
        });
        Ok(utxos)
    }

    pub fn balance(&self) -> Result<u64> {
        Ok(self.unspent()?.iter().map(|utxo| utxo.out.value).sum())
    }

    /// Send `value` satoshi to `script`, paying the estimated fee from this
    /// wallet and returning change to it. Inputs are added one at a time;
    /// after each addition the fee is re-estimated from the would-be final
    /// size, until the change clears the dust limit. Returns the txid in
    /// internal byte order.
    pub fn transfer(&self, script: &[u8], value: u64) -> Result<[u8; 32]> {
        let fee_rate = self.client.estimate_smart_fee(FEE_TARGET)?;
        let mut tx = Transaction::new(2, Vec::new(), Vec::new(), 0);
        tx.vout.push(TxOut::new(value, script.to_vec()));
        tx.vout.push(TxOut::new(0, self.signer.script_pubkey().to_vec()));
        let mut sender_value: u64 = 0;
        let mut change_value: i64 = i64::MIN;
        for utxo in self.unspent()? {
            tx.vin.push(self.signer.txin(utxo.out_point));
            sender_value += utxo.out.value;
            change_value =
                sender_value as i64 - value as i64 - (tx.vbytes() as u64 * fee_rate) as i64;
            if change_value >= DUST_LIMIT as i64 {
                break;
            }
        }
        ensure!(
            change_value >= DUST_LIMIT as i64,
            "insufficient funds for the payment, fee and dust limit"
        );
        tx.vout[1].value = change_value as u64;
        self.signer.sign(&self.client, &mut tx)?;
        Analyzer::new(&tx).analyze(&self.client)?;
        self.client.send_raw_transaction(&tx.serialize())
    }

    /// Sweep every unspent output to `script`; the fee comes out of the
    /// swept amount. Returns the txid in internal byte order.
    pub fn transfer_all(&self, script: &[u8]) -> Result<[u8; 32]> {
        let fee_rate = self.client.estimate_smart_fee(FEE_TARGET)?;
        let mut tx = Transaction::new(2, Vec::new(), Vec::new(), 0);
        tx.vout.push(TxOut::new(0, script.to_vec()));
        let mut sender_value: u64 = 0;
        for utxo in self.unspent()? {
            tx.vin.push(self.signer.txin(utxo.out_point));
            sender_value += utxo.out.value;
        }
        let accept_value = sender_value as i64 - (tx.vbytes() as u64 * fee_rate) as i64;
        ensure!(
            accept_value >= DUST_LIMIT as i64,
            "balance does not cover the fee and dust limit"
        );
        tx.vout[0].value = accept_value as u64;
        self.signer.sign(&self.client, &mut tx)?;
        Analyzer::new(&tx).analyze(&self.client)?;
        self.client.send_raw_transaction(&tx.serialize())
    }
}
