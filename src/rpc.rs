//! Blocking JSON-RPC 2.0 client for bitcoind.
//!
//! Node responses carry txids as display hex, the reverse of the internal
//! byte order used everywhere else in this crate. This module is the only
//! place where that reversal happens; both directions go through
//! [`display_txid`] and [`internal_txid`].

use crate::amount;
use crate::network::{Network, RpcEndpoint};
use crate::transaction::{OutPoint, TxOut};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug)]
pub struct Client {
    http: reqwest::blocking::Client,
    endpoint: RpcEndpoint,
}

#[derive(Debug, Deserialize)]
struct Response {
    result: Option<Value>,
    error: Option<Value>,
}

/// Internal byte order -> display hex.
pub fn display_txid(txid: &[u8; 32]) -> String {
    let mut bytes = *txid;
    bytes.reverse();
    hex::encode(bytes)
}

/// Display hex -> internal byte order.
pub fn internal_txid(display: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(display).context("txid is not hex")?;
    if bytes.len() != 32 {
        bail!("txid must be 32 bytes");
    }
    let mut txid = [0u8; 32];
    txid.copy_from_slice(&bytes);
    txid.reverse();
    Ok(txid)
}

impl Client {
    pub fn new(network: &Network) -> Client {
        Client {
            http: reqwest::blocking::Client::new(),
            endpoint: network.rpc.clone(),
        }
    }

    /// Issue a raw call. RPC error objects are surfaced verbatim.
    pub fn call(&self, method: &str, params: Value) -> Result<Value> {
        let response: Response = self
            .http
            .post(self.endpoint.url.as_str())
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .json(&json!({
                "id": rand::random::<u32>(),
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
            }))
            .send()
            .with_context(|| format!("rpc transport failure calling {}", method))?
            .json()
            .with_context(|| format!("rpc response to {} is not json", method))?;
        if let Some(error) = response.error {
            if !error.is_null() {
                bail!("rpc error from {}: {}", method, error);
            }
        }
        response
            .result
            .ok_or_else(|| anyhow!("rpc response to {} has no result", method))
    }

    pub fn get_best_block_hash(&self) -> Result<String> {
        let value = self.call("getbestblockhash", json!([]))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("getbestblockhash did not return a string"))
    }

    pub fn get_block_count(&self) -> Result<u64> {
        let value = self.call("getblockcount", json!([]))?;
        value
            .as_u64()
            .ok_or_else(|| anyhow!("getblockcount did not return an integer"))
    }

    /// The verbose form of `getrawtransaction`.
    pub fn get_raw_transaction(&self, txid: &[u8; 32]) -> Result<Value> {
        self.call("getrawtransaction", json!([display_txid(txid), true]))
    }

    /// Resolve an outpoint to the output it refers to via `gettxout`.
    pub fn tx_out(&self, out_point: &OutPoint) -> Result<TxOut> {
        #[derive(Deserialize)]
        struct ScriptPubKey {
            hex: String,
        }
        #[derive(Deserialize)]
        struct GetTxOut {
            value: serde_json::Number,
            #[serde(rename = "scriptPubKey")]
            script_pub_key: ScriptPubKey,
        }
        let value = self.call(
            "gettxout",
            json!([display_txid(&out_point.txid), out_point.vout]),
        )?;
        if value.is_null() {
            bail!(
                "output {}:{} is unknown or already spent",
                display_txid(&out_point.txid),
                out_point.vout
            );
        }
        let parsed: GetTxOut = serde_json::from_value(value).context("malformed gettxout result")?;
        Ok(TxOut::new(
            amount::parse_btc(&parsed.value.to_string())?,
            hex::decode(parsed.script_pub_key.hex).context("scriptPubKey is not hex")?,
        ))
    }

    /// Unspent outputs of one address, unconfirmed included.
    pub fn list_unspent(&self, addr: &str) -> Result<Vec<(OutPoint, TxOut)>> {
        #[derive(Deserialize)]
        struct Entry {
            txid: String,
            vout: u32,
            #[serde(rename = "scriptPubKey")]
            script_pub_key: String,
            amount: serde_json::Number,
        }
        let value = self.call("listunspent", json!([0, 9999999, [addr]]))?;
        let entries: Vec<Entry> =
            serde_json::from_value(value).context("malformed listunspent result")?;
        entries
            .into_iter()
            .map(|entry| {
                Ok((
                    OutPoint::new(internal_txid(&entry.txid)?, entry.vout),
                    TxOut::new(
                        amount::parse_btc(&entry.amount.to_string())?,
                        hex::decode(entry.script_pub_key).context("scriptPubKey is not hex")?,
                    ),
                ))
            })
            .collect()
    }

    /// Fee rate quantized to satoshi per vbyte by truncation. Falls back to
    /// 1 sat/vbyte when the node has no estimate, as on a fresh regtest.
    pub fn estimate_smart_fee(&self, target: u32) -> Result<u64> {
        let value = self.call("estimatesmartfee", json!([target]))?;
        match value.get("feerate") {
            Some(Value::Number(feerate)) => {
                Ok(amount::parse_btc(&feerate.to_string())? / 1000)
            }
            _ => Ok(1),
        }
    }

    /// Broadcast; returns the txid in internal byte order.
    pub fn send_raw_transaction(&self, tx: &[u8]) -> Result<[u8; 32]> {
        let value = self.call("sendrawtransaction", json!([hex::encode(tx)]))?;
        let display = value
            .as_str()
            .ok_or_else(|| anyhow!("sendrawtransaction did not return a txid"))?;
        internal_txid(display)
    }

    pub fn generate_to_address(&self, blocks: u32, addr: &str) -> Result<Vec<String>> {
        let value = self.call("generatetoaddress", json!([blocks, addr]))?;
        serde_json::from_value(value).context("malformed generatetoaddress result")
    }

    /// The canonical descriptor (with checksum) for `importdescriptors`.
    pub fn get_descriptor_info(&self, descriptor: &str) -> Result<String> {
        let value = self.call("getdescriptorinfo", json!([descriptor]))?;
        value
            .get("descriptor")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("getdescriptorinfo did not return a descriptor"))
    }

    pub fn import_descriptors(&self, requests: &[Value]) -> Result<()> {
        let value = self.call("importdescriptors", json!([requests]))?;
        if let Value::Array(entries) = value {
            for entry in entries {
                if entry.get("success") != Some(&Value::Bool(true)) {
                    bail!("importdescriptors failed: {}", entry);
                }
            }
        }
        Ok(())
    }

    /// Poll once a second until the transaction is in the active chain.
    /// Only meaningful once a block containing it has been mined.
    pub fn wait(&self, txid: &[u8; 32]) -> Result<()> {
        loop {
            let tx = self.get_raw_transaction(txid)?;
            if tx.get("in_active_chain").and_then(Value::as_bool) == Some(true) {
                return Ok(());
            }
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txid_reversal_round_trip() {
        let display = "7761f9d1ecbcf9c129802aaadfdfec38419aa441519d94bc5b21968630006246";
        let internal = internal_txid(display).unwrap();
        assert_eq!(internal[31], 0x77);
        assert_eq!(internal[0], 0x46);
        assert_eq!(display_txid(&internal), display);
    }

    #[test]
    fn internal_txid_rejects_garbage() {
        assert!(internal_txid("zz").is_err());
        assert!(internal_txid("77").is_err());
    }
}
