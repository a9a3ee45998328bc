//! Transaction model and canonical serialization
//!
//! Integers are little-endian, hashes and addresses natural byte order. The
//! transaction identifier hashes the signature-free serialization, so adding
//! signatures never changes a tx_id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{archas, archas_double, Hash32, PublicAddress};

/// Wire decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("trailing bytes after transaction")]
    TrailingBytes,
}

/// References one output of a prior transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub tx_id: Hash32,
    pub index: u32,
}

/// A transaction input: the outpoint it spends plus a DER signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev: Outpoint,
    #[serde(with = "hex_bytes")]
    pub sig: Vec<u8>,
}

/// A transaction output: value paid to a HASH160 address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub to: PublicAddress,
    pub value: u32,
}

/// An unspent transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: Outpoint,
    pub to: PublicAddress,
    pub value: u32,
}

/// A blockchain transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: Hash32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create a transaction with its identifier already computed.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            tx_id: Hash32::zero(),
            inputs,
            outputs,
        };
        tx.tx_id = tx.compute_tx_id();
        tx
    }

    /// A transaction is coinbase iff it has no inputs.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Full serialization, signatures included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.prev.tx_id.0);
            buf.extend_from_slice(&input.prev.index.to_le_bytes());
            buf.extend_from_slice(&(input.sig.len() as u32).to_le_bytes());
            buf.extend_from_slice(&input.sig);
        }

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&output.to.0);
        }
        buf
    }

    /// Serialization with every signature omitted; the basis of `tx_id`.
    pub fn serialize_without_signatures(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.prev.tx_id.0);
            buf.extend_from_slice(&input.prev.index.to_le_bytes());
        }

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&output.to.0);
        }
        buf
    }

    /// `Archas(serialize_without_signatures)`
    pub fn compute_tx_id(&self) -> Hash32 {
        archas(&self.serialize_without_signatures())
    }

    /// The digest an input signature commits to.
    ///
    /// Binds every outpoint and output of the transaction plus the value and
    /// address of the specific UTXO being spent, then applies Archas twice.
    pub fn signature_hash(&self, spent_value: u32, spent_to: &PublicAddress) -> Hash32 {
        let mut buf = self.serialize_without_signatures();
        buf.extend_from_slice(&spent_value.to_le_bytes());
        buf.extend_from_slice(&spent_to.0);
        archas_double(&buf)
    }

    /// Decode a transaction from its full wire form, recomputing the tx_id.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader { bytes, pos: 0 };

        let inputs_len = r.read_u32()?;
        let mut inputs = Vec::with_capacity(inputs_len as usize);
        for _ in 0..inputs_len {
            let tx_id = Hash32::from_bytes(r.read_array::<32>()?);
            let index = r.read_u32()?;
            let sig_len = r.read_u32()?;
            let sig = r.read_slice(sig_len as usize)?.to_vec();
            inputs.push(TxInput {
                prev: Outpoint { tx_id, index },
                sig,
            });
        }

        let outputs_len = r.read_u32()?;
        let mut outputs = Vec::with_capacity(outputs_len as usize);
        for _ in 0..outputs_len {
            let value = r.read_u32()?;
            let to = PublicAddress::from_bytes(r.read_array::<20>()?);
            outputs.push(TxOutput { to, value });
        }

        if r.pos != bytes.len() {
            return Err(CodecError::TrailingBytes);
        }
        Ok(Transaction::new(inputs, outputs))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        if end > self.bytes.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let slice = self.read_slice(4)?;
        Ok(u32::from_le_bytes(slice.try_into().expect("4-byte slice")))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read_slice(N)?;
        Ok(slice.try_into().expect("fixed-size slice"))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction::new(
            vec![
                TxInput {
                    prev: Outpoint {
                        tx_id: archas(b"prev-1"),
                        index: 5,
                    },
                    sig: vec![0xAA, 0xBB, 0xCC],
                },
                TxInput {
                    prev: Outpoint {
                        tx_id: archas(b"prev-2"),
                        index: 10,
                    },
                    sig: vec![0xDD, 0xEE],
                },
            ],
            vec![
                TxOutput {
                    to: PublicAddress([0x11; 20]),
                    value: 100,
                },
                TxOutput {
                    to: PublicAddress([0x22; 20]),
                    value: 200,
                },
            ],
        )
    }

    #[test]
    fn test_coinbase_detection() {
        let coinbase = Transaction::new(
            vec![],
            vec![TxOutput {
                to: PublicAddress([1u8; 20]),
                value: 50,
            }],
        );
        assert!(coinbase.is_coinbase());
        assert!(!sample_tx().is_coinbase());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let tx = sample_tx();
        assert_eq!(tx.serialize(), tx.serialize());
    }

    #[test]
    fn test_tx_id_ignores_signatures() {
        let mut tx = sample_tx();
        let id = tx.tx_id;
        tx.inputs[0].sig = vec![0x99; 70];
        assert_eq!(tx.compute_tx_id(), id);
        assert_ne!(tx.serialize(), sample_tx().serialize());
    }

    #[test]
    fn test_wire_roundtrip() {
        let tx = sample_tx();
        let decoded = Transaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(tx, decoded);
    }

    #[test]
    fn test_deserialize_rejects_truncation() {
        let bytes = sample_tx().serialize();
        assert_eq!(
            Transaction::deserialize(&bytes[..bytes.len() - 1]),
            Err(CodecError::UnexpectedEof)
        );
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let mut bytes = sample_tx().serialize();
        bytes.push(0);
        assert_eq!(
            Transaction::deserialize(&bytes),
            Err(CodecError::TrailingBytes)
        );
    }

    #[test]
    fn test_signature_hash_binds_spent_output() {
        let tx = sample_tx();
        let to_a = PublicAddress([0xDD; 20]);
        let to_b = PublicAddress([0xEE; 20]);

        let base = tx.signature_hash(200, &to_a);
        assert_eq!(base, tx.signature_hash(200, &to_a));
        assert_ne!(base, tx.signature_hash(201, &to_a));
        assert_ne!(base, tx.signature_hash(200, &to_b));
    }

    #[test]
    fn test_signature_hash_binds_outputs() {
        let mut tx = sample_tx();
        let to = PublicAddress([0xDD; 20]);
        let before = tx.signature_hash(200, &to);
        tx.outputs[0].value += 1;
        assert_ne!(before, tx.signature_hash(200, &to));
    }
}
