use serde::{Deserialize, Serialize};

use crate::config;
use crate::ensure;
use crate::error::ChainError;
use crate::operations::Operation;
use crate::types::{AccountName, Digest, PublicKey, Signature, Timestamp, TransactionId};

/// `chain_id = sha256(chain_name)`. Prefixes every signing digest.
pub fn chain_id() -> Digest {
    Digest::hash(config::CHAIN_ID_NAME.as_bytes())
}

/// An unsigned transaction body.
///
/// `ref_block_num`/`ref_block_prefix` commit to a recent block (TaPoS);
/// `expiration` bounds how long the transaction may float before inclusion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: Timestamp,
    pub operations: Vec<Operation>,
    pub extensions: Vec<()>,
}

impl Transaction {
    /// Canonical body bytes: the bincode serialization of all fields.
    pub fn body_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transaction serialization is infallible")
    }

    pub fn digest(&self) -> Digest {
        Digest::hash(&self.body_bytes())
    }

    /// The digest covered by signatures: `sha256(chain_id ‖ body)`.
    pub fn sig_digest(&self, chain_id: &Digest) -> Digest {
        let mut data = chain_id.0.to_vec();
        data.extend_from_slice(&self.body_bytes());
        Digest::hash(&data)
    }

    pub fn id(&self) -> TransactionId {
        TransactionId::from_digest(&self.digest())
    }

    /// Static validation of the body: nonempty, and every operation passes
    /// its own `validate()`.
    pub fn validate(&self) -> Result<(), ChainError> {
        ensure!(!self.operations.is_empty(), ChainError::Validation, "transaction has no operations");
        for op in &self.operations {
            op.validate()?;
        }
        Ok(())
    }

    /// Set the TaPoS reference fields from a block id.
    pub fn set_reference_block(&mut self, block_id: &crate::types::BlockId) {
        self.ref_block_num = (block_id.block_num() & 0xffff) as u16;
        self.ref_block_prefix = block_id.tapos_prefix();
    }
}

/// A transaction plus its authorizing signatures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub trx: Transaction,
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    pub fn id(&self) -> TransactionId {
        self.trx.id()
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        self.trx.validate()
    }

    /// Recover the public keys that produced this transaction's signatures.
    pub fn signature_keys(
        &self,
        chain_id: &Digest,
        recover: impl Fn(&Signature, &Digest) -> Result<PublicKey, ChainError>,
    ) -> Result<Vec<PublicKey>, ChainError> {
        let digest = self.trx.sig_digest(chain_id);
        let mut keys = Vec::with_capacity(self.signatures.len());
        for sig in &self.signatures {
            let key = recover(sig, &digest)?;
            ensure!(
                !keys.contains(&key),
                ChainError::Authority,
                "duplicate signature by {key}"
            );
            keys.push(key);
        }
        Ok(keys)
    }

    pub fn serialized_size(&self) -> usize {
        bincode::serialize(self).map(|b| b.len()).unwrap_or(usize::MAX)
    }
}

/// Well-known name placeholder used when an operation implicitly targets the
/// sender (e.g. `transfer_to_vesting` with an empty `to`).
pub fn effective_account<'a>(explicit: &'a AccountName, fallback: &'a AccountName) -> &'a AccountName {
    if explicit.is_empty() {
        fallback
    } else {
        explicit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, GBC};
    use crate::operations::TransferOperation;

    fn sample() -> Transaction {
        Transaction {
            ref_block_num: 42,
            ref_block_prefix: 0xdead_beef,
            expiration: 1_000_000,
            operations: vec![Operation::Transfer(TransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                amount: Asset::new(1, GBC),
                memo: String::new(),
            })],
            extensions: vec![],
        }
    }

    #[test]
    fn serialization_round_trip() {
        let tx = sample();
        let bytes = bincode::serialize(&tx).unwrap();
        let back: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.id(), tx.id());
    }

    #[test]
    fn id_ignores_signatures() {
        let tx = sample();
        let signed = SignedTransaction {
            trx: tx.clone(),
            signatures: vec![Signature([3u8; 65])],
        };
        assert_eq!(signed.id(), tx.id());
    }

    #[test]
    fn sig_digest_is_chain_bound() {
        let tx = sample();
        let other_chain = Digest::hash(b"other");
        assert_ne!(tx.sig_digest(&chain_id()), tx.sig_digest(&other_chain));
    }

    #[test]
    fn empty_transaction_is_invalid() {
        let tx = Transaction::default();
        assert!(tx.validate().is_err());
    }
}
