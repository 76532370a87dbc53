use serde::{Deserialize, Serialize};

use crate::transaction::SignedTransaction;
use crate::types::{AccountName, BlockId, Digest, Ripemd, Signature, Timestamp};
use crate::version::BlockHeaderExtension;

/// The unsigned block header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub timestamp: Timestamp,
    pub witness: AccountName,
    pub transaction_merkle_root: Ripemd,
    pub extensions: Vec<BlockHeaderExtension>,
}

impl BlockHeader {
    /// Block number: one past the parent's number.
    pub fn block_num(&self) -> u32 {
        self.previous.block_num() + 1
    }

    pub fn digest(&self) -> Digest {
        Digest::hash(&bincode::serialize(self).expect("header serialization is infallible"))
    }
}

/// A header plus the producing witness's signature.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedBlockHeader {
    pub header: BlockHeader,
    pub witness_signature: Signature,
}

impl SignedBlockHeader {
    /// The block id: a 20-byte digest of the signed header with the
    /// big-endian block number written over the first four bytes.
    pub fn id(&self) -> BlockId {
        let serialized =
            bincode::serialize(self).expect("signed header serialization is infallible");
        let mut id = BlockId(Ripemd::hash(&Digest::hash(&serialized).0).0);
        id.0[..4].copy_from_slice(&self.header.block_num().to_be_bytes());
        id
    }
}

/// A full signed block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub signed_header: SignedBlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBlock {
    pub fn block_num(&self) -> u32 {
        self.signed_header.header.block_num()
    }

    pub fn id(&self) -> BlockId {
        self.signed_header.id()
    }

    pub fn previous(&self) -> BlockId {
        self.signed_header.header.previous
    }

    pub fn timestamp(&self) -> Timestamp {
        self.signed_header.header.timestamp
    }

    pub fn witness(&self) -> &AccountName {
        &self.signed_header.header.witness
    }

    /// Merkle root over transaction ids, pairwise-hashed with odd-leaf carry.
    pub fn calculate_merkle_root(&self) -> Ripemd {
        if self.transactions.is_empty() {
            return Ripemd::default();
        }
        let mut layer: Vec<Ripemd> = self.transactions.iter().map(|t| Ripemd(t.id().0)).collect();
        while layer.len() > 1 {
            let mut next = Vec::with_capacity((layer.len() + 1) / 2);
            for pair in layer.chunks(2) {
                if pair.len() == 2 {
                    let mut data = pair[0].0.to_vec();
                    data.extend_from_slice(&pair[1].0);
                    next.push(Ripemd::hash(&data));
                } else {
                    next.push(pair[0]);
                }
            }
            layer = next;
        }
        layer[0]
    }

    pub fn serialized_size(&self) -> usize {
        bincode::serialize(self).map(|b| b.len()).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(num: u32) -> SignedBlock {
        let mut previous = BlockId::default();
        previous.0[..4].copy_from_slice(&(num - 1).to_be_bytes());
        SignedBlock {
            signed_header: SignedBlockHeader {
                header: BlockHeader {
                    previous,
                    timestamp: 3 * num as i64,
                    witness: "initminer".into(),
                    transaction_merkle_root: Ripemd::default(),
                    extensions: vec![],
                },
                witness_signature: Signature([0u8; 65]),
            },
            transactions: vec![],
        }
    }

    #[test]
    fn id_embeds_block_num() {
        let b = block_at(7);
        assert_eq!(b.block_num(), 7);
        assert_eq!(b.id().block_num(), 7);
    }

    #[test]
    fn ids_differ_by_content() {
        let a = block_at(7);
        let mut b = block_at(7);
        b.signed_header.header.timestamp += 3;
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn empty_merkle_root_is_null() {
        assert_eq!(block_at(1).calculate_merkle_root(), Ripemd::default());
    }

    #[test]
    fn serialization_round_trip() {
        let b = block_at(9);
        let bytes = bincode::serialize(&b).unwrap();
        let back: SignedBlock = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, b);
        assert_eq!(back.id(), b.id());
    }
}
