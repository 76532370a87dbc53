use ripemd::Ripemd160;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::config;
use crate::error::ChainError;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Sentinel for "never" (archived comments, completed withdrawals).
pub const TIMESTAMP_MAX: Timestamp = i64::MAX;

// ── AccountName ──────────────────────────────────────────────────────────────

/// An on-chain account name: 3–16 chars, dot-separated segments of
/// `[a-z][a-z0-9-]*[a-z0-9]`, each segment at least 3 chars.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(pub String);

impl AccountName {
    pub fn new(s: &str) -> Result<Self, ChainError> {
        let name = AccountName(s.to_string());
        if !name.is_valid() {
            return Err(ChainError::Validation(format!("invalid account name: {s}")));
        }
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        let len = self.0.len();
        if len < config::MIN_ACCOUNT_NAME_LENGTH || len > config::MAX_ACCOUNT_NAME_LENGTH {
            return false;
        }
        for segment in self.0.split('.') {
            let bytes = segment.as_bytes();
            if bytes.len() < 3 {
                return false;
            }
            if !bytes[0].is_ascii_lowercase() {
                return false;
            }
            if !bytes[bytes.len() - 1].is_ascii_alphanumeric()
                || bytes[bytes.len() - 1].is_ascii_uppercase()
            {
                return false;
            }
            if !bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
            {
                return false;
            }
        }
        true
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        AccountName(s.to_string())
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountName({})", self.0)
    }
}

// ── Digest ───────────────────────────────────────────────────────────────────

/// A 32-byte sha256 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub fn hash(data: &[u8]) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        Digest(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}…)", &self.to_hex()[..16])
    }
}

/// A 20-byte ripemd160 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ripemd(pub [u8; 20]);

impl Ripemd {
    pub fn hash(data: &[u8]) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&Ripemd160::digest(data));
        Ripemd(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ripemd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ripemd({})", self.to_hex())
    }
}

// ── BlockId ──────────────────────────────────────────────────────────────────

/// 20-byte block identifier. The first four bytes carry the big-endian block
/// number so that the number can be recovered from the id alone.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 20]);

impl BlockId {
    pub fn block_num(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// The second 32-bit word of the id, used as a transaction's
    /// `ref_block_prefix`.
    pub fn tapos_prefix(&self) -> u32 {
        u32::from_le_bytes([self.0[4], self.0[5], self.0[6], self.0[7]])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.to_hex())
    }
}

// ── TransactionId ────────────────────────────────────────────────────────────

/// 20-byte transaction identifier: the first 20 bytes of sha256 over the
/// transaction body (signatures excluded).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; 20]);

impl TransactionId {
    pub fn from_digest(d: &Digest) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&d.0[..20]);
        TransactionId(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({}…)", &self.to_hex()[..16])
    }
}

// ── PublicKey ────────────────────────────────────────────────────────────────

/// A 33-byte compressed secp256k1 public key.
///
/// Binary serialization is the raw 33 bytes; human-readable serialization is
/// the base58 form with the chain address prefix and a 4-byte ripemd160
/// checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    /// The all-zero key. Assigned to a witness's signing slot to disable
    /// production, and used as the authority of the null account.
    pub fn null() -> Self {
        PublicKey([0u8; 33])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 33]
    }

    pub fn to_base58(&self) -> String {
        let checksum = Ripemd160::digest(self.0);
        let mut data = self.0.to_vec();
        data.extend_from_slice(&checksum[..4]);
        format!("{}{}", config::ADDRESS_PREFIX, bs58::encode(data).into_string())
    }

    pub fn from_base58(s: &str) -> Result<Self, ChainError> {
        let stripped = s
            .strip_prefix(config::ADDRESS_PREFIX)
            .ok_or_else(|| ChainError::Serialization(format!("missing address prefix: {s}")))?;
        let data = bs58::decode(stripped)
            .into_vec()
            .map_err(|e| ChainError::Serialization(format!("bad base58 key: {e}")))?;
        if data.len() != 37 {
            return Err(ChainError::Serialization(format!(
                "bad public key length: {}",
                data.len()
            )));
        }
        let mut key = [0u8; 33];
        key.copy_from_slice(&data[..33]);
        let checksum = Ripemd160::digest(key);
        if checksum[..4] != data[33..] {
            return Err(ChainError::Serialization("public key checksum mismatch".into()));
        }
        Ok(PublicKey(key))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;
        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = PublicKey;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a 33-byte compressed public key")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<PublicKey, E> {
                PublicKey::from_base58(v).map_err(E::custom)
            }
            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<PublicKey, E> {
                if v.len() != 33 {
                    return Err(E::custom(format!("bad key length {}", v.len())));
                }
                let mut key = [0u8; 33];
                key.copy_from_slice(v);
                Ok(PublicKey(key))
            }
            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<PublicKey, A::Error> {
                let mut key = [0u8; 33];
                for (i, slot) in key.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(PublicKey(key))
            }
        }
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(KeyVisitor)
        } else {
            deserializer.deserialize_bytes(KeyVisitor)
        }
    }
}

// ── Signature ────────────────────────────────────────────────────────────────

/// A 65-byte compact recoverable ECDSA signature (recovery id + r + s).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Default for Signature {
    fn default() -> Self {
        Signature([0u8; 65])
    }
}

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &self.to_hex()[..16])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SigVisitor;
        impl<'de> Visitor<'de> for SigVisitor {
            type Value = Signature;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a 65-byte compact signature")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Signature, E> {
                let bytes = hex::decode(v).map_err(E::custom)?;
                self.visit_bytes(&bytes)
            }
            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Signature, E> {
                if v.len() != 65 {
                    return Err(E::custom(format!("bad signature length {}", v.len())));
                }
                let mut sig = [0u8; 65];
                sig.copy_from_slice(v);
                Ok(Signature(sig))
            }
            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Signature, A::Error> {
                let mut sig = [0u8; 65];
                for (i, slot) in sig.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Signature(sig))
            }
        }
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(SigVisitor)
        } else {
            deserializer.deserialize_bytes(SigVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_rules() {
        assert!(AccountName::new("alice").is_ok());
        assert!(AccountName::new("a-b-c").is_ok());
        assert!(AccountName::new("alice.bob").is_ok());
        assert!(AccountName::new("ab").is_err());
        assert!(AccountName::new("Alice").is_err());
        assert!(AccountName::new("-alice").is_err());
        assert!(AccountName::new("alice-").is_err());
        assert!(AccountName::new("9alice").is_err());
        assert!(AccountName::new("a.b").is_err());
        assert!(AccountName::new("this-name-is-far-too-long").is_err());
    }

    #[test]
    fn block_id_embeds_number() {
        let mut id = BlockId::default();
        id.0[..4].copy_from_slice(&1234u32.to_be_bytes());
        assert_eq!(id.block_num(), 1234);
    }

    #[test]
    fn public_key_base58_round_trip() {
        let key = PublicKey([7u8; 33]);
        let s = key.to_base58();
        assert!(s.starts_with(config::ADDRESS_PREFIX));
        assert_eq!(PublicKey::from_base58(&s).unwrap(), key);
    }

    #[test]
    fn public_key_bincode_round_trip() {
        let key = PublicKey([9u8; 33]);
        let bytes = bincode::serialize(&key).unwrap();
        let back: PublicKey = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, key);
    }
}
