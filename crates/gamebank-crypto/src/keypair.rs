use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::{Digest, PublicKey, Signature};

/// A secp256k1 private key. The raw bytes are wiped on drop.
pub struct PrivateKey {
    secret: Zeroizing<[u8; 32]>,
}

impl PrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let (secret, _) = Secp256k1::new().generate_keypair(&mut rand::thread_rng());
        PrivateKey {
            secret: Zeroizing::new(secret.secret_bytes()),
        }
    }

    /// Derive a key deterministically from a seed string (wallet-style
    /// `name + role + password` derivation: the key is sha256 of the seed).
    pub fn from_seed(seed: &str) -> Self {
        let digest = Digest::hash(seed.as_bytes());
        PrivateKey {
            secret: Zeroizing::new(digest.0),
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, ChainError> {
        SecretKey::from_slice(&bytes)
            .map_err(|e| ChainError::Serialization(format!("invalid private key: {e}")))?;
        Ok(PrivateKey {
            secret: Zeroizing::new(bytes),
        })
    }

    fn secret_key(&self) -> SecretKey {
        SecretKey::from_slice(self.secret.as_ref()).expect("validated at construction")
    }

    /// The compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        let pk = self.secret_key().public_key(&secp);
        PublicKey(pk.serialize())
    }

    /// Sign a 32-byte digest, producing a 65-byte compact recoverable
    /// signature: one recovery byte followed by r ‖ s.
    pub fn sign(&self, digest: &Digest) -> Signature {
        let secp = Secp256k1::new();
        let msg = Message::from_digest(digest.0);
        let sig = secp.sign_ecdsa_recoverable(&msg, &self.secret_key());
        let (rec_id, compact) = sig.serialize_compact();
        let mut out = [0u8; 65];
        out[0] = rec_id.to_i32() as u8 + 31;
        out[1..].copy_from_slice(&compact);
        Signature(out)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey {{ public_key: {} }}", self.public_key())
    }
}

/// Recover the signing public key from a compact signature over `digest`.
pub fn recover_public_key(sig: &Signature, digest: &Digest) -> Result<PublicKey, ChainError> {
    let rec_byte = sig.0[0];
    if rec_byte < 31 {
        return Err(ChainError::Authority("malformed signature recovery byte".into()));
    }
    let rec_id = RecoveryId::from_i32((rec_byte - 31) as i32)
        .map_err(|e| ChainError::Authority(format!("bad recovery id: {e}")))?;
    let compact = RecoverableSignature::from_compact(&sig.0[1..], rec_id)
        .map_err(|e| ChainError::Authority(format!("malformed signature: {e}")))?;
    let secp = Secp256k1::new();
    let msg = Message::from_digest(digest.0);
    let key = secp
        .recover_ecdsa(&msg, &compact)
        .map_err(|e| ChainError::Authority(format!("signature recovery failed: {e}")))?;
    Ok(PublicKey(key.serialize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_recover() {
        let key = PrivateKey::generate();
        let digest = Digest::hash(b"payload");
        let sig = key.sign(&digest);
        assert_eq!(recover_public_key(&sig, &digest).unwrap(), key.public_key());
    }

    #[test]
    fn recovery_rejects_wrong_digest() {
        let key = PrivateKey::generate();
        let sig = key.sign(&Digest::hash(b"payload"));
        let other = Digest::hash(b"other payload");
        // recovery may succeed but must not yield the signer's key
        match recover_public_key(&sig, &other) {
            Ok(k) => assert_ne!(k, key.public_key()),
            Err(_) => {}
        }
    }

    #[test]
    fn seeded_keys_are_deterministic() {
        let a = PrivateKey::from_seed("initminer:owner:secret");
        let b = PrivateKey::from_seed("initminer:owner:secret");
        assert_eq!(a.public_key(), b.public_key());
    }
}
