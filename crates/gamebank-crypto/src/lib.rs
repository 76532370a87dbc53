//! gamebank-crypto
//!
//! Key generation, compact recoverable ECDSA signatures, and digest helpers.
//! The protocol crate defines the byte-level [`PublicKey`]/[`Signature`]
//! types; this crate gives them behavior.

pub mod hash;
pub mod keypair;

pub use keypair::{recover_public_key, PrivateKey};
