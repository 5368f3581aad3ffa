//! Handles the creation and verification of (Ethereum) Signatures.
//!
//! The backend is picked at compile time: `k256` (pure Rust, default) or
//! `secp256k1` (bindings to libsecp256k1). If both are enabled, `secp256k1`
//! wins. Both produce the same 65 byte `r‖s‖v` signatures over the
//! `\x19Ethereum Signed Message:\n32` prefixed hash, so they can verify each
//! other's signatures.

use crate::abiencode::types::Hash;
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("enable at least one signer backend: `k256` or `secp256k1`");

#[cfg(feature = "k256")]
mod k256;
#[cfg(feature = "secp256k1")]
mod secp256k1;

#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
pub use self::k256::{recover_signer, Signer};
#[cfg(feature = "secp256k1")]
pub use self::secp256k1::{recover_signer, Signer};

#[derive(Debug, Error)]
pub enum Error {
    /// `v` has to be 27 or 28.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[cfg(feature = "k256")]
    #[error("k256: {0}")]
    K256(#[from] ::k256::ecdsa::Error),
    #[cfg(feature = "secp256k1")]
    #[error("secp256k1: {0}")]
    Secp256k1(#[from] ::secp256k1::Error),
}

/// Add the `\x19Ethereum Signed Message\n<length>` prefix to hash.
///
/// This is the format expected by the Solidity contracts.
fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding => We can't use the serializer
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

/// Strip the 27 offset Ethereum adds to the recovery id.
fn recovery_id(v: u8) -> Result<u8, Error> {
    match v {
        27 | 28 => Ok(v - 27),
        _ => Err(Error::InvalidRecoveryId(v)),
    }
}
