//! Signer using the secp256k1 crate (bindings to libsecp256k1).

use crate::abiencode::types::{Address, Hash, Signature};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha3::{Digest, Keccak256};

use super::{hash_to_eth_signed_msg_hash, recovery_id, Error};

pub struct Signer {
    secp: Secp256k1<All>,
    key: SecretKey,
    addr: Address,
}

// Never print the key.
impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

fn address_of(pk: &PublicKey) -> Address {
    // Throw away the first byte, which is not part of the public key. It is
    // added by serialize_uncompressed due to the encoding used.
    let hash: [u8; 32] = Keccak256::digest(&pk.serialize_uncompressed()[1..]).into();

    let mut addr = Address([0; 20]);
    addr.0.copy_from_slice(&hash[32 - 20..]);
    addr
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        Self::from_key(SecretKey::new(rng))
    }

    /// Load a raw 32 byte secret key.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, Error> {
        Ok(Self::from_key(SecretKey::from_slice(secret)?))
    }

    fn from_key(key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let addr = address_of(&PublicKey::from_secret_key(&secp, &key));
        Self { secp, key, addr }
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign a hash using a Ethereum 65-byte recoverable signature.
    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        let hash = hash_to_eth_signed_msg_hash(msg);

        // sign_ecdsa_recoverable gives us the recovery id the contracts need
        // for v.
        let sig = self
            .secp
            .sign_ecdsa_recoverable(&Message::from_slice(&hash.0)?, &self.key);
        let (v, rs) = sig.serialize_compact();

        // EIP-2 rejects signatures with a high s. libsecp256k1 already
        // produces canonical signatures, this is just to fail early if that
        // ever changes.
        debug_assert!(rs[32] & 0x80 == 0);

        // No EIP-155 chain id in v, openzeppelin would not recover those.
        let v: u8 = 27 + v.to_i32() as u8;

        Ok(Signature::new(&rs, v))
    }
}

/// Recover the address that signed `msg` (without the `Ethereum Signed
/// Message` prefix, it is added here).
pub fn recover_signer(msg: Hash, eth_sig: Signature) -> Result<Address, Error> {
    let secp = Secp256k1::verification_only();
    let hash = hash_to_eth_signed_msg_hash(msg);

    let recid = RecoveryId::from_i32(recovery_id(eth_sig.0[64])?.into())?;
    let sig = RecoverableSignature::from_compact(&eth_sig.0[..64], recid)?;

    let pk = secp.recover_ecdsa(&Message::from_slice(&hash.0)?, &sig)?;
    Ok(address_of(&pk))
}
