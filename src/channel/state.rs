//! The state a ledger channel's participants actually sign.
//!
//! Only the turn number and the outcome change over the lifetime of a ledger
//! channel. Everything else is either fixed at channel creation
//! ([FixedPart]) or constant for ledger channels (no app, no app data, never
//! final while it is being updated off-chain).

use super::{exit::Exit, vars::Vars, ChannelId, Role};
use crate::{
    abiencode::{
        self, as_bytes, as_dyn_array,
        types::{Address, Hash, Signature, U256},
    },
    sig::{self, Signer},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("abi encoding failed: {0}")]
    AbiEncode(#[from] abiencode::Error),
    #[error("signature error: {0}")]
    Signature(#[from] sig::Error),
}

/// The parts of a channel that never change: who is in it, on which chain
/// and how long disputes take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPart {
    /// Indexed by [Role].
    pub participants: [Address; 2],
    pub chain_id: U256,
    pub channel_nonce: u64,
    pub challenge_duration: u32,
}

// Layout of `FixedPart` as hashed on-chain. Ledger channels never have an
// app, so the app definition is always the zero address.
#[derive(Serialize)]
struct FixedPartEncoding {
    chain_id: U256,
    #[serde(with = "as_dyn_array")]
    participants: [Address; 2],
    channel_nonce: u64,
    app_definition: Address,
    challenge_duration: u32,
}

impl FixedPart {
    /// `keccak256(abi.encode(chainId, participants, channelNonce,
    /// appDefinition, challengeDuration))`
    pub fn channel_id(&self) -> Result<ChannelId, abiencode::Error> {
        let hash = abiencode::to_args_hash(&FixedPartEncoding {
            chain_id: self.chain_id,
            participants: self.participants,
            channel_nonce: self.channel_nonce,
            app_definition: Address::default(),
            challenge_duration: self.challenge_duration,
        })?;
        Ok(hash.into())
    }

    pub fn participant(&self, role: Role) -> Address {
        self.participants[role.index()]
    }
}

/// A full channel state, see [Vars::as_state].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub fixed: FixedPart,
    pub turn_num: u64,
    pub outcome: Exit,
    pub app_data: Vec<u8>,
    pub is_final: bool,
}

#[derive(Serialize)]
struct StateEncoding<'a> {
    channel_id: ChannelId,
    #[serde(with = "as_bytes")]
    app_data: &'a [u8],
    outcome: &'a Exit,
    turn_num: u64,
    is_final: bool,
}

impl State {
    pub fn channel_id(&self) -> Result<ChannelId, abiencode::Error> {
        self.fixed.channel_id()
    }

    /// `keccak256(abi.encode(channelId, appData, outcome, turnNum, isFinal))`
    pub fn hash(&self) -> Result<Hash, abiencode::Error> {
        abiencode::to_args_hash(&StateEncoding {
            channel_id: self.channel_id()?,
            app_data: &self.app_data,
            outcome: &self.outcome,
            turn_num: self.turn_num,
            is_final: self.is_final,
        })
    }

    pub fn sign(&self, signer: &Signer) -> Result<Signature, StateError> {
        Ok(signer.sign_eth(self.hash()?)?)
    }

    pub fn recover_signer(&self, signature: Signature) -> Result<Address, StateError> {
        Ok(sig::recover_signer(self.hash()?, signature)?)
    }
}

impl Vars {
    /// Expand the vars into the full state of the channel described by `fp`.
    pub fn as_state(&self, fp: &FixedPart) -> State {
        State {
            fixed: *fp,
            turn_num: self.turn_num,
            outcome: self.outcome.as_outcome(),
            app_data: Vec::new(),
            is_final: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::outcome::tests::outcome;
    use rand::{rngs::StdRng, SeedableRng};

    fn fixed_part() -> FixedPart {
        let mut rng = StdRng::seed_from_u64(7);
        FixedPart {
            participants: [Signer::new(&mut rng).address(), Signer::new(&mut rng).address()],
            chain_id: U256::from(1337),
            channel_nonce: 0,
            challenge_duration: 60,
        }
    }

    #[test]
    fn channel_id_depends_on_every_field() {
        let fp = fixed_part();
        let id = fp.channel_id().unwrap();
        assert_eq!(id, fp.channel_id().unwrap());

        let mut other = fp;
        other.channel_nonce = 1;
        assert_ne!(id, other.channel_id().unwrap());

        let mut other = fp;
        other.participants.swap(0, 1);
        assert_ne!(id, other.channel_id().unwrap());

        let mut other = fp;
        other.chain_id = U256::from(1);
        assert_ne!(id, other.channel_id().unwrap());

        let mut other = fp;
        other.challenge_duration = 61;
        assert_ne!(id, other.channel_id().unwrap());
    }

    #[test]
    fn channel_id_encoding() {
        // abi.encode(chainId, participants, nonce, app, challengeDuration)
        // with the address[] in the tail.
        let fp = fixed_part();
        let mut buf = Vec::new();
        abiencode::to_args_writer(
            &FixedPartEncoding {
                chain_id: fp.chain_id,
                participants: fp.participants,
                channel_nonce: fp.channel_nonce,
                app_definition: Address::default(),
                challenge_duration: fp.challenge_duration,
            },
            &mut buf,
        )
        .unwrap();

        assert_eq!(buf.len(), 32 * 8);
        assert_eq!(buf[31], 0x39); // 1337 = 0x0539
        assert_eq!(buf[63], 5 * 32); // offset of participants
        assert_eq!(buf[5 * 32 + 31], 2); // participants length
        assert_eq!(&buf[6 * 32 + 12..7 * 32], &fp.participants[0].0);
    }

    #[test]
    fn hash_changes_with_turn_num_and_outcome() {
        let fp = fixed_part();
        let vars = Vars {
            turn_num: 0,
            outcome: outcome(200, 300, &[]),
        };
        let h0 = vars.as_state(&fp).hash().unwrap();

        let mut next = vars.clone();
        next.turn_num = 1;
        assert_ne!(h0, next.as_state(&fp).hash().unwrap());

        let other = Vars {
            turn_num: 0,
            outcome: outcome(201, 299, &[]),
        };
        assert_ne!(h0, other.as_state(&fp).hash().unwrap());
    }

    #[test]
    fn sign_and_recover() {
        let mut rng = StdRng::seed_from_u64(0);
        let signer = Signer::new(&mut rng);
        let state = Vars {
            turn_num: 3,
            outcome: outcome(1, 2, &[]),
        }
        .as_state(&fixed_part());

        let sig = state.sign(&signer).unwrap();
        assert_eq!(state.recover_signer(sig).unwrap(), signer.address());
    }
}
