//! Consensus core of two-party ledger channels.
//!
//! A ledger channel holds the funds of two participants on a single asset
//! and locks parts of them in guarantees to fund other channels off-chain.
//! Updates follow a leader/follower protocol: the leader proposes and signs,
//! the follower countersigns in order. See [channel::ConsensusChannel].
//!
//! States are hashed with the Solidity ABI encoding and signed with Ethereum
//! signatures ([sig]), so they can be enforced on-chain. [wire] has the
//! protobuf encoding used to exchange proposals and persist channels.
//!
//! Nothing here logs to a subscriber on its own. Events are emitted with
//! [tracing], install a subscriber in the application to see them.

mod abiencode {
    mod error;
    mod hashing;
    mod ser;

    pub mod as_bytes;
    pub mod as_dyn_array;
    pub mod types;

    pub use error::{Error, Result};
    pub use hashing::{to_args_hash, to_hash};
    pub use ser::{to_args_writer, to_writer, Writer};

    #[cfg(test)]
    mod tests;
}
pub mod channel;
pub mod sig;
pub mod wire;

pub use abiencode::{
    types::{Address, Destination, Hash, Signature, U256},
    Error as AbiEncodeError,
};
