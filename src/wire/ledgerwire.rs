//! Protobuf messages from `proto/ledger.proto`.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Balance {
    #[prost(bytes = "vec", tag = "1")]
    pub destination: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub amount: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Guarantee {
    #[prost(bytes = "vec", tag = "1")]
    pub amount: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub target: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub left: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub right: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LedgerOutcome {
    #[prost(bytes = "vec", tag = "1")]
    pub asset: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub left: Option<Balance>,
    #[prost(message, optional, tag = "3")]
    pub right: Option<Balance>,
    #[prost(message, repeated, tag = "4")]
    pub guarantees: Vec<Guarantee>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Vars {
    #[prost(uint64, tag = "1")]
    pub turn_num: u64,
    #[prost(message, optional, tag = "2")]
    pub outcome: Option<LedgerOutcome>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedVars {
    #[prost(message, optional, tag = "1")]
    pub vars: Option<Vars>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Add {
    #[prost(uint64, tag = "1")]
    pub turn_num: u64,
    #[prost(message, optional, tag = "2")]
    pub guarantee: Option<Guarantee>,
    #[prost(bytes = "vec", tag = "3")]
    pub left_deposit: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    #[prost(oneof = "proposal::Kind", tags = "2")]
    pub kind: Option<proposal::Kind>,
}

/// Nested message and enum types in `Proposal`.
pub mod proposal {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "2")]
        Add(super::Add),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedProposal {
    #[prost(message, optional, tag = "1")]
    pub proposal: Option<Proposal>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FixedPart {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub participants: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub chain_id: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub channel_nonce: u64,
    #[prost(uint32, tag = "4")]
    pub challenge_duration: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusChannel {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub fixed_part: Option<FixedPart>,
    #[prost(uint32, tag = "3")]
    pub my_index: u32,
    #[prost(message, optional, tag = "4")]
    pub current: Option<SignedVars>,
    #[prost(message, repeated, tag = "5")]
    pub proposal_queue: Vec<SignedProposal>,
}
