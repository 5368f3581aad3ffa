use super::*;
use crate::{
    abiencode::types::{Address, Signature, U256},
    channel::{Add, Balance, Guarantee, LedgerOutcome, Proposal, Vars},
};
use prost::encoding::{decode_key, skip_field, DecodeContext, WireType};
use std::collections::BTreeMap;

fn outcome() -> LedgerOutcome {
    LedgerOutcome::new(
        Address([0x0a; 20]),
        Balance::new(Destination([0xa1; 32]), U256::MAX),
        Balance::new(Destination([0xb0; 32]), U256::from(300)),
        [
            Guarantee::new(
                U256::from(7),
                Destination([0x30; 32]),
                Destination([0xa1; 32]),
                Destination([0xb0; 32]),
            ),
            Guarantee::new(
                U256::from(5),
                Destination([0x10; 32]),
                Destination([0xa1; 32]),
                Destination([0xb0; 32]),
            ),
        ],
    )
}

fn signed_proposal() -> SignedProposal {
    let g = Guarantee::new(
        U256::from(1) << 200,
        Destination([0x42; 32]),
        Destination([0xa1; 32]),
        Destination([0xb0; 32]),
    );
    SignedProposal {
        proposal: Proposal::add(Destination([0xcc; 32]), Add::new(3, g, U256::from(1) << 199)),
        signature: Signature([0x1b; 65]),
    }
}

#[test]
fn signed_proposal_roundtrip() {
    let p = signed_proposal();
    let decoded = decode_signed_proposal(&encode_signed_proposal(&p)).unwrap();
    assert_eq!(decoded, p);
}

#[test]
fn outcome_keeps_large_amounts_and_order() {
    let o = outcome();
    let wire = ledgerwire::LedgerOutcome::from(&o);

    assert_eq!(wire.left.as_ref().unwrap().amount, vec![0xff; 32]);
    assert_eq!(wire.guarantees[0].target, vec![0x10; 32]);
    assert_eq!(wire.guarantees[1].target, vec![0x30; 32]);

    let buf = wire.encode_to_vec();
    let decoded: LedgerOutcome = ledgerwire::LedgerOutcome::decode(buf.as_slice())
        .unwrap()
        .try_into()
        .unwrap();
    assert_eq!(decoded, o);
}

#[test]
fn vars_roundtrip() {
    let vars = Vars {
        turn_num: u64::MAX,
        outcome: outcome(),
    };
    let decoded: Vars = ledgerwire::Vars::from(&vars).try_into().unwrap();
    assert_eq!(decoded, vars);
}

#[test]
fn short_amounts_are_accepted() {
    let wire = ledgerwire::Balance {
        destination: vec![0xa1; 32],
        amount: vec![0x01, 0x00],
    };
    let b = Balance::try_from(wire).unwrap();
    assert_eq!(b.amount(), U256::from(256));
}

#[test]
fn rejects_wrong_lengths() {
    let wire = ledgerwire::Balance {
        destination: vec![0xa1; 20],
        amount: vec![],
    };
    assert!(matches!(
        Balance::try_from(wire),
        Err(ConversionError::ByteLengthMismatch {
            field: "balance.destination",
            expected: 32,
            got: 20
        })
    ));

    let wire = ledgerwire::Balance {
        destination: vec![0xa1; 32],
        amount: vec![0x01; 33],
    };
    assert!(matches!(
        Balance::try_from(wire),
        Err(ConversionError::ByteLengthMismatch { expected: 32, got: 33, .. })
    ));

    let mut wire = ledgerwire::SignedProposal::from(&signed_proposal());
    wire.signature.pop();
    assert!(matches!(
        SignedProposal::try_from(wire),
        Err(ConversionError::ByteLengthMismatch { expected: 65, got: 64, .. })
    ));
}

#[test]
fn rejects_missing_fields() {
    let mut wire = ledgerwire::LedgerOutcome::from(&outcome());
    wire.right = None;
    assert!(matches!(
        LedgerOutcome::try_from(wire),
        Err(ConversionError::ExpectedSome("outcome.right"))
    ));

    let mut wire = ledgerwire::SignedProposal::from(&signed_proposal());
    if let Some(p) = wire.proposal.as_mut() {
        p.kind = None;
    }
    assert!(matches!(
        SignedProposal::try_from(wire),
        Err(ConversionError::ExpectedSome("proposal.kind"))
    ));
}

#[test]
fn rejects_duplicate_guarantees() {
    let mut wire = ledgerwire::LedgerOutcome::from(&outcome());
    let g = wire.guarantees[1].clone();
    wire.guarantees.push(g);
    assert!(matches!(
        LedgerOutcome::try_from(wire),
        Err(ConversionError::DuplicateGuarantee(d)) if d == Destination([0x30; 32])
    ));
}

#[test]
fn rejects_wrong_participant_count() {
    let wire = ledgerwire::FixedPart {
        participants: vec![vec![0; 20]; 3],
        chain_id: vec![1],
        channel_nonce: 0,
        challenge_duration: 0,
    };
    assert!(matches!(
        crate::channel::FixedPart::try_from(wire),
        Err(ConversionError::ParticipantSizeMismatch(3))
    ));
}

#[test]
fn rejects_garbage() {
    assert!(matches!(
        decode_signed_proposal(&[0xff, 0xff, 0xff]),
        Err(ConversionError::Decode(_))
    ));
    assert!(matches!(
        decode_channel(&[]),
        Err(ConversionError::ByteLengthMismatch {
            field: "channel.id",
            ..
        })
    ));
}

/// Field numbers and wire types per message, as declared in the schema.
fn schema_fields() -> BTreeMap<String, BTreeMap<u32, WireType>> {
    let mut messages = BTreeMap::new();
    let mut current = None;
    for line in include_str!("../../proto/ledger.proto").lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        let tokens: Vec<_> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["message", name, "{"] => current = Some(name.to_string()),
            [.., ty, _name, "=", tag] => {
                let tag = tag.trim_end_matches(';').parse().unwrap();
                let wire_type = match *ty {
                    "uint64" | "uint32" => WireType::Varint,
                    _ => WireType::LengthDelimited,
                };
                messages
                    .entry(current.clone().unwrap())
                    .or_insert_with(BTreeMap::new)
                    .insert(tag, wire_type);
            }
            _ => {}
        }
    }
    messages
}

/// Field numbers and wire types present in an encoded message.
fn encoded_fields(buf: Vec<u8>) -> BTreeMap<u32, WireType> {
    let mut fields = BTreeMap::new();
    let mut buf = buf.as_slice();
    while !buf.is_empty() {
        let (tag, wire_type) = decode_key(&mut buf).unwrap();
        skip_field(wire_type, tag, &mut buf, DecodeContext::default()).unwrap();
        fields.insert(tag, wire_type);
    }
    fields
}

#[test]
fn messages_match_proto_schema() {
    use ledgerwire as w;

    let b = vec![1];
    let guarantee = w::Guarantee {
        amount: b.clone(),
        target: b.clone(),
        left: b.clone(),
        right: b.clone(),
    };
    let add = w::Add {
        turn_num: 1,
        guarantee: Some(guarantee.clone()),
        left_deposit: b.clone(),
    };
    let proposal = w::Proposal {
        channel_id: b.clone(),
        kind: Some(w::proposal::Kind::Add(add.clone())),
    };
    let signed_proposal = w::SignedProposal {
        proposal: Some(proposal.clone()),
        signature: b.clone(),
    };
    let signed_vars = w::SignedVars {
        vars: Some(Default::default()),
        signatures: vec![b.clone()],
    };

    let encoded = [
        (
            "Balance",
            w::Balance {
                destination: b.clone(),
                amount: b.clone(),
            }
            .encode_to_vec(),
        ),
        ("Guarantee", guarantee.encode_to_vec()),
        (
            "LedgerOutcome",
            w::LedgerOutcome {
                asset: b.clone(),
                left: Some(Default::default()),
                right: Some(Default::default()),
                guarantees: vec![guarantee.clone()],
            }
            .encode_to_vec(),
        ),
        (
            "Vars",
            w::Vars {
                turn_num: 1,
                outcome: Some(Default::default()),
            }
            .encode_to_vec(),
        ),
        ("SignedVars", signed_vars.encode_to_vec()),
        ("Add", add.encode_to_vec()),
        ("Proposal", proposal.encode_to_vec()),
        ("SignedProposal", signed_proposal.encode_to_vec()),
        (
            "FixedPart",
            w::FixedPart {
                participants: vec![b.clone()],
                chain_id: b.clone(),
                channel_nonce: 1,
                challenge_duration: 1,
            }
            .encode_to_vec(),
        ),
        (
            "ConsensusChannel",
            w::ConsensusChannel {
                id: b.clone(),
                fixed_part: Some(Default::default()),
                my_index: 1,
                current: Some(signed_vars.clone()),
                proposal_queue: vec![signed_proposal.clone()],
            }
            .encode_to_vec(),
        ),
    ];

    let schema = schema_fields();
    assert_eq!(
        schema.keys().map(String::as_str).collect::<Vec<_>>(),
        {
            let mut names: Vec<_> = encoded.iter().map(|(name, _)| *name).collect();
            names.sort_unstable();
            names
        }
    );
    for (name, buf) in encoded {
        assert_eq!(encoded_fields(buf), schema[name], "fields of {}", name);
    }
}
