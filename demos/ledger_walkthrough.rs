//! Walkthrough of the ledger consensus protocol between two threads.
//!
//! Alice (leader) funds three channels from the ledger without waiting for
//! Bob (follower) in between. Bob countersigns them one by one and sends the
//! countersignatures back. Proposals travel protobuf-encoded over
//! [std::sync::mpsc] channels, standing in for a network connection.
//!
//! Run with `RUST_LOG=ledger_consensus=trace` to see every protocol step.

use ledger_consensus::{
    channel::{Add, Balance, ConsensusChannel, FixedPart, Guarantee, LedgerOutcome, Vars},
    sig::Signer,
    wire, Address, Destination, U256,
};
use std::{error::Error, sync::mpsc, thread};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

const CHANNELS_TO_FUND: u8 = 3;

/// Helper macro to print significant places in the protocol.
macro_rules! print_bold {
    ($($arg:tt)*) => {
        print!("\x1b[1m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

/// Bob: countersigns every proposal in the order it arrives.
fn bob(
    signer: Signer,
    mut channel: ConsensusChannel,
    rx: mpsc::Receiver<Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<ConsensusChannel, BoxError> {
    // Ends once Alice drops her sender.
    for buf in rx {
        let proposal = wire::decode_signed_proposal(&buf)?;
        channel.receive(proposal)?;

        // A real application would decide here whether it wants to fund the
        // target channel.
        let countersigned = channel.sign_next_proposal(&proposal.proposal, &signer)?;
        print_bold!("Bob: countersigned turn {}", countersigned.turn_num());
        tx.send(wire::encode_signed_proposal(&countersigned))?;
    }
    Ok(channel)
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_target(false)
        .init();

    let mut rng = rand::thread_rng();
    let alice = Signer::new(&mut rng);
    let bob_signer = Signer::new(&mut rng);

    let fp = FixedPart {
        participants: [alice.address(), bob_signer.address()],
        chain_id: U256::from(1337),
        channel_nonce: rand::random(),
        challenge_duration: 100,
    };
    let outcome = LedgerOutcome::new(
        Address::default(),
        Balance::new(alice.address().into(), U256::from(100)),
        Balance::new(bob_signer.address().into(), U256::from(100)),
        [],
    );

    // The ledger has been funded on-chain and both signed the initial state.
    let initial = Vars {
        turn_num: 0,
        outcome: outcome.clone(),
    }
    .as_state(&fp);
    let signatures = [initial.sign(&alice)?, initial.sign(&bob_signer)?];
    let mut leader = ConsensusChannel::new_leader_channel(fp, 0, outcome.clone(), signatures)?;
    let follower = ConsensusChannel::new_follower_channel(fp, 0, outcome, signatures)?;
    print_bold!("Ledger channel {:?} is open", leader.id());

    let (to_bob, from_alice) = mpsc::channel();
    let (to_alice, from_bob) = mpsc::channel();
    let handle = thread::spawn(move || bob(bob_signer, follower, from_alice, to_alice));

    // Alice does not wait for countersignatures before proposing the next
    // guarantee.
    for i in 1..=CHANNELS_TO_FUND {
        let target: Destination = rand::random();
        let guarantee = Guarantee::new(
            U256::from(10 * u64::from(i)),
            target,
            alice.address().into(),
            leader.follower().into(),
        );
        let proposed = leader.propose(Add::new(0, guarantee, U256::from(5)), &alice)?;
        print_bold!("Alice: proposed turn {}", proposed.turn_num());
        to_bob.send(wire::encode_signed_proposal(&proposed))?;
    }
    drop(to_bob);

    for buf in from_bob {
        let countersigned = wire::decode_signed_proposal(&buf)?;
        leader.update_consensus(&countersigned)?;
    }

    let follower = handle.join().map_err(|_| "Bob panicked")??;
    assert_eq!(leader.current(), follower.current());

    let outcome = &leader.consensus_vars().outcome;
    print_bold!(
        "Consensus at turn {}: Alice {}, Bob {}, {} guarantees",
        leader.consensus_turn_num(),
        outcome.left().amount(),
        outcome.right().amount(),
        outcome.funding_targets().len()
    );

    // Persist and restore Alice's side, all signatures are checked again.
    let snapshot = wire::encode_channel(&leader);
    let restored = wire::decode_channel(&snapshot)?;
    assert_eq!(restored, leader);
    print_bold!("Restored channel from {} bytes", snapshot.len());

    Ok(())
}
