//! Serialize a fixed-size array `[T; N]` as solidity `T[]` (dynamic length)
//! instead of `T[N]`.
//!
//! The channel participants are stored as `[Address; 2]` but the on-chain
//! channel id hashes them as `address[]`.

use serde::ser::{Serialize, SerializeSeq, Serializer};

pub fn serialize<S, T>(v: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut s = serializer.serialize_seq(Some(v.len()))?;
    for e in v {
        s.serialize_element(e)?;
    }
    s.end()
}
