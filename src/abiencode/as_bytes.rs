//! Serialize any `&[u8]` as solidity `bytes` (dynamic length bytes).
//!
//! Without this, it would be serialized as a `bytesN` slot (if it is at most
//! 32 bytes long) or rejected.
//!
//! # Example usage
//! ```ignore
//! # // We cannot run this test because abiencode is not public.
//! # use serde::Serialize;
//! #[derive(Serialize, Debug)]
//! pub struct Allocation {
//!     #[serde(with = "as_bytes")]
//!     pub metadata: Vec<u8>,
//! }
//! ```

use super::ser::MARK_DYNAMIC_BYTES;
use serde::{Serialize, Serializer};

/// Lets us call `serialize_bytes` from inside the marker newtype.
struct Bytes<'a>(&'a [u8]);

impl<'a> Serialize for Bytes<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

pub fn serialize<S, T>(v: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]> + ?Sized,
{
    serializer.serialize_newtype_struct(MARK_DYNAMIC_BYTES, &Bytes(v.as_ref()))
}
