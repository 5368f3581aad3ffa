//! Serde based Solidity ABI encoder.
//!
//! Encoding happens in two steps. A [serde::Serializer] first turns the value
//! into a [Token] tree that knows which parts are dynamic, then the tree is
//! written slot by slot (32 bytes each) into a [Writer] using the usual
//! head/tail layout:
//!
//! - Structs and tuples (including fixed-size arrays `[T; N]`) become
//!   `Tuple`, which is dynamic iff one of its members is.
//! - Sequences (`Vec<T>`, `&[T]`) become `Array`, the Solidity `T[]`.
//! - Integers, bools and everything written via `serialize_bytes` (`bytes32`,
//!   addresses, `uint256`) become a single `Word`.
//! - Solidity `bytes` must be marked using [as_bytes][super::as_bytes], as
//!   `serialize_bytes` is already taken by the fixed-size types.

use super::error::{Error, Result};
use serde::{
    ser::{self, SerializeSeq, SerializeStruct, SerializeTuple, SerializeTupleStruct},
    Serialize,
};

/// Newtype struct name used by [as_bytes][super::as_bytes] to mark its content
/// as dynamic `bytes`. The characters have no special meaning, they have just
/// been chosen in a way that normal Rust types will never have this name.
pub(super) const MARK_DYNAMIC_BYTES: &str = ":$&_DYNAMIC_BYTES";

pub(super) const SLOT_SIZE: usize = 32; // bytes

pub trait Writer {
    fn write(&mut self, slot: &[u8]);
}

impl Writer for Vec<u8> {
    fn write(&mut self, slot: &[u8]) {
        self.extend_from_slice(slot);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    Word([u8; SLOT_SIZE]),
    Bytes(Vec<u8>),
    Tuple(Vec<Token>),
    Array(Vec<Token>),
}

fn padded_len(len: usize) -> usize {
    (len + SLOT_SIZE - 1) / SLOT_SIZE * SLOT_SIZE
}

fn word_from_usize(v: usize) -> [u8; SLOT_SIZE] {
    let mut word = [0u8; SLOT_SIZE];
    word[SLOT_SIZE - 8..].copy_from_slice(&(v as u64).to_be_bytes());
    word
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Word(_) => false,
            Token::Bytes(_) | Token::Array(_) => true,
            Token::Tuple(members) => members.iter().any(Token::is_dynamic),
        }
    }

    /// Space this token occupies in the head of the enclosing sequence.
    fn head_len(&self) -> usize {
        if self.is_dynamic() {
            return SLOT_SIZE;
        }
        match self {
            Token::Tuple(members) => members.iter().map(Token::head_len).sum(),
            _ => SLOT_SIZE,
        }
    }

    /// Length of the full encoding of this token, i.e. what is written in the
    /// tail for dynamic tokens or inline for static ones.
    fn encoded_len(&self) -> usize {
        match self {
            Token::Word(_) => SLOT_SIZE,
            Token::Bytes(data) => SLOT_SIZE + padded_len(data.len()),
            Token::Tuple(members) => sequence_len(members),
            Token::Array(members) => SLOT_SIZE + sequence_len(members),
        }
    }

    fn write<W: Writer>(&self, writer: &mut W) {
        match self {
            Token::Word(word) => writer.write(word),
            Token::Bytes(data) => {
                writer.write(&word_from_usize(data.len()));
                let chunks = data.chunks_exact(SLOT_SIZE);
                let rem = chunks.remainder();
                for chunk in chunks {
                    writer.write(chunk);
                }
                if !rem.is_empty() {
                    let mut slot = [0u8; SLOT_SIZE];
                    slot[..rem.len()].copy_from_slice(rem);
                    writer.write(&slot);
                }
            }
            Token::Tuple(members) => write_sequence(members, writer),
            Token::Array(members) => {
                writer.write(&word_from_usize(members.len()));
                write_sequence(members, writer);
            }
        }
    }
}

fn sequence_len(members: &[Token]) -> usize {
    members
        .iter()
        .map(|m| {
            if m.is_dynamic() {
                SLOT_SIZE + m.encoded_len()
            } else {
                m.head_len()
            }
        })
        .sum()
}

// Offsets are relative to the start of the sequence, which for arrays is
// after the length slot.
fn write_sequence<W: Writer>(members: &[Token], writer: &mut W) {
    let mut offset: usize = members.iter().map(Token::head_len).sum();
    for m in members {
        if m.is_dynamic() {
            writer.write(&word_from_usize(offset));
            offset += m.encoded_len();
        } else {
            m.write(writer);
        }
    }
    for m in members.iter().filter(|m| m.is_dynamic()) {
        m.write(writer);
    }
}

/// Equivalent to Solidity's `abi.encode(value)`.
pub fn to_writer<T, W>(value: &T, writer: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    let token = value.serialize(TokenSerializer::default())?;
    write_sequence(core::slice::from_ref(&token), writer);
    Ok(())
}

/// Encode the fields of a struct (or tuple) as if they were passed as
/// separate arguments, i.e. `abi.encode(value.a, value.b, ...)`. Other values
/// are encoded like [to_writer].
pub fn to_args_writer<T, W>(value: &T, writer: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    match value.serialize(TokenSerializer::default())? {
        Token::Tuple(members) => write_sequence(&members, writer),
        token => write_sequence(core::slice::from_ref(&token), writer),
    }
    Ok(())
}

#[derive(Default)]
pub(super) struct TokenSerializer {
    dynamic_bytes: bool,
}

impl TokenSerializer {
    fn word_right_aligned(v: &[u8]) -> Token {
        let mut word = [0u8; SLOT_SIZE];
        word[SLOT_SIZE - v.len()..].copy_from_slice(v);
        Token::Word(word)
    }

    fn word_signed(negative: bool, v: &[u8]) -> Token {
        let filler = if negative { 0xff } else { 0x00 };
        let mut word = [filler; SLOT_SIZE];
        word[SLOT_SIZE - v.len()..].copy_from_slice(v);
        Token::Word(word)
    }
}

pub(super) struct Compound {
    members: Vec<Token>,
    is_array: bool,
}

impl Compound {
    fn new(is_array: bool, len: Option<usize>) -> Self {
        Compound {
            members: Vec::with_capacity(len.unwrap_or(0)),
            is_array,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.members
            .push(value.serialize(TokenSerializer::default())?);
        Ok(())
    }

    fn finish(self) -> Token {
        if self.is_array {
            Token::Array(self.members)
        } else {
            Token::Tuple(self.members)
        }
    }
}

impl ser::Serializer for TokenSerializer {
    type Ok = Token;
    type Error = Error;

    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = ser::Impossible<Token, Error>;
    type SerializeMap = ser::Impossible<Token, Error>;
    type SerializeStruct = Compound;
    type SerializeStructVariant = ser::Impossible<Token, Error>;

    fn serialize_bool(self, v: bool) -> Result<Token> {
        self.serialize_u8(u8::from(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Token> {
        Ok(Self::word_signed(v < 0, &v.to_be_bytes()))
    }

    fn serialize_i16(self, v: i16) -> Result<Token> {
        Ok(Self::word_signed(v < 0, &v.to_be_bytes()))
    }

    fn serialize_i32(self, v: i32) -> Result<Token> {
        Ok(Self::word_signed(v < 0, &v.to_be_bytes()))
    }

    fn serialize_i64(self, v: i64) -> Result<Token> {
        Ok(Self::word_signed(v < 0, &v.to_be_bytes()))
    }

    fn serialize_i128(self, v: i128) -> Result<Token> {
        Ok(Self::word_signed(v < 0, &v.to_be_bytes()))
    }

    fn serialize_u8(self, v: u8) -> Result<Token> {
        Ok(Self::word_right_aligned(&v.to_be_bytes()))
    }

    fn serialize_u16(self, v: u16) -> Result<Token> {
        Ok(Self::word_right_aligned(&v.to_be_bytes()))
    }

    fn serialize_u32(self, v: u32) -> Result<Token> {
        Ok(Self::word_right_aligned(&v.to_be_bytes()))
    }

    fn serialize_u64(self, v: u64) -> Result<Token> {
        Ok(Self::word_right_aligned(&v.to_be_bytes()))
    }

    fn serialize_u128(self, v: u128) -> Result<Token> {
        Ok(Self::word_right_aligned(&v.to_be_bytes()))
    }

    fn serialize_f32(self, _: f32) -> Result<Token> {
        Err(Error::TypeNotRepresentable("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<Token> {
        Err(Error::TypeNotRepresentable("f64"))
    }

    fn serialize_char(self, _: char) -> Result<Token> {
        Err(Error::TypeNotYetSupported("char"))
    }

    fn serialize_str(self, v: &str) -> Result<Token> {
        // Solidity strings are encoded exactly like `bytes`.
        Ok(Token::Bytes(v.as_bytes().to_vec()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Token> {
        if self.dynamic_bytes {
            return Ok(Token::Bytes(v.to_vec()));
        }
        if v.len() > SLOT_SIZE {
            return Err(Error::SlotOverflow(v.len()));
        }
        // bytesN is left aligned. Types that need right alignment (uint256,
        // address) hand us a full slot already.
        let mut word = [0u8; SLOT_SIZE];
        word[..v.len()].copy_from_slice(v);
        Ok(Token::Word(word))
    }

    fn serialize_none(self) -> Result<Token> {
        Err(Error::TypeNotRepresentable("none"))
    }

    fn serialize_some<T: ?Sized>(self, _: &T) -> Result<Token>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("some"))
    }

    fn serialize_unit(self) -> Result<Token> {
        Err(Error::TypeNotRepresentable("unit"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Token> {
        Err(Error::TypeNotRepresentable("unit struct"))
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<Token> {
        Err(Error::TypeNotRepresentable("unit variant (enum)"))
    }

    fn serialize_newtype_struct<T: ?Sized>(self, name: &'static str, value: &T) -> Result<Token>
    where
        T: Serialize,
    {
        if name == MARK_DYNAMIC_BYTES {
            value.serialize(TokenSerializer {
                dynamic_bytes: true,
            })
        } else {
            value.serialize(self)
        }
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Token>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("newtype variant (enum)"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Compound> {
        Ok(Compound::new(true, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound> {
        Ok(Compound::new(false, Some(len)))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Compound> {
        Ok(Compound::new(false, Some(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::TypeNotRepresentable("tuple variant (enum)"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn serialize_struct(self, _: &'static str, len: usize) -> Result<Compound> {
        Ok(Compound::new(false, Some(len)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::TypeNotRepresentable("struct variant"))
    }

    fn collect_str<T: ?Sized>(self, _value: &T) -> Result<Token>
    where
        T: core::fmt::Display,
    {
        Err(Error::TypeNotYetSupported("collect_str"))
    }
}

impl SerializeSeq for Compound {
    type Ok = Token;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Token> {
        Ok(self.finish())
    }
}

impl SerializeTuple for Compound {
    type Ok = Token;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Token> {
        Ok(self.finish())
    }
}

impl SerializeTupleStruct for Compound {
    type Ok = Token;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Token> {
        Ok(self.finish())
    }
}

impl SerializeStruct for Compound {
    type Ok = Token;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, _name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Token> {
        Ok(self.finish())
    }
}
