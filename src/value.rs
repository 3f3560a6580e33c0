// Copyright 2017-2019 Parity Technologies (UK) Ltd.
// This file is part of Substrate.

// Substrate is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Substrate is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Substrate.  If not, see <http://www.gnu.org/licenses/>.

//! Value codecs: turning application values into bytes and back.
//!
//! A [`Serializer`] additionally declares a fixed size (`0` for variable-length
//! values); [`crate::storage::mmap`] uses that declaration to lay out value
//! records without a length prefix whenever it can.

use crate::cell::TERMINATOR;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Converts a value into its on-disk byte representation.
pub trait Serializer<V: ?Sized> {
	/// Serializes `value` into a newly allocated byte vector.
	fn serialize(&self, value: &V) -> Vec<u8>;

	/// The number of bytes every serialized value occupies, or `0` if values
	/// vary in length.
	fn fixed_size(&self) -> usize {
		0
	}
}

/// Converts a byte slice back into a value.
pub trait Deserializer<V> {
	/// Deserializes `bytes` into a value.
	fn deserialize(&self, bytes: &[u8]) -> Result<V>;
}

macro_rules! integer_codec {
	($ty:ty, $size:expr, $write:ident, $read:ident) => {
		impl Serializer<$ty> for BigEndianIntegerCodec {
			fn serialize(&self, value: &$ty) -> Vec<u8> {
				let mut buf = [0u8; $size];
				BigEndian::$write(&mut buf, *value as _);
				buf.to_vec()
			}

			fn fixed_size(&self) -> usize {
				$size
			}
		}

		impl Deserializer<$ty> for BigEndianIntegerCodec {
			fn deserialize(&self, bytes: &[u8]) -> Result<$ty> {
				if bytes.len() != $size {
					return Err(Error::malformed(format!(
						"expected {} bytes for {}, found {}",
						$size,
						stringify!($ty),
						bytes.len()
					)));
				}
				Ok(BigEndian::$read(bytes) as $ty)
			}
		}
	};
}

/// The default big-endian codec for fixed-width integers.
///
/// One instance implements [`Serializer`]/[`Deserializer`] for every integer
/// width that [`byteorder`] can read and write natively (`u16`/`i16` and
/// wider); `u8`/`i8` are handled directly since they carry no byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BigEndianIntegerCodec;

impl Serializer<u8> for BigEndianIntegerCodec {
	fn serialize(&self, value: &u8) -> Vec<u8> {
		vec![*value]
	}

	fn fixed_size(&self) -> usize {
		1
	}
}

impl Deserializer<u8> for BigEndianIntegerCodec {
	fn deserialize(&self, bytes: &[u8]) -> Result<u8> {
		match bytes {
			[b] => Ok(*b),
			_ => Err(Error::malformed(format!("expected 1 byte for u8, found {}", bytes.len()))),
		}
	}
}

integer_codec!(u16, 2, write_u16, read_u16);
integer_codec!(u32, 4, write_u32, read_u32);
integer_codec!(u64, 8, write_u64, read_u64);
integer_codec!(i16, 2, write_i16, read_i16);
integer_codec!(i32, 4, write_i32, read_i32);
integer_codec!(i64, 8, write_i64, read_i64);

/// Escapes `bytes` so the result can appear inside a key without being
/// confused for the terminator or the escape marker.
///
/// The escape marker is `0xFD`. `0xFD` itself escapes to `{0xFD, 0xFD}` and
/// the terminator `0xFE` escapes to `{0xFD, 0xFE}`; every other byte,
/// including `0x00`, passes through unchanged.
pub fn escape(bytes: &[u8]) -> Vec<u8> {
	const ESCAPE_MARKER: u8 = 0xFD;
	let mut out = Vec::with_capacity(bytes.len());
	for &b in bytes {
		match b {
			ESCAPE_MARKER => out.extend_from_slice(&[ESCAPE_MARKER, ESCAPE_MARKER]),
			TERMINATOR => out.extend_from_slice(&[ESCAPE_MARKER, TERMINATOR]),
			other => out.push(other),
		}
	}
	out
}

/// Reverses [`escape`].
pub fn unescape(bytes: &[u8]) -> Result<Vec<u8>> {
	const ESCAPE_MARKER: u8 = 0xFD;
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == ESCAPE_MARKER {
			let next = bytes.get(i + 1).ok_or_else(|| {
				Error::malformed("escape marker at end of byte string")
			})?;
			match *next {
				ESCAPE_MARKER | TERMINATOR => out.push(*next),
				other => {
					return Err(Error::malformed(format!(
						"unexpected byte 0x{:02x} after escape marker",
						other
					)))
				}
			}
			i += 2;
		} else {
			out.push(bytes[i]);
			i += 1;
		}
	}
	Ok(out)
}

/// The default codec for variable-length byte strings.
///
/// With `escaping` enabled, [`Serializer::serialize`] runs [`escape`] over
/// the value and [`Deserializer::deserialize`] runs [`unescape`]; this is
/// what lets arbitrary byte strings be used as trie keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteStringCodec {
	escaping: bool,
}

impl ByteStringCodec {
	/// A codec that passes bytes through unchanged.
	pub fn new() -> Self {
		Self { escaping: false }
	}

	/// A codec that escapes the terminator and escape-marker bytes so the
	/// result is safe to use as a trie key.
	pub fn escaping() -> Self {
		Self { escaping: true }
	}
}

impl Serializer<Vec<u8>> for ByteStringCodec {
	fn serialize(&self, value: &Vec<u8>) -> Vec<u8> {
		if self.escaping {
			escape(value)
		} else {
			value.clone()
		}
	}

	fn fixed_size(&self) -> usize {
		0
	}
}

impl Deserializer<Vec<u8>> for ByteStringCodec {
	fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
		if self.escaping {
			unescape(bytes)
		} else {
			Ok(bytes.to_vec())
		}
	}
}
