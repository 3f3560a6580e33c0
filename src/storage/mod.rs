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

//! Storage backends for a double array: in-memory, reference-counted, and
//! memory-mapped.
//!
//! [`Storage`] is a closed, tagged enum rather than a trait object. Every
//! backend supports the same handful of read operations; only [`Storage::InMemory`]
//! supports mutation, which keeps the "can this be written to" question a
//! single match away instead of a capability the caller has to probe for.

pub mod memory;
pub mod mmap;

use crate::error::{Error, Result};
use crate::value::{Deserializer, Serializer};
use byteorder::{BigEndian, WriteBytesExt};
use memory::InMemoryStorage;
use mmap::MmapStorage;
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;

/// The storage backend behind a [`crate::trie::Trie`].
pub enum Storage<V> {
	/// A growable array owned by this handle alone.
	InMemory(InMemoryStorage<V>),
	/// An array shared, read-only, with every clone of this handle's trie.
	Shared(Rc<InMemoryStorage<V>>),
	/// A read-only array backed by a memory-mapped file.
	Mmap(MmapStorage<V>),
}

impl<V> Storage<V> {
	/// Creates a fresh, empty, mutable storage.
	pub fn new() -> Self {
		Storage::InMemory(InMemoryStorage::new())
	}

	/// The number of cells in the double array.
	pub fn len(&self) -> usize {
		match self {
			Storage::InMemory(s) => s.len(),
			Storage::Shared(s) => s.len(),
			Storage::Mmap(s) => s.len(),
		}
	}

	/// Whether the double array holds only the implicit root cell.
	pub fn is_empty(&self) -> bool {
		match self {
			Storage::InMemory(s) => s.is_empty(),
			Storage::Shared(s) => s.is_empty(),
			Storage::Mmap(s) => s.is_empty(),
		}
	}

	/// The base field of the cell at `index`.
	pub fn base_at(&self, index: usize) -> i32 {
		match self {
			Storage::InMemory(s) => s.base_at(index),
			Storage::Shared(s) => s.base_at(index),
			Storage::Mmap(s) => s.base_at(index),
		}
	}

	/// The check byte of the cell at `index`.
	pub fn check_at(&self, index: usize) -> u8 {
		match self {
			Storage::InMemory(s) => s.check_at(index),
			Storage::Shared(s) => s.check_at(index),
			Storage::Mmap(s) => s.check_at(index),
		}
	}

	/// Sets the base field of the cell at `index`.
	///
	/// Only [`Storage::InMemory`] supports this; every other variant returns
	/// [`Error::InvalidArgument`].
	pub fn set_base_at(&mut self, index: usize, value: i32) -> Result<()> {
		match self {
			Storage::InMemory(s) => {
				s.set_base_at(index, value);
				Ok(())
			}
			_ => Err(Error::invalid_argument("storage is read-only")),
		}
	}

	/// Sets the check byte of the cell at `index`.
	///
	/// Only [`Storage::InMemory`] supports this; every other variant returns
	/// [`Error::InvalidArgument`].
	pub fn set_check_at(&mut self, index: usize, value: u8) -> Result<()> {
		match self {
			Storage::InMemory(s) => {
				s.set_check_at(index, value);
				Ok(())
			}
			_ => Err(Error::invalid_argument("storage is read-only")),
		}
	}

	/// Appends a value, returning the index it was stored at.
	///
	/// Only [`Storage::InMemory`] supports this; every other variant returns
	/// [`Error::InvalidArgument`].
	pub fn push_value(&mut self, value: V) -> Result<usize> {
		match self {
			Storage::InMemory(s) => Ok(s.push_value(value)),
			_ => Err(Error::invalid_argument("storage is read-only")),
		}
	}

	/// Stores `value` at `index` (the spec's `add_value_at`).
	///
	/// Fails if `index` already holds a value: overwriting is forbidden. Only
	/// [`Storage::InMemory`] supports this; every other variant returns
	/// [`Error::InvalidArgument`].
	pub fn set_value_at(&mut self, index: usize, value: V) -> Result<()> {
		match self {
			Storage::InMemory(s) => s.set_value_at(index, value),
			_ => Err(Error::invalid_argument("storage is read-only")),
		}
	}

	/// The value stored at `index`, if any.
	pub fn value_at(&self, index: usize) -> Result<Option<Rc<V>>> {
		match self {
			Storage::InMemory(s) => Ok(s.value_at(index)),
			Storage::Shared(s) => Ok(s.value_at(index)),
			Storage::Mmap(s) => s.value_at(index),
		}
	}

	/// The number of values stored so far.
	pub fn value_count(&self) -> usize {
		match self {
			Storage::InMemory(s) => s.value_count(),
			Storage::Shared(s) => s.value_count(),
			Storage::Mmap(s) => s.value_count(),
		}
	}

	/// The fraction of non-vacant cells in the base/check array.
	pub fn filling_rate(&self) -> f64 {
		match self {
			Storage::InMemory(s) => s.filling_rate(),
			Storage::Shared(s) => s.filling_rate(),
			Storage::Mmap(s) => s.filling_rate(),
		}
	}

	/// Converts this storage into the [`Storage::Shared`] variant so further
	/// clones of the owning trie are a reference-count bump instead of a deep
	/// copy.
	///
	/// A no-op on [`Storage::Shared`] and [`Storage::Mmap`], which are already
	/// cheap to clone.
	pub fn into_shared(self) -> Self {
		match self {
			Storage::InMemory(s) => Storage::Shared(Rc::new(s)),
			other => other,
		}
	}

	/// Serializes the base/check array and every stored value to `writer` in
	/// the format read by [`Storage::load`] and [`Storage::open_mmap`].
	///
	/// Only meaningful for [`Storage::InMemory`] and [`Storage::Shared`];
	/// calling it on [`Storage::Mmap`] is an [`Error::InvalidArgument`] since
	/// a mapped file has nothing new to write back.
	pub fn write_to<W, S>(&self, writer: &mut W, serializer: &S) -> Result<()>
	where
		W: Write,
		S: Serializer<V>,
	{
		let (cells, values): (&[u32], &[Option<Rc<V>>]) = match self {
			Storage::InMemory(s) => (s.cells(), s.values()),
			Storage::Shared(s) => (s.cells(), s.values()),
			Storage::Mmap(_) => {
				return Err(Error::invalid_argument("cannot serialize a memory-mapped storage"))
			}
		};

		writer.write_u32::<BigEndian>((cells.len() * 4) as u32)?;
		for &cell in cells {
			writer.write_u32::<BigEndian>(cell)?;
		}

		let fixed_size = serializer.fixed_size();
		writer.write_u32::<BigEndian>(values.len() as u32)?;
		writer.write_u32::<BigEndian>(fixed_size as u32)?;
		for value in values {
			let value = value
				.as_ref()
				.ok_or_else(|| Error::invalid_argument("value table has an unset slot"))?;
			let bytes = serializer.serialize(value);
			if fixed_size != 0 && bytes.len() != fixed_size {
				return Err(Error::invalid_argument(format!(
					"serializer declared a fixed size of {} but produced {} bytes",
					fixed_size,
					bytes.len()
				)));
			}
			if fixed_size == 0 {
				writer.write_u32::<BigEndian>(bytes.len() as u32)?;
			}
			writer.write_all(&bytes)?;
		}
		Ok(())
	}

	/// Reads a trie previously written by [`Storage::write_to`] entirely into
	/// memory, decoding every value eagerly with `deserializer`.
	pub fn load<R, D>(reader: &mut R, deserializer: &D) -> Result<Self>
	where
		R: Read,
		D: Deserializer<V>,
	{
		let byte_len = reader.read_u32_be()? as usize;
		if byte_len % 4 != 0 {
			return Err(Error::malformed("base/check byte length is not a multiple of 4"));
		}
		let mut storage = InMemoryStorage::new();
		for index in 0..(byte_len / 4) {
			let cell = reader.read_u32_be()?;
			storage.set_base_at(index, crate::cell::base(cell));
			storage.set_check_at(index, crate::cell::check(cell));
		}

		let value_count = reader.read_u32_be()? as usize;
		let fixed_size = reader.read_u32_be()? as usize;
		for _ in 0..value_count {
			let len = if fixed_size == 0 { reader.read_u32_be()? as usize } else { fixed_size };
			let mut bytes = vec![0u8; len];
			reader.read_exact(&mut bytes)?;
			storage.push_value(deserializer.deserialize(&bytes)?);
		}

		Ok(Storage::InMemory(storage))
	}

	/// Memory-maps the file at `path` as a read-only storage, decoding values
	/// lazily and caching up to `cache_capacity` of them.
	///
	/// `content_offset` is the byte offset at which the trie's own header
	/// begins; pass `0` unless the trie is embedded inside a larger file.
	pub fn open_mmap<D>(
		path: impl AsRef<Path>,
		deserializer: D,
		cache_capacity: usize,
		content_offset: usize,
	) -> Result<Self>
	where
		D: Deserializer<V> + 'static,
	{
		Ok(Storage::Mmap(MmapStorage::open(path, deserializer, cache_capacity, content_offset)?))
	}
}

impl<V> Clone for Storage<V> {
	/// Cloning [`Storage::InMemory`] deep-copies the array; convert to
	/// [`Storage::Shared`] first if that's not what you want.
	fn clone(&self) -> Self {
		match self {
			Storage::InMemory(s) => Storage::InMemory(s.clone()),
			Storage::Shared(s) => Storage::Shared(s.clone()),
			Storage::Mmap(s) => Storage::Mmap(s.clone()),
		}
	}
}

impl<V> Default for Storage<V> {
	fn default() -> Self {
		Self::new()
	}
}

trait ReadU32Be {
	fn read_u32_be(&mut self) -> Result<u32>;
}

impl<R: Read> ReadU32Be for R {
	fn read_u32_be(&mut self) -> Result<u32> {
		use byteorder::ReadBytesExt;
		Ok(self.read_u32::<BigEndian>()?)
	}
}
