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

//! A read-only storage backend that memory-maps a serialized trie file.
//!
//! Cells are read straight out of the mapping. Values are decoded lazily
//! through the supplied [`Deserializer`] and kept in a small LRU cache, since
//! decoding (and the allocation it usually implies) is the one cost a
//! memory-mapped trie can't avoid on every lookup otherwise.

use crate::cell::{base, check};
use crate::error::{Error, Result};
use crate::value::Deserializer;
use byteorder::{BigEndian, ByteOrder};
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::File;
use std::path::Path;
use std::rc::Rc;

const HEADER_FIELD_SIZE: usize = 4;

/// The default number of decoded values kept in the LRU cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

struct Inner<V> {
	mmap: memmap2::Mmap,
	cell_count: usize,
	cells_offset: usize,
	value_count: usize,
	fixed_value_size: usize,
	values_offset: usize,
	cache: Mutex<LruCache<usize, Rc<V>>>,
	deserializer: Box<dyn Deserializer<V>>,
}

/// A memory-mapped, read-only double array and its decoded-value cache.
///
/// Cloning is cheap: it shares the mapping and the cache (guarded by a
/// [`parking_lot::Mutex`]) through an [`Rc`].
pub struct MmapStorage<V> {
	inner: Rc<Inner<V>>,
}

impl<V> Clone for MmapStorage<V> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}

impl<V> MmapStorage<V> {
	/// Opens `path`, parsing the header at byte offset `content_offset` eagerly
	/// so that later lookups only ever touch the mapping.
	///
	/// `content_offset` lets a trie be embedded inside a larger file, starting
	/// the base/check byte-length field at that offset instead of at the
	/// start of the file. It must not exceed the file's length.
	pub fn open<D>(
		path: impl AsRef<Path>,
		deserializer: D,
		cache_capacity: usize,
		content_offset: usize,
	) -> Result<Self>
	where
		D: Deserializer<V> + 'static,
	{
		let file = File::open(path)?;
		// Safety: the file is not expected to be mutated for the lifetime of
		// the mapping; callers that share the file with a writer are on their
		// own, same as every other `mmap`-backed reader.
		let mmap = unsafe { memmap2::Mmap::map(&file)? };

		if content_offset > mmap.len() {
			return Err(Error::invalid_argument(format!(
				"content_offset {} is beyond end of file ({} bytes)",
				content_offset,
				mmap.len()
			)));
		}

		let mut cursor = content_offset;
		let byte_len = read_u32(&mmap, &mut cursor)? as usize;
		if byte_len % 4 != 0 {
			return Err(Error::malformed("base/check byte length is not a multiple of 4"));
		}
		let cell_count = byte_len / 4;
		let cells_offset = cursor;
		cursor = cursor
			.checked_add(byte_len)
			.ok_or_else(|| Error::malformed("base/check region overflows file"))?;

		let value_count = read_u32(&mmap, &mut cursor)? as usize;
		let fixed_value_size = read_u32(&mmap, &mut cursor)? as usize;
		if fixed_value_size == 0 {
			return Err(Error::invalid_argument(
				"mmap storage requires a file with a fixed value size; this file declares variable-size values",
			));
		}

		let values_offset = cursor;
		let values_byte_len = value_count
			.checked_mul(fixed_value_size)
			.ok_or_else(|| Error::malformed("value region overflows file"))?;
		if values_offset + values_byte_len > mmap.len() {
			return Err(Error::malformed("value region overflows file"));
		}

		log::debug!(
			"opened mmap trie: {} cells, {} values of {} bytes each",
			cell_count,
			value_count,
			fixed_value_size,
		);

		Ok(Self {
			inner: Rc::new(Inner {
				mmap,
				cell_count,
				cells_offset,
				value_count,
				fixed_value_size,
				values_offset,
				cache: Mutex::new(LruCache::new(cache_capacity.max(1))),
				deserializer: Box::new(deserializer),
			}),
		})
	}

	/// The number of cells in the mapped double array.
	pub fn len(&self) -> usize {
		self.inner.cell_count
	}

	/// Whether the mapped double array holds only the root cell.
	pub fn is_empty(&self) -> bool {
		self.inner.cell_count <= 1
	}

	/// The base field of the cell at `index`.
	pub fn base_at(&self, index: usize) -> i32 {
		if index >= self.inner.cell_count {
			return 0;
		}
		let offset = self.inner.cells_offset + index * 4;
		base(BigEndian::read_u32(&self.inner.mmap[offset..offset + 4]))
	}

	/// The check byte of the cell at `index`.
	pub fn check_at(&self, index: usize) -> u8 {
		if index >= self.inner.cell_count {
			return crate::cell::VACANT_CHECK;
		}
		let offset = self.inner.cells_offset + index * 4;
		check(BigEndian::read_u32(&self.inner.mmap[offset..offset + 4]))
	}

	/// The number of values stored in the file.
	pub fn value_count(&self) -> usize {
		self.inner.value_count
	}

	/// The fraction of mapped cells that are not vacant.
	pub fn filling_rate(&self) -> f64 {
		if self.inner.cell_count == 0 {
			return 0.0;
		}
		let occupied = (0..self.inner.cell_count).filter(|&i| self.check_at(i) != crate::cell::VACANT_CHECK).count();
		occupied as f64 / self.inner.cell_count as f64
	}

	/// Decodes and returns the value at `index`, consulting the cache first.
	///
	/// On a miss, reads `fixed_value_size` bytes at
	/// `values_offset + index * fixed_value_size` and inserts the decoded
	/// result into the cache, evicting the least-recently-used entry if the
	/// cache is full.
	pub fn value_at(&self, index: usize) -> Result<Option<Rc<V>>> {
		if index >= self.inner.value_count {
			return Ok(None);
		}
		let mut cache = self.inner.cache.lock();
		if let Some(value) = cache.get(&index) {
			return Ok(Some(value.clone()));
		}
		let size = self.inner.fixed_value_size;
		let start = self.inner.values_offset + index * size;
		let bytes = &self.inner.mmap[start..start + size];
		let value = Rc::new(self.inner.deserializer.deserialize(bytes)?);
		let was_full = cache.len() == cache.cap();
		cache.put(index, value.clone());
		if was_full {
			log::trace!("mmap value cache evicted an entry after inserting index {}", index);
		}
		Ok(Some(value))
	}

	/// The number of decoded values currently held in the LRU cache.
	///
	/// Exposed for tests that need to observe eviction behavior.
	pub fn cached_value_count(&self) -> usize {
		self.inner.cache.lock().len()
	}
}

fn read_u32(mmap: &memmap2::Mmap, cursor: &mut usize) -> Result<u32> {
	if *cursor + HEADER_FIELD_SIZE > mmap.len() {
		return Err(Error::malformed("file is too short for its own header"));
	}
	let value = BigEndian::read_u32(&mmap[*cursor..*cursor + HEADER_FIELD_SIZE]);
	*cursor += HEADER_FIELD_SIZE;
	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::Storage;
	use crate::value::BigEndianIntegerCodec;

	fn write_fixed_size_trie(path: &std::path::Path) {
		let trie = crate::trie::Trie::builder()
			.elements(vec![
				(b"SETA".to_vec(), 42u32),
				(b"UTIGOSI".to_vec(), 24),
				(b"UTO".to_vec(), 2424),
			])
			.build()
			.unwrap();
		let mut file = std::fs::File::create(path).unwrap();
		trie.save_to(&mut file, &BigEndianIntegerCodec).unwrap();
	}

	#[test]
	fn rejects_variable_size_value_files() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("variable.bin");
		let mut storage = Storage::<Vec<u8>>::new();
		storage.push_value(b"hello".to_vec()).unwrap();
		let mut file = std::fs::File::create(&path).unwrap();
		storage.write_to(&mut file, &crate::value::ByteStringCodec::new()).unwrap();
		drop(file);

		let err = MmapStorage::open(&path, crate::value::ByteStringCodec::new(), 10, 0).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}

	#[test]
	fn small_cache_evicts_least_recently_used_entries() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("fixed.bin");
		write_fixed_size_trie(&path);

		let mapped = MmapStorage::open(&path, BigEndianIntegerCodec, 2, 0).unwrap();
		let trie = crate::trie::Trie::from_storage(Storage::Mmap(mapped.clone()));

		assert_eq!(*trie.find(b"SETA").unwrap().unwrap(), 42);
		assert_eq!(*trie.find(b"UTIGOSI").unwrap().unwrap(), 24);
		assert_eq!(*trie.find(b"UTO").unwrap().unwrap(), 2424);

		// cache capacity 2, three distinct values decoded: at least one eviction happened.
		assert_eq!(mapped.cached_value_count(), 2);
		assert_eq!(*trie.find(b"SETA").unwrap().unwrap(), 42);
	}

	#[test]
	fn content_offset_reads_a_trie_embedded_inside_a_larger_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("embedded.bin");

		let preamble = b"not part of the trie at all";
		let mut file = std::fs::File::create(&path).unwrap();
		std::io::Write::write_all(&mut file, preamble).unwrap();
		let trie = crate::trie::Trie::builder()
			.elements(vec![(b"SETA".to_vec(), 42u32), (b"UTO".to_vec(), 2424)])
			.build()
			.unwrap();
		trie.save_to(&mut file, &BigEndianIntegerCodec).unwrap();
		drop(file);

		let mapped =
			MmapStorage::open(&path, BigEndianIntegerCodec, 10, preamble.len()).unwrap();
		let embedded = crate::trie::Trie::from_storage(Storage::Mmap(mapped));
		assert_eq!(*embedded.find(b"SETA").unwrap().unwrap(), 42);
		assert_eq!(*embedded.find(b"UTO").unwrap().unwrap(), 2424);
	}

	#[test]
	fn content_offset_beyond_file_size_is_invalid_argument() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("fixed.bin");
		write_fixed_size_trie(&path);

		let file_len = std::fs::metadata(&path).unwrap().len() as usize;
		let err = MmapStorage::open(&path, BigEndianIntegerCodec, 10, file_len + 1).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}
}
