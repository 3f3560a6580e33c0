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

//! The public facade over a built double array: lookup, iteration and
//! subtrie extraction.

use crate::builder::{BuildingObserver, Builder, NullObserver, DEFAULT_DENSITY_FACTOR};
use crate::cell::TERMINATOR;
use crate::error::{Error, Result};
use crate::iter::Iter;
use crate::storage::Storage;
use crate::value::{Deserializer, Serializer};
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;

/// An ordered map from byte strings to values, backed by a double array.
///
/// Cloning a [`Trie`] is always cheap: every handle shares its storage
/// through an [`Rc`], regardless of which [`Storage`] variant backs it.
pub struct Trie<V> {
	storage: Rc<Storage<V>>,
	root: usize,
}

impl<V> Clone for Trie<V> {
	fn clone(&self) -> Self {
		Self { storage: self.storage.clone(), root: self.root }
	}
}

impl<V> Trie<V> {
	/// Starts building a trie from scratch.
	pub fn builder() -> TrieBuilder<V> {
		TrieBuilder::new()
	}

	/// Wraps an already-populated storage as a whole trie rooted at index 0.
	pub(crate) fn from_storage(storage: Storage<V>) -> Self {
		Trie { storage: Rc::new(storage), root: 0 }
	}

	/// Converts this trie's backing storage into [`Storage::Shared`], so that
	/// cloning the underlying storage directly (as opposed to cloning this
	/// `Trie` handle, which is already cheap) becomes a reference-count bump
	/// instead of a deep copy.
	///
	/// A no-op if the storage is already [`Storage::Shared`] or
	/// [`Storage::Mmap`].
	pub fn into_shared(self) -> Trie<V> {
		let storage = match Rc::try_unwrap(self.storage) {
			Ok(storage) => storage,
			Err(shared) => (*shared).clone(),
		};
		Trie { storage: Rc::new(storage.into_shared()), root: self.root }
	}

	fn walk(&self, key: &[u8]) -> Option<usize> {
		let mut index = self.root;
		for &b in key {
			let base = self.storage.base_at(index);
			let child = base.checked_add(b as i32)?;
			if child < 0 {
				return None;
			}
			let child = child as usize;
			if self.storage.check_at(child) != b {
				return None;
			}
			index = child;
		}
		Some(index)
	}

	/// Looks up `key`, returning its value if present.
	pub fn find(&self, key: &[u8]) -> Result<Option<Rc<V>>> {
		let node = match self.walk(key) {
			Some(node) => node,
			None => return Ok(None),
		};
		let base = self.storage.base_at(node);
		let leaf = match base.checked_add(TERMINATOR as i32) {
			Some(leaf) if leaf >= 0 => leaf as usize,
			_ => return Ok(None),
		};
		if self.storage.check_at(leaf) != TERMINATOR {
			return Ok(None);
		}
		let value_index = self.storage.base_at(leaf);
		if value_index < 0 {
			return Err(Error::malformed("leaf cell has a negative value index"));
		}
		self.storage.value_at(value_index as usize)
	}

	/// Whether `key` is present in the trie.
	pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
		Ok(self.find(key)?.is_some())
	}

	/// Returns a view over the subtrie rooted at `prefix`, or `None` if no
	/// key has `prefix` as a prefix.
	///
	/// `prefix` is not itself looked up as a key: `subtrie(b"UT")` can
	/// return `Some` even if `b"UT"` alone isn't a stored key, as long as
	/// some stored key starts with it. The returned trie shares storage with
	/// `self`.
	pub fn subtrie(&self, prefix: &[u8]) -> Result<Option<Trie<V>>> {
		Ok(self.walk(prefix).map(|root| Trie { storage: self.storage.clone(), root }))
	}

	/// Iterates over every `(key, value)` pair reachable from this trie's
	/// root, in the array's encoded order (see [`Iter`]).
	pub fn iter(&self) -> Iter<'_, V> {
		Iter::new(&self.storage, self.root, Vec::new())
	}

	/// The storage backing this trie.
	pub fn storage(&self) -> &Storage<V> {
		&self.storage
	}

	/// Serializes this trie to `writer`.
	///
	/// Only valid for tries backed by [`Storage::InMemory`] or
	/// [`Storage::Shared`] rooted at the whole array (`subtrie` views built
	/// on a non-zero root cannot be serialized standalone).
	pub fn save_to<W, S>(&self, writer: &mut W, serializer: &S) -> Result<()>
	where
		W: Write,
		S: Serializer<V>,
	{
		if self.root != 0 {
			return Err(Error::invalid_argument("cannot serialize a subtrie view"));
		}
		self.storage.write_to(writer, serializer)
	}

	/// Loads a trie previously written by [`Trie::save_to`], decoding every
	/// value eagerly.
	pub fn load<R, D>(reader: &mut R, deserializer: &D) -> Result<Trie<V>>
	where
		R: Read,
		D: Deserializer<V>,
	{
		let storage = Storage::load(reader, deserializer)?;
		Ok(Trie::from_storage(storage))
	}

	/// Memory-maps the file at `path`, decoding values lazily with an LRU
	/// cache of `cache_capacity` entries.
	///
	/// `content_offset` is the byte offset at which the trie's own header
	/// begins; pass `0` unless the trie is embedded inside a larger file.
	pub fn open_mmap<D>(
		path: impl AsRef<Path>,
		deserializer: D,
		cache_capacity: usize,
		content_offset: usize,
	) -> Result<Trie<V>>
	where
		D: Deserializer<V> + 'static,
	{
		let storage = Storage::open_mmap(path, deserializer, cache_capacity, content_offset)?;
		Ok(Trie::from_storage(storage))
	}
}

/// Builds a [`Trie`] from a set of key/value pairs.
pub struct TrieBuilder<V> {
	elements: Vec<(Vec<u8>, V)>,
	density_factor: u32,
}

impl<V> Default for TrieBuilder<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> TrieBuilder<V> {
	/// Creates an empty builder with the default density factor.
	pub fn new() -> Self {
		Self { elements: Vec::new(), density_factor: DEFAULT_DENSITY_FACTOR }
	}

	/// Sets the key/value pairs to build from. Pairs need not be pre-sorted;
	/// [`TrieBuilder::build`] sorts them by key.
	pub fn elements(mut self, elements: Vec<(Vec<u8>, V)>) -> Self {
		self.elements = elements;
		self
	}

	/// Sets the density factor forwarded to [`Builder::density_factor`].
	pub fn density_factor(mut self, density_factor: u32) -> Self {
		self.density_factor = density_factor;
		self
	}
}

impl<V: Clone> TrieBuilder<V> {
	/// Builds the trie, reporting progress to `observer`.
	pub fn build_with_observer(self, observer: &mut dyn BuildingObserver) -> Result<Trie<V>> {
		let mut elements = self.elements;
		elements.sort_by(|a, b| a.0.cmp(&b.0));
		for pair in elements.windows(2) {
			if pair[0].0 == pair[1].0 {
				return Err(Error::invalid_argument(format!(
					"duplicate key {:?}",
					pair[0].0
				)));
			}
		}

		let storage = Builder::new().density_factor(self.density_factor).build(&elements, observer)?;
		Ok(Trie::from_storage(Storage::InMemory(storage)))
	}

	/// Builds the trie without reporting progress.
	pub fn build(self) -> Result<Trie<V>> {
		self.build_with_observer(&mut NullObserver)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::mmap::DEFAULT_CACHE_CAPACITY;
	use crate::value::{BigEndianIntegerCodec, ByteStringCodec};

	fn trie() -> Trie<u32> {
		Trie::builder()
			.elements(vec![
				(b"SETA".to_vec(), 1),
				(b"UTIGOSI".to_vec(), 2),
				(b"UTO".to_vec(), 3),
			])
			.build()
			.unwrap()
	}

	#[test]
	fn finds_each_key() {
		let trie = trie();
		assert_eq!(*trie.find(b"SETA").unwrap().unwrap(), 1);
		assert_eq!(*trie.find(b"UTIGOSI").unwrap().unwrap(), 2);
		assert_eq!(*trie.find(b"UTO").unwrap().unwrap(), 3);
		assert!(trie.find(b"UT").unwrap().is_none());
		assert!(trie.find(b"NONEXISTENT").unwrap().is_none());
	}

	#[test]
	fn prefix_disambiguation() {
		let trie = Trie::builder()
			.elements(vec![(b"UT".to_vec(), 1u32), (b"UTO".to_vec(), 2u32)])
			.build()
			.unwrap();
		assert_eq!(*trie.find(b"UT").unwrap().unwrap(), 1);
		assert_eq!(*trie.find(b"UTO").unwrap().unwrap(), 2);
		assert!(trie.find(b"U").unwrap().is_none());
	}

	#[test]
	fn into_shared_keeps_every_key_findable_and_shares_storage_across_clones() {
		let trie = trie().into_shared();
		assert!(matches!(trie.storage(), Storage::Shared(_)));
		assert_eq!(*trie.find(b"SETA").unwrap().unwrap(), 1);
		assert_eq!(*trie.find(b"UTIGOSI").unwrap().unwrap(), 2);
		assert_eq!(*trie.find(b"UTO").unwrap().unwrap(), 3);

		let sub = trie.subtrie(b"UT").unwrap().unwrap();
		assert!(matches!(sub.storage(), Storage::Shared(_)));
		assert!(sub.find(b"O").unwrap().is_some());
	}

	#[test]
	fn subtrie_shares_storage_and_narrows_lookup() {
		let trie = trie();
		let sub = trie.subtrie(b"UT").unwrap().unwrap();
		assert!(sub.find(b"IGOSI").unwrap().is_some());
		assert!(sub.find(b"O").unwrap().is_some());
		assert!(sub.find(b"SETA").unwrap().is_none());
		assert!(trie.subtrie(b"ZZZ").unwrap().is_none());
	}

	#[test]
	fn empty_trie_finds_nothing_and_iterates_to_nothing() {
		let trie = Trie::<u32>::builder().elements(Vec::new()).build().unwrap();
		assert!(trie.find(b"anything").unwrap().is_none());
		assert!(!trie.contains_key(b"").unwrap());
		assert_eq!(trie.iter().count(), 0);
	}

	#[test]
	fn single_key_allocates_one_value_and_a_leaf_cell() {
		let trie = Trie::builder().elements(vec![(b"A".to_vec(), 7u32)]).build().unwrap();
		assert_eq!(*trie.find(b"A").unwrap().unwrap(), 7);
		let collected: Vec<_> = trie.iter().map(|r| r.unwrap()).collect();
		assert_eq!(collected.len(), 1);
		assert_eq!(collected[0].0, b"A".to_vec());
	}

	#[test]
	fn rejects_duplicate_keys() {
		let result = Trie::builder()
			.elements(vec![(b"A".to_vec(), 1u32), (b"A".to_vec(), 2u32)])
			.build();
		assert!(matches!(result, Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn round_trips_through_save_and_load() {
		let trie = trie();
		let mut buf = Vec::new();
		trie.save_to(&mut buf, &BigEndianIntegerCodec).unwrap();
		let loaded = Trie::load(&mut &buf[..], &BigEndianIntegerCodec).unwrap();
		assert_eq!(*loaded.find(b"UTO").unwrap().unwrap(), 3);
	}

	#[test]
	fn iterates_in_ascending_key_order() {
		let trie = Trie::<u32>::builder()
			.elements(vec![
				(b"UTO".to_vec(), 2424),
				(b"SETA".to_vec(), 42),
				(b"UTIGOSI".to_vec(), 24),
			])
			.build()
			.unwrap();
		let collected: Vec<_> =
			trie.iter().map(|r| r.map(|(k, v)| (k, *v)).unwrap()).collect();
		assert_eq!(
			collected,
			vec![
				(b"SETA".to_vec(), 42),
				(b"UTIGOSI".to_vec(), 24),
				(b"UTO".to_vec(), 2424),
			]
		);
	}

	#[test]
	fn prefix_key_is_yielded_after_its_own_extensions() {
		// at the node for "UT", the terminator edge (0xFE) sorts after the
		// 'O' edge (0x4F), so "UTO" is yielded before "UT".
		let trie = Trie::<u32>::builder()
			.elements(vec![(b"UT".to_vec(), 1), (b"UTO".to_vec(), 2)])
			.build()
			.unwrap();
		let collected: Vec<_> =
			trie.iter().map(|r| r.map(|(k, v)| (k, *v)).unwrap()).collect();
		assert_eq!(collected, vec![(b"UTO".to_vec(), 2), (b"UT".to_vec(), 1)]);
	}

	#[test]
	fn utf8_keys_with_a_shared_prefix() {
		// 赤水 (Akamizu) and 赤瀬 (Akase), sharing the 3-byte prefix 赤 (0xE8 0xB5 0xA4).
		let akamizu = hex_literal::hex!("E8B5A4E6B0B4").to_vec();
		let akase = hex_literal::hex!("E8B5A4E780AC").to_vec();
		let trie = Trie::<u32>::builder()
			.elements(vec![(akamizu.clone(), 42), (akase.clone(), 24)])
			.build()
			.unwrap();

		let collected: Vec<_> =
			trie.iter().map(|r| r.map(|(k, v)| (k, *v)).unwrap()).collect();
		assert_eq!(collected, vec![(akamizu.clone(), 42), (akase.clone(), 24)]);

		let prefix = hex_literal::hex!("E8B5A4").to_vec();
		let sub = trie.subtrie(&prefix).unwrap().unwrap();
		let stripped: Vec<_> = sub.iter().map(|r| r.map(|(k, v)| (k, *v)).unwrap()).collect();
		assert_eq!(
			stripped,
			vec![
				(hex_literal::hex!("E6B0B4").to_vec(), 42),
				(hex_literal::hex!("E780AC").to_vec(), 24),
			]
		);
	}

	#[test]
	fn open_mmap_reads_back_values() {
		let trie = trie();
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("trie.bin");
		let mut persisted = std::fs::File::create(&path).unwrap();
		trie.save_to(&mut persisted, &BigEndianIntegerCodec).unwrap();
		drop(persisted);

		let mapped = Trie::open_mmap(&path, BigEndianIntegerCodec, DEFAULT_CACHE_CAPACITY, 0).unwrap();
		assert_eq!(*mapped.find(b"UTO").unwrap().unwrap(), 3);
		assert!(mapped.find(b"UT").unwrap().is_none());
	}

	#[test]
	fn byte_string_codec_is_available_for_variable_length_values() {
		let trie = Trie::<Vec<u8>>::builder()
			.elements(vec![(b"A".to_vec(), b"hello".to_vec())])
			.build()
			.unwrap();
		let mut buf = Vec::new();
		let codec = ByteStringCodec::new();
		trie.save_to(&mut buf, &codec).unwrap();
		assert_eq!(*trie.find(b"A").unwrap().unwrap(), b"hello".to_vec());
	}
}
