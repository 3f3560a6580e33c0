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

//! The growable, mutable storage backend used while building a trie.

use crate::cell::{base, check, pack, VACANT_CHECK};
use crate::error::{Error, Result};
use std::rc::Rc;

/// A double array held entirely in process memory.
///
/// This is the only backend [`crate::builder::Builder`] writes into; once
/// built, it can be queried directly, wrapped in [`crate::storage::Storage::Shared`]
/// for cheap cloning, or serialized to a file for later [`crate::storage::Storage::Mmap`]
/// access.
pub struct InMemoryStorage<V> {
	cells: Vec<u32>,
	values: Vec<Option<Rc<V>>>,
}

// Derived `Clone` would require `V: Clone`, even though `Rc<V>` clones
// without it; a manual impl keeps the bound off callers that never clone a
// value directly.
impl<V> Clone for InMemoryStorage<V> {
	fn clone(&self) -> Self {
		Self { cells: self.cells.clone(), values: self.values.clone() }
	}
}

impl<V> Default for InMemoryStorage<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> InMemoryStorage<V> {
	/// Creates a storage containing only the root cell.
	pub fn new() -> Self {
		Self { cells: vec![pack(0, VACANT_CHECK)], values: Vec::new() }
	}

	/// The number of cells currently allocated.
	pub fn len(&self) -> usize {
		self.cells.len()
	}

	/// Whether the storage holds no cells beyond the implicit root.
	pub fn is_empty(&self) -> bool {
		self.cells.len() <= 1
	}

	/// The base field of the cell at `index`, or `0` past the end.
	pub fn base_at(&self, index: usize) -> i32 {
		self.cells.get(index).map(|&c| base(c)).unwrap_or(0)
	}

	/// The check byte of the cell at `index`, or the vacant marker past the end.
	pub fn check_at(&self, index: usize) -> u8 {
		self.cells.get(index).map(|&c| check(c)).unwrap_or(VACANT_CHECK)
	}

	/// Sets the base field of the cell at `index`, growing the array if needed.
	pub fn set_base_at(&mut self, index: usize, value: i32) {
		self.ensure_capacity(index);
		let c = check(self.cells[index]);
		self.cells[index] = pack(value, c);
	}

	/// Sets the check byte of the cell at `index`, growing the array if needed.
	pub fn set_check_at(&mut self, index: usize, value: u8) {
		self.ensure_capacity(index);
		let b = base(self.cells[index]);
		self.cells[index] = pack(b, value);
	}

	/// Whether the cell at `index` is vacant (or past the end, which counts as vacant).
	pub fn is_vacant_at(&self, index: usize) -> bool {
		self.check_at(index) == VACANT_CHECK
	}

	/// The fraction of allocated cells that are not vacant.
	pub fn filling_rate(&self) -> f64 {
		if self.cells.is_empty() {
			return 0.0;
		}
		let occupied = self.cells.iter().filter(|&&c| check(c) != VACANT_CHECK).count();
		occupied as f64 / self.cells.len() as f64
	}

	fn ensure_capacity(&mut self, index: usize) {
		if index >= self.cells.len() {
			self.cells.resize(index + 1, pack(0, VACANT_CHECK));
		}
	}

	/// Stores `value` at `index`, growing the value table if needed.
	///
	/// Fails if `index` already holds a value: overwriting is forbidden.
	pub fn set_value_at(&mut self, index: usize, value: V) -> Result<()> {
		if index >= self.values.len() {
			self.values.resize_with(index + 1, || None);
		} else if self.values[index].is_some() {
			return Err(Error::invalid_argument(format!(
				"value index {} is already occupied",
				index
			)));
		}
		self.values[index] = Some(Rc::new(value));
		Ok(())
	}

	/// Stores `value` at the next unused index, returning that index.
	pub fn push_value(&mut self, value: V) -> usize {
		let index = self.values.len();
		self.values.push(Some(Rc::new(value)));
		index
	}

	/// The value stored at `index`, if any.
	pub fn value_at(&self, index: usize) -> Option<Rc<V>> {
		self.values.get(index).and_then(|v| v.clone())
	}

	/// The number of values stored so far.
	pub fn value_count(&self) -> usize {
		self.values.iter().filter(|v| v.is_some()).count()
	}

	/// A view of the raw cell array, for serialization.
	pub fn cells(&self) -> &[u32] {
		&self.cells
	}

	/// A view of the stored values, in index order, for serialization.
	///
	/// Unset slots serialize as `None`; a well-formed trie never has any,
	/// since the builder writes values densely.
	pub fn values(&self) -> &[Option<Rc<V>>] {
		&self.values
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_storage_has_single_vacant_root() {
		let storage: InMemoryStorage<u32> = InMemoryStorage::new();
		assert_eq!(storage.len(), 1);
		assert!(storage.is_vacant_at(0));
	}

	#[test]
	fn set_base_and_check_grow_the_array() {
		let mut storage: InMemoryStorage<u32> = InMemoryStorage::new();
		storage.set_check_at(10, b'a');
		assert_eq!(storage.len(), 11);
		assert_eq!(storage.check_at(10), b'a');
		assert_eq!(storage.base_at(10), 0);
	}

	#[test]
	fn push_value_returns_sequential_indices() {
		let mut storage: InMemoryStorage<&str> = InMemoryStorage::new();
		assert_eq!(storage.push_value("a"), 0);
		assert_eq!(storage.push_value("b"), 1);
		assert_eq!(*storage.value_at(1).unwrap(), "b");
	}
}
