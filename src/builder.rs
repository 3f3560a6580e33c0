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

//! Construction of a double array from a sorted sequence of keys.
//!
//! The classic double-array construction problem is: given a node whose
//! children use byte labels `B = {b0, b1, ..., bk}`, find a base offset `p`
//! such that every cell `p + b` for `b` in `B` is currently vacant. This
//! module's [`Builder`] does that with a single monotonically advancing
//! cursor, and uses `density_factor` to trade search cost for how tightly
//! the array ends up packed (see [`Builder::density_factor`]).

use crate::cell::TERMINATOR;
use crate::error::{Error, Result};
use crate::storage::memory::InMemoryStorage;

/// The default density factor, matching the original C++ library's default.
pub const DEFAULT_DENSITY_FACTOR: u32 = 1_000;

/// Observes key insertion while a trie is being built.
///
/// Implement this to report build progress; pass [`null_observer`] when you
/// don't care.
pub trait BuildingObserver {
	/// Called once per key, in the order keys are written into the array,
	/// just before that key's leaf cell is finalized.
	fn on_adding(&mut self, key: &[u8]);

	/// Called exactly once, after every key has been added.
	fn on_done(&mut self);
}

/// A [`BuildingObserver`] that does nothing.
pub struct NullObserver;

impl BuildingObserver for NullObserver {
	fn on_adding(&mut self, _key: &[u8]) {}
	fn on_done(&mut self) {}
}

/// Builds a double array from a sorted, deduplicated sequence of key/value
/// pairs.
pub struct Builder {
	density_factor: u32,
}

impl Default for Builder {
	fn default() -> Self {
		Self::new()
	}
}

impl Builder {
	/// Creates a builder with the default density factor.
	pub fn new() -> Self {
		Self { density_factor: DEFAULT_DENSITY_FACTOR }
	}

	/// Sets the density factor used to search for base offsets.
	///
	/// Larger values make the builder search harder for a tightly packed
	/// base offset before settling, which produces a smaller array at the
	/// cost of a slower build; smaller values accept the first offset that
	/// merely leaves room and jump further ahead before searching again for
	/// the next node, which builds faster into a looser array. Must be
	/// greater than zero.
	pub fn density_factor(mut self, density_factor: u32) -> Self {
		self.density_factor = density_factor;
		self
	}

	/// Builds a double array over `elements`.
	///
	/// `elements` must already be sorted ascending by key and contain no
	/// duplicate keys; no key may contain the terminator byte `0xFE`. These
	/// are caller preconditions, not checked here beyond what's needed to
	/// avoid corrupting the array.
	pub fn build<V>(
		self,
		elements: &[(Vec<u8>, V)],
		observer: &mut dyn BuildingObserver,
	) -> Result<InMemoryStorage<V>>
	where
		V: Clone,
	{
		if self.density_factor == 0 {
			return Err(Error::invalid_argument("density_factor must be greater than zero"));
		}

		let mut storage = InMemoryStorage::new();
		if elements.is_empty() {
			observer.on_done();
			return Ok(storage);
		}

		for (key, _) in elements {
			if key.contains(&TERMINATOR) {
				return Err(Error::invalid_argument(
					"key contains the reserved terminator byte 0xFE",
				));
			}
		}

		log::debug!(
			"building double array from {} keys with density_factor {}",
			elements.len(),
			self.density_factor,
		);
		let indices: Vec<usize> = (0..elements.len()).collect();
		let mut cursor = 1usize;
		self.build_node(&mut storage, elements, &indices, 0, 0, &mut cursor, observer)?;
		observer.on_done();
		log::debug!(
			"build complete: {} cells, filling rate {:.3}",
			storage.len(),
			storage.filling_rate(),
		);
		Ok(storage)
	}

	/// Expands the node at `node_index`, whose incoming elements (indexed
	/// into `elements` through `order`, restricted to `[order_start..]`
	/// sharing the same prefix of length `depth`) are partitioned here by
	/// the next byte of each key.
	fn build_node<V>(
		&self,
		storage: &mut InMemoryStorage<V>,
		elements: &[(Vec<u8>, V)],
		order: &[usize],
		depth: usize,
		node_index: usize,
		cursor: &mut usize,
		observer: &mut dyn BuildingObserver,
	) -> Result<()>
	where
		V: Clone,
	{
		// Partition `order` into contiguous runs sharing the same byte at
		// `depth`; a key exactly `depth` bytes long represents the
		// terminator edge and always sorts first since it's the odd one out
		// (shorter than every key it shares a prefix with).
		let mut edges: Vec<(u8, &[usize])> = Vec::new();
		let mut i = 0;
		if elements[order[0]].0.len() == depth {
			edges.push((TERMINATOR, &order[0..1]));
			i = 1;
		}
		while i < order.len() {
			let b = elements[order[i]].0[depth];
			let start = i;
			while i < order.len()
				&& elements[order[i]].0.len() > depth
				&& elements[order[i]].0[depth] == b
			{
				i += 1;
			}
			edges.push((b, &order[start..i]));
		}

		let labels: Vec<u8> = edges.iter().map(|(b, _)| *b).collect();
		let base = self.find_base(storage, cursor, &labels);
		storage.set_base_at(node_index, base);

		for (b, group) in edges {
			let child_index = (base + b as i32) as usize;
			storage.set_check_at(child_index, b);
			if b == TERMINATOR {
				let (key, value) = &elements[group[0]];
				observer.on_adding(key);
				let value_index = storage.push_value(value.clone());
				if value_index > crate::cell::MAX_VALUE_INDEX {
					return Err(Error::out_of_range("too many values for a 24-bit base field"));
				}
				storage.set_base_at(child_index, value_index as i32);
			} else {
				self.build_node(storage, elements, group, depth + 1, child_index, cursor, observer)?;
			}
		}

		Ok(())
	}

	/// Finds a base offset such that `base + b` is vacant in `storage` for
	/// every `b` in `labels`, advancing `*cursor` as candidates are
	/// rejected and again, by an amount scaled by `density_factor`, once one
	/// is accepted.
	fn find_base<V>(&self, storage: &InMemoryStorage<V>, cursor: &mut usize, labels: &[u8]) -> i32 {
		let mut candidate = *cursor;
		loop {
			if labels.iter().all(|&b| storage.is_vacant_at(candidate + b as usize)) {
				break;
			}
			candidate += 1;
		}

		let span = labels.iter().map(|&b| b as usize).max().unwrap_or(0) + 1;
		*cursor = candidate + 1 + span / self.density_factor as usize;
		candidate as i32
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn elements(pairs: &[(&str, u32)]) -> Vec<(Vec<u8>, u32)> {
		pairs.iter().map(|(k, v)| (k.as_bytes().to_vec(), *v)).collect()
	}

	#[test]
	fn builds_empty_trie() {
		let storage = Builder::new().build::<u32>(&[], &mut NullObserver).unwrap();
		assert_eq!(storage.len(), 1);
		assert!(storage.is_vacant_at(0));
	}

	#[test]
	fn builds_three_keys_and_finds_each_value() {
		let elements = elements(&[("SETA", 1), ("UTIGOSI", 2), ("UTO", 3)]);
		let storage = Builder::new().build(&elements, &mut NullObserver).unwrap();
		assert_eq!(storage.value_count(), 3);

		// Walk "UTO" by hand to check the leaf's value index round-trips.
		let mut index = 0usize;
		for &b in b"UTO" {
			let base = storage.base_at(index);
			let child = (base + b as i32) as usize;
			assert_eq!(storage.check_at(child), b);
			index = child;
		}
		let base = storage.base_at(index);
		let leaf = (base + TERMINATOR as i32) as usize;
		assert_eq!(storage.check_at(leaf), TERMINATOR);
		let value_index = storage.base_at(leaf) as usize;
		assert_eq!(*storage.value_at(value_index).unwrap(), 3);
	}

	#[test]
	fn observer_sees_every_key_once_and_done_exactly_once() {
		struct Recorder {
			adding: Vec<Vec<u8>>,
			done_calls: u32,
		}
		impl BuildingObserver for Recorder {
			fn on_adding(&mut self, key: &[u8]) {
				self.adding.push(key.to_vec());
			}
			fn on_done(&mut self) {
				self.done_calls += 1;
			}
		}

		let elements = elements(&[("SETA", 1), ("UTIGOSI", 2), ("UTO", 3)]);
		let mut observer = Recorder { adding: Vec::new(), done_calls: 0 };
		Builder::new().build(&elements, &mut observer).unwrap();

		let mut keys: Vec<Vec<u8>> = elements.iter().map(|(k, _)| k.clone()).collect();
		keys.sort();
		let mut seen = observer.adding.clone();
		seen.sort();
		assert_eq!(seen, keys);
		assert_eq!(observer.done_calls, 1);
	}

	#[test]
	fn rejects_zero_density_factor() {
		let err = Builder::new().density_factor(0).build::<u32>(&[], &mut NullObserver);
		assert!(matches!(err, Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn rejects_keys_containing_the_terminator() {
		let elements = vec![(vec![0x41, TERMINATOR], 1u32)];
		let err = Builder::new().build(&elements, &mut NullObserver);
		assert!(matches!(err, Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn higher_density_factor_never_yields_a_larger_array() {
		let elements = elements(&[
			("SETA", 1),
			("SETAGAYA", 2),
			("UTIGOSI", 3),
			("UTO", 4),
			("UTSUNOMIYA", 5),
		]);
		let loose = Builder::new().density_factor(1).build(&elements, &mut NullObserver).unwrap();
		let tight =
			Builder::new().density_factor(10_000).build(&elements, &mut NullObserver).unwrap();
		assert!(tight.len() <= loose.len());
		assert!(tight.filling_rate() >= loose.filling_rate());
	}
}
